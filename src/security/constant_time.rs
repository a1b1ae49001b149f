/*!
 * Constant-Time Verification Framework
 *
 * Constant-time equality for ring elements, vectors and seeds, and a
 * timing harness that runs an operation repeatedly and flags it when the
 * spread of execution times is too wide.
 */

use std::time::{Duration, Instant};

use subtle::{Choice, ConstantTimeEq};

use crate::dilithium::poly::{Domain, Poly};
use crate::dilithium::polyvec::PolyVec;
use crate::error::{error_codes, CryptoError, CryptoResult};

/// Values that can be compared without secret-dependent branches
pub trait ConstantTime {
    fn ct_eq(&self, other: &Self) -> Choice;
}

impl<D: Domain> ConstantTime for Poly<D> {
    /// Equality of the canonical representatives
    fn ct_eq(&self, other: &Self) -> Choice {
        self.ct_eq_canonical(other)
    }
}

impl<D: Domain> ConstantTime for PolyVec<D> {
    /// Lengths are public; only the coefficients are compared in constant
    /// time.
    fn ct_eq(&self, other: &Self) -> Choice {
        if self.len() != other.len() {
            return Choice::from(0);
        }
        self.iter()
            .zip(other.iter())
            .fold(Choice::from(1), |acc, (a, b)| acc & ConstantTime::ct_eq(a, b))
    }
}

impl<const L: usize> ConstantTime for [u8; L] {
    fn ct_eq(&self, other: &Self) -> Choice {
        self[..].ct_eq(&other[..])
    }
}

/// Result of constant-time verification
#[derive(Debug, Clone)]
pub struct ConstantTimeResult {
    pub is_constant_time: bool,
    pub max_timing_variance: Duration,
    pub mean_execution_time: Duration,
    pub standard_deviation: Duration,
    pub sample_count: usize,
    pub confidence_level: f64,
}

/// Configuration for constant-time testing
#[derive(Debug, Clone)]
pub struct ConstantTimeConfig {
    pub iterations: usize,
    pub warmup_iterations: usize,
    pub max_variance_threshold: Duration,
    pub confidence_threshold: f64,
    pub statistical_test: StatisticalTest,
}

impl Default for ConstantTimeConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            warmup_iterations: 100,
            max_variance_threshold: Duration::from_micros(50),
            confidence_threshold: 0.95,
            statistical_test: StatisticalTest::CoefficientOfVariation,
        }
    }
}

/// Uniformity measures applied to the timing samples
#[derive(Debug, Clone)]
pub enum StatisticalTest {
    /// Standard deviation relative to the mean
    CoefficientOfVariation,
    /// Spread between fastest and slowest sample relative to the fastest
    RelativeRange,
}

/// Verify that an operation executes in constant time
///
/// # Arguments
///
/// * `operation` - Closure that performs the operation to test
/// * `input_generator` - Produces a fresh input before every run
/// * `config` - Iteration counts and thresholds
///
/// # Returns
///
/// The timing analysis, or `SideChannelViolation` when the measured spread
/// exceeds the configured threshold
pub fn verify_constant_time<F, G, T>(
    mut operation: F,
    mut input_generator: G,
    config: &ConstantTimeConfig,
) -> CryptoResult<ConstantTimeResult>
where
    F: FnMut(&T),
    G: FnMut() -> T,
{
    // Warm caches and CPU frequency before measuring
    for _ in 0..config.warmup_iterations {
        let input = input_generator();
        operation(&input);
    }

    let mut measurements = Vec::with_capacity(config.iterations);
    for _ in 0..config.iterations {
        let input = input_generator();

        std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
        let start = Instant::now();
        operation(&input);
        std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);

        measurements.push(start.elapsed());
    }

    let analysis = analyze_timing_measurements(&measurements, config)?;

    if !analysis.is_constant_time {
        return Err(CryptoError::SideChannelViolation {
            test_name: "constant_time_verification".to_string(),
            details: format!(
                "Timing variance {}ns exceeds threshold {}ns",
                analysis.max_timing_variance.as_nanos(),
                config.max_variance_threshold.as_nanos()
            ),
            error_code: error_codes::SIDE_CHANNEL_LEAK,
        });
    }

    Ok(analysis)
}

fn analyze_timing_measurements(
    measurements: &[Duration],
    config: &ConstantTimeConfig,
) -> CryptoResult<ConstantTimeResult> {
    if measurements.len() < 2 {
        return Err(CryptoError::invalid_parameter(
            "measurements",
            "at least two samples",
            &format!("{} samples", measurements.len()),
        ));
    }

    let times_ns: Vec<f64> = measurements.iter().map(|d| d.as_nanos() as f64).collect();
    let n = times_ns.len() as f64;
    let mean = times_ns.iter().sum::<f64>() / n;
    let variance = times_ns.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    let min = times_ns.iter().copied().fold(f64::INFINITY, f64::min);
    let max = times_ns.iter().copied().fold(0.0, f64::max);
    let max_variance = Duration::from_nanos((max - min) as u64);

    let confidence_level = match config.statistical_test {
        StatisticalTest::CoefficientOfVariation => confidence_from_ratio(std_dev / mean, 0.01, 0.05),
        StatisticalTest::RelativeRange => confidence_from_ratio((max - min) / min, 0.1, 0.2),
    };

    Ok(ConstantTimeResult {
        is_constant_time: max_variance <= config.max_variance_threshold
            && confidence_level >= config.confidence_threshold,
        max_timing_variance: max_variance,
        mean_execution_time: Duration::from_nanos(mean as u64),
        standard_deviation: Duration::from_nanos(std_dev as u64),
        sample_count: measurements.len(),
        confidence_level,
    })
}

fn confidence_from_ratio(ratio: f64, tight: f64, loose: f64) -> f64 {
    if ratio < tight {
        0.99
    } else if ratio < loose {
        0.95
    } else if ratio < 2.0 * loose {
        0.90
    } else {
        0.50
    }
}

/// Macro for easy constant-time testing
#[macro_export]
macro_rules! verify_constant_time_operation {
    ($operation:expr, $input_gen:expr) => {{
        let config = $crate::security::constant_time::ConstantTimeConfig::default();
        $crate::security::constant_time::verify_constant_time($operation, $input_gen, &config)
    }};

    ($operation:expr, $input_gen:expr, $config:expr) => {
        $crate::security::constant_time::verify_constant_time($operation, $input_gen, $config)
    };
}

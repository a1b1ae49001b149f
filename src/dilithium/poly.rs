//! Ring elements of `R_q = Z_q[X]/(X^256 + 1)`
//!
//! A [`Poly`] is tagged at the type level with the domain it lives in:
//! [`Normal`] (coefficients) or [`Ntt`] (transformed). Addition and
//! subtraction are only defined within one domain, multiplication only in
//! the NTT domain, and moving between the two requires an explicit
//! transform.
//!
//! Coefficients are kept lazily reduced between operations: callers run
//! [`Poly::reduce`], [`Poly::caddq`] or [`Poly::freeze`] at the points where
//! a tighter range is required.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{de, Deserialize, Deserializer, Serialize};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

use super::ntt;
use super::params::{self, N};
use super::reduce::{self, montgomery_reduce, MONT_SQ};
use super::rounding;

mod sealed {
    pub trait Sealed {}
}

/// Marker for the domain a [`Poly`] lives in.
pub trait Domain: sealed::Sealed + Copy + Default + fmt::Debug + PartialEq + Eq {}

/// Coefficient domain
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Normal;

/// NTT domain, coefficients in bit-reversed evaluation order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ntt;

impl sealed::Sealed for Normal {}
impl sealed::Sealed for Ntt {}
impl Domain for Normal {}
impl Domain for Ntt {}

/// Polynomial with 256 coefficients
#[derive(Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(bound = "")]
pub struct Poly<D: Domain = Normal> {
    #[serde(with = "serde_arrays")]
    pub(crate) coeffs: [i32; N],
    #[serde(skip)]
    domain: PhantomData<D>,
}

/// Deserialized coefficients must lie in `(-q, q)`.
impl<'de, D: Domain> Deserialize<'de> for Poly<D> {
    fn deserialize<De>(deserializer: De) -> Result<Self, De::Error>
    where
        De: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename = "Poly")]
        struct Coeffs {
            #[serde(with = "serde_arrays")]
            coeffs: [i32; N],
        }

        let Coeffs { coeffs } = Coeffs::deserialize(deserializer)?;
        if coeffs.iter().any(|&c| c <= -params::Q || c >= params::Q) {
            return Err(de::Error::custom("ring coefficient out of range"));
        }
        Ok(Self::from_coeffs(coeffs))
    }
}

impl<D: Domain> Default for Poly<D> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<D: Domain> fmt::Debug for Poly<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Poly<{:?}> {{ coeffs: {:?}.. }}", D::default(), &self.coeffs[..4])
    }
}

impl<D: Domain> Zeroize for Poly<D> {
    fn zeroize(&mut self) {
        self.coeffs.zeroize();
    }
}

impl<D: Domain> Poly<D> {
    pub fn zero() -> Self {
        Self::from_coeffs([0; N])
    }

    pub fn from_coeffs(coeffs: [i32; N]) -> Self {
        Self {
            coeffs,
            domain: PhantomData,
        }
    }

    pub fn coeffs(&self) -> &[i32; N] {
        &self.coeffs
    }

    /// Reduce every coefficient into `[-6283009, 6283007]`.
    pub fn reduce(&mut self) {
        for c in self.coeffs.iter_mut() {
            *c = reduce::reduce32(*c);
        }
    }

    /// Add `q` to every negative coefficient.
    pub fn caddq(&mut self) {
        for c in self.coeffs.iter_mut() {
            *c = reduce::caddq(*c);
        }
    }

    /// Bring every coefficient to its standard representative in `[0, q)`.
    pub fn freeze(&mut self) {
        for c in self.coeffs.iter_mut() {
            *c = reduce::freeze(*c);
        }
    }

    /// Copy with every coefficient in `[0, q)`.
    pub fn canonical(&self) -> Self {
        let mut out = *self;
        out.freeze();
        out
    }

    /// Constant-time equality of the canonical representatives.
    pub fn ct_eq_canonical(&self, other: &Self) -> Choice {
        let a = self.canonical();
        let b = other.canonical();
        let mut acc = Choice::from(1u8);
        for (x, y) in a.coeffs.iter().zip(b.coeffs.iter()) {
            acc &= x.ct_eq(y);
        }
        acc
    }
}

impl<D: Domain> Add for Poly<D> {
    type Output = Poly<D>;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl<D: Domain> AddAssign for Poly<D> {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
            *a += *b;
        }
    }
}

impl<D: Domain> Sub for Poly<D> {
    type Output = Poly<D>;

    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= rhs;
        self
    }
}

impl<D: Domain> SubAssign for Poly<D> {
    fn sub_assign(&mut self, rhs: Self) {
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs.iter()) {
            *a -= *b;
        }
    }
}

impl Poly<Normal> {
    /// Forward transform. Coefficients must be bounded by `q` in absolute
    /// value.
    pub fn ntt(mut self) -> Poly<Ntt> {
        ntt::forward(&mut self.coeffs);
        Poly::from_coeffs(self.coeffs)
    }

    /// Ring product via the NTT. Result coefficients are standard
    /// representatives.
    pub fn mul(&self, other: &Self) -> Self {
        let mut a = *self;
        let mut b = *other;
        a.reduce();
        b.reduce();
        let mut product = a.ntt().pointwise_mul(&b.ntt()).inverse();
        product.freeze();
        product
    }

    /// Multiply by `2^d` without reduction. Coefficients must be below
    /// `2^{31-d}` in absolute value.
    pub fn shiftl(&mut self) {
        for c in self.coeffs.iter_mut() {
            *c <<= params::D;
        }
    }

    /// Split standard representatives into `(high, low)` around `2^d`.
    pub fn power2round(&self) -> (Self, Self) {
        let mut high = Self::zero();
        let mut low = Self::zero();
        for i in 0..N {
            let (a1, a0) = rounding::power2round(self.coeffs[i]);
            high.coeffs[i] = a1;
            low.coeffs[i] = a0;
        }
        (high, low)
    }

    /// Split standard representatives into `(high, low)` around
    /// `2·gamma2`.
    pub fn decompose(&self, gamma2: i32) -> (Self, Self) {
        let mut high = Self::zero();
        let mut low = Self::zero();
        for i in 0..N {
            let (a1, a0) = rounding::decompose(self.coeffs[i], gamma2);
            high.coeffs[i] = a1;
            low.coeffs[i] = a0;
        }
        (high, low)
    }

    /// Hint bits for the low part `low` relative to the high part `high`,
    /// and the number of bits set.
    pub fn make_hint(low: &Self, high: &Self, gamma2: i32) -> (Self, usize) {
        let mut hint = Self::zero();
        let mut count = 0usize;
        for i in 0..N {
            let h = rounding::make_hint(low.coeffs[i], high.coeffs[i], gamma2);
            hint.coeffs[i] = h;
            count += h as usize;
        }
        (hint, count)
    }

    /// Corrected high bits of standard representatives.
    pub fn use_hint(&self, hint: &Self, gamma2: i32) -> Self {
        let mut out = Self::zero();
        for i in 0..N {
            out.coeffs[i] = rounding::use_hint(self.coeffs[i], hint.coeffs[i], gamma2);
        }
        out
    }

    /// Whether the infinity norm reaches `bound`, evaluated without
    /// data-dependent branches. Coefficients must have been reduced with
    /// [`Poly::reduce`] and `bound` must be at most `(q-1)/8`.
    pub fn norm_exceeds(&self, bound: i32) -> Choice {
        let mut mask = 0i32;
        for &c in self.coeffs.iter() {
            mask |= reduce::ge_mask(reduce::abs(c), bound);
        }
        Choice::from((mask & 1) as u8)
    }

    /// Largest absolute centered coefficient.
    pub fn infinity_norm(&self) -> i32 {
        self.coeffs
            .iter()
            .map(|&c| reduce::abs(reduce::center(reduce::freeze(c))))
            .max()
            .unwrap_or(0)
    }

    /// Number of nonzero coefficients.
    pub fn weight(&self) -> usize {
        self.coeffs
            .iter()
            .filter(|&&c| reduce::freeze(c) != 0)
            .count()
    }
}

impl Poly<Ntt> {
    /// Inverse transform that also multiplies by `2^32`, pairing with
    /// [`Poly::pointwise_montgomery`].
    pub fn inverse_tomont(mut self) -> Poly<Normal> {
        self.reduce();
        ntt::inverse_tomont(&mut self.coeffs);
        Poly::from_coeffs(self.coeffs)
    }

    /// Exact inverse of [`Poly::ntt`].
    pub fn inverse(mut self) -> Poly<Normal> {
        self.reduce();
        ntt::inverse(&mut self.coeffs);
        Poly::from_coeffs(self.coeffs)
    }

    /// Pointwise product scaled by `2^-32`.
    pub fn pointwise_montgomery(&self, other: &Self) -> Self {
        let mut out = Self::zero();
        for i in 0..N {
            out.coeffs[i] = montgomery_reduce(self.coeffs[i] as i64 * other.coeffs[i] as i64);
        }
        out
    }

    /// Exact pointwise product.
    pub fn pointwise_mul(&self, other: &Self) -> Self {
        let mut out = self.pointwise_montgomery(other);
        for c in out.coeffs.iter_mut() {
            *c = montgomery_reduce(*c as i64 * MONT_SQ as i64);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dilithium::params::Q;

    fn sample(seed: i64) -> Poly {
        let mut coeffs = [0i32; N];
        let mut state = seed;
        for c in coeffs.iter_mut() {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407)
                & 0x7fff_ffff_ffff;
            *c = (state % Q as i64) as i32 - Q / 2;
        }
        Poly::from_coeffs(coeffs)
    }

    fn schoolbook(a: &Poly, b: &Poly) -> Poly {
        let mut acc = [0i64; N];
        for i in 0..N {
            for j in 0..N {
                let prod = a.coeffs[i] as i64 * b.coeffs[j] as i64 % Q as i64;
                if i + j < N {
                    acc[i + j] += prod;
                } else {
                    acc[i + j - N] -= prod;
                }
            }
        }
        let mut out = [0i32; N];
        for i in 0..N {
            out[i] = acc[i].rem_euclid(Q as i64) as i32;
        }
        Poly::from_coeffs(out)
    }

    #[test]
    fn test_ntt_roundtrip() {
        let x = sample(1);
        let back = x.ntt().inverse();
        assert_eq!(back.canonical(), x.canonical());
    }

    #[test]
    fn test_ntt_mul_matches_schoolbook() {
        let x = sample(2);
        let y = sample(3);
        assert_eq!(x.mul(&y), schoolbook(&x, &y));
    }

    #[test]
    fn test_x_to_the_n_is_minus_one() {
        let mut a = [0i32; N];
        a[N - 1] = 1;
        let mut b = [0i32; N];
        b[1] = 1;
        let product = Poly::<Normal>::from_coeffs(a).mul(&Poly::from_coeffs(b));
        assert_eq!(product.coeffs[0], Q - 1);
        assert_eq!(product.weight(), 1);
    }

    #[test]
    fn test_add_sub_are_inverse() {
        let x = sample(4);
        let y = sample(5);
        let z = (x + y) - y;
        assert_eq!(z.canonical(), x.canonical());
    }

    #[test]
    fn test_norm_exceeds() {
        let mut a = [0i32; N];
        a[17] = -100;
        let p = Poly::<Normal>::from_coeffs(a);
        assert!(bool::from(p.norm_exceeds(100)));
        assert!(!bool::from(p.norm_exceeds(101)));
        assert_eq!(p.infinity_norm(), 100);
    }

    #[test]
    fn test_ct_eq_canonical_ignores_representative() {
        let mut a = [0i32; N];
        a[0] = -1;
        let mut b = [0i32; N];
        b[0] = Q - 1;
        let pa = Poly::<Normal>::from_coeffs(a);
        let pb = Poly::<Normal>::from_coeffs(b);
        assert!(bool::from(pa.ct_eq_canonical(&pb)));
        b[1] = 1;
        assert!(!bool::from(pa.ct_eq_canonical(&Poly::from_coeffs(b))));
    }

    #[test]
    fn test_deserialize_rejects_unreduced_coefficients() {
        let p = sample(11);
        let json = serde_json::to_string(&p).unwrap();
        let back: Poly = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["coeffs"][3] = serde_json::json!(i32::MAX);
        assert!(serde_json::from_value::<Poly>(value.clone()).is_err());
        value["coeffs"][3] = serde_json::json!(-Q);
        assert!(serde_json::from_value::<Poly<Ntt>>(value).is_err());
    }
}

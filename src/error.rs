/*!
 * Error Handling for the Dilithium Signature Engine
 *
 * Provides error types with numeric codes, user-friendly messages and
 * suggested remediation. A failed verification is never an error: it is a
 * `false` result.
 */

use std::collections::HashMap;
use thiserror::Error;

/// Error type for all signature-engine operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Attacker-supplied bytes that are the wrong length or encode an
    /// out-of-range field.
    #[error("Malformed {structure}: {cause}")]
    DecodeError {
        structure: String,
        cause: String,
        error_code: u32,
    },

    #[error("Invalid parameter: {parameter} - {expected} - got {actual}")]
    InvalidParameter {
        parameter: String,
        expected: String,
        actual: String,
        error_code: u32,
    },

    #[error("Random number generation failed: {cause}")]
    RandomGenerationError { cause: String, error_code: u32 },

    /// The signing rejection loop ran past its hard ceiling. Under correct
    /// parameters this cannot happen.
    #[error("Rejection sampling exceeded {attempts} attempts for {variant}")]
    RejectionBoundExceeded {
        attempts: u32,
        variant: String,
        error_code: u32,
    },

    #[error("Side-channel protection failure: {test_name} - {details}")]
    SideChannelViolation {
        test_name: String,
        details: String,
        error_code: u32,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Error code constants for different error categories
pub mod error_codes {
    // Dilithium errors: 2000-2999
    pub const DILITHIUM_INVALID_SIGNATURE: u32 = 2004;
    pub const DILITHIUM_INVALID_KEY_SIZE: u32 = 2005;
    pub const DILITHIUM_INVALID_PUBLIC_KEY: u32 = 2006;
    pub const DILITHIUM_INVALID_SECRET_KEY: u32 = 2007;
    pub const DILITHIUM_INVALID_SEED: u32 = 2008;
    pub const DILITHIUM_REJECTION_BOUND_EXCEEDED: u32 = 2009;

    // Security errors: 5000-5999
    pub const INSUFFICIENT_ENTROPY: u32 = 5002;
    pub const SIDE_CHANNEL_LEAK: u32 = 5004;

    // Hardware errors: 7000-7999
    pub const HARDWARE_RNG_FAILED: u32 = 7002;

    // Generic errors: 9000-9999
    pub const SERIALIZATION_FAILED: u32 = 9001;
    pub const INVALID_PARAMETER: u32 = 9999;
}

impl CryptoError {
    /// Get the numeric error code for this error
    pub fn error_code(&self) -> u32 {
        match self {
            CryptoError::DecodeError { error_code, .. } => *error_code,
            CryptoError::InvalidParameter { error_code, .. } => *error_code,
            CryptoError::RandomGenerationError { error_code, .. } => *error_code,
            CryptoError::RejectionBoundExceeded { error_code, .. } => *error_code,
            CryptoError::SideChannelViolation { error_code, .. } => *error_code,
            CryptoError::SerializationError(_) => error_codes::SERIALIZATION_FAILED,
        }
    }

    /// Whether the caller can recover by fixing its input. Entropy failures
    /// and an exhausted rejection loop are fatal.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CryptoError::DecodeError { .. } | CryptoError::InvalidParameter { .. }
        )
    }

    /// Get a user-friendly error message
    pub fn user_friendly_message(&self) -> String {
        match self {
            CryptoError::DecodeError { structure, .. } => {
                format!(
                    "The supplied {} is malformed. It was not produced by a compatible signer.",
                    structure
                )
            }
            CryptoError::InvalidParameter {
                parameter,
                expected,
                ..
            } => {
                format!(
                    "Invalid parameter '{}'. Expected '{}' format.",
                    parameter, expected
                )
            }
            CryptoError::RandomGenerationError { .. } => {
                "Random number generation failed. Cryptographic operations may be insecure."
                    .to_string()
            }
            CryptoError::RejectionBoundExceeded { .. } => {
                "Signature generation did not converge. This indicates an internal fault, not bad input."
                    .to_string()
            }
            CryptoError::SideChannelViolation { test_name, .. } => {
                format!(
                    "Side-channel vulnerability detected in '{}'. Security may be compromised.",
                    test_name
                )
            }
            CryptoError::SerializationError(_) => {
                "Data serialization failed. Data format may be corrupted.".to_string()
            }
        }
    }

    /// Get technical details for debugging
    pub fn technical_details(&self) -> HashMap<String, String> {
        let mut details = HashMap::new();

        details.insert("error_code".to_string(), self.error_code().to_string());
        details.insert("error_type".to_string(), self.error_type().to_string());
        details.insert("timestamp".to_string(), chrono::Utc::now().to_rfc3339());

        match self {
            CryptoError::DecodeError {
                structure, cause, ..
            } => {
                details.insert("structure".to_string(), structure.clone());
                details.insert("cause".to_string(), cause.clone());
            }
            CryptoError::InvalidParameter {
                parameter,
                expected,
                actual,
                ..
            } => {
                details.insert("parameter".to_string(), parameter.clone());
                details.insert("expected".to_string(), expected.clone());
                details.insert("actual".to_string(), actual.clone());
            }
            CryptoError::RejectionBoundExceeded {
                attempts, variant, ..
            } => {
                details.insert("attempts".to_string(), attempts.to_string());
                details.insert("variant".to_string(), variant.clone());
            }
            _ => {
                details.insert("details".to_string(), format!("{:?}", self));
            }
        }

        details
    }

    /// Get suggested remediation steps
    pub fn suggested_remediation(&self) -> Option<String> {
        match self {
            CryptoError::DecodeError { error_code, .. } => match *error_code {
                error_codes::DILITHIUM_INVALID_KEY_SIZE => Some(
                    "Use a supported Dilithium variant (Dilithium2, Dilithium3, or Dilithium5)."
                        .to_string(),
                ),
                _ => Some(
                    "Check that keys and signatures were produced for the same Dilithium variant and were not truncated."
                        .to_string(),
                ),
            },
            CryptoError::InvalidParameter { expected, .. } => {
                Some(format!("Supply a value matching: {}.", expected))
            }
            CryptoError::RandomGenerationError { .. } => Some(
                "Check system entropy sources. Consider using hardware RNG if available."
                    .to_string(),
            ),
            CryptoError::RejectionBoundExceeded { .. } => Some(
                "Report this as a bug together with the variant; do not retry blindly."
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Get the error category/type as a string
    pub fn error_type(&self) -> &'static str {
        match self {
            CryptoError::DecodeError { .. } => "DecodeError",
            CryptoError::InvalidParameter { .. } => "InvalidParameter",
            CryptoError::RandomGenerationError { .. } => "RandomGenerationError",
            CryptoError::RejectionBoundExceeded { .. } => "RejectionBoundExceeded",
            CryptoError::SideChannelViolation { .. } => "SideChannelViolation",
            CryptoError::SerializationError(_) => "SerializationError",
        }
    }
}

/// Convenience constructors for common error types
impl CryptoError {
    pub fn decode_error(structure: &str, cause: &str, error_code: u32) -> Self {
        CryptoError::DecodeError {
            structure: structure.to_string(),
            cause: cause.to_string(),
            error_code,
        }
    }

    /// A byte buffer whose length does not match the parameter set.
    pub fn length_mismatch(structure: &str, expected: usize, actual: usize, error_code: u32) -> Self {
        Self::decode_error(
            structure,
            &format!("expected {} bytes, got {}", expected, actual),
            error_code,
        )
    }

    pub fn invalid_parameter(parameter: &str, expected: &str, actual: &str) -> Self {
        CryptoError::InvalidParameter {
            parameter: parameter.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            error_code: error_codes::INVALID_PARAMETER,
        }
    }

    pub fn random_generation_error(cause: &str) -> Self {
        CryptoError::RandomGenerationError {
            cause: cause.to_string(),
            error_code: error_codes::INSUFFICIENT_ENTROPY,
        }
    }
}

impl From<serde_json::Error> for CryptoError {
    fn from(err: serde_json::Error) -> Self {
        CryptoError::SerializationError(err.to_string())
    }
}

impl From<rand::Error> for CryptoError {
    fn from(err: rand::Error) -> Self {
        CryptoError::RandomGenerationError {
            cause: err.to_string(),
            error_code: error_codes::HARDWARE_RNG_FAILED,
        }
    }
}

/// Result type alias for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

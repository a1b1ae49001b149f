/*!
 * QaSa Dilithium Signature Engine
 *
 * A native implementation of the CRYSTALS-Dilithium (round 3) lattice
 * signature scheme for quantum-resistant digital signatures.
 *
 * The engine is layered leaf-first:
 *
 * - modular arithmetic and ring elements over `Z_q[X]/(X^256 + 1)`
 * - the number-theoretic transform for fast ring multiplication
 * - SHAKE128/SHAKE256 driven samplers
 * - key generation, the rejection-sampling signer and the verifier
 * - fixed-width packed encodings of keys and signatures
 *
 * All three standard parameter sets are supported; Dilithium3 is the
 * default.
 */

/// CRYSTALS-Dilithium implementation for digital signatures
pub mod dilithium;

/// Common error types for the signature engine
pub mod error;

/// Secure memory handling utilities
pub mod secure_memory;

/// Security framework including constant-time verification
pub mod security;

// Re-export main types for convenience
pub use dilithium::DilithiumKeyPair;
pub use dilithium::DilithiumPublicKey;
pub use dilithium::DilithiumVariant;
pub use dilithium::{keypair, keypair_derive, sign, verify, verify_batch};
pub use dilithium::{PUBLIC_KEY_BYTES, SECRET_KEY_BYTES, SIGNATURE_BYTES};
pub use error::{CryptoError, CryptoResult};

/// Provides a simplified interface to the most commonly used operations.
pub mod prelude {
    pub use crate::dilithium::{
        keypair, keypair_derive, public_key_from_bytes, sign, verify, verify_batch,
        ExpandedPublicKey, Params, PublicKey, Signature,
    };
    pub use crate::secure_memory::with_secure_scope;
    pub use crate::secure_memory::SecureBytes;
    pub use crate::CryptoError;
    pub use crate::CryptoResult;
    pub use crate::DilithiumKeyPair;
    pub use crate::DilithiumPublicKey;
    pub use crate::DilithiumVariant;
}

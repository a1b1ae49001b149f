/*!
 * CRYSTALS-Dilithium implementation for quantum-resistant digital signatures
 *
 * This module implements the round-3 CRYSTALS-Dilithium signature scheme
 * natively: ring arithmetic and the NTT over `Z_q[X]/(X^256 + 1)`, SHAKE
 * based sampling, the rejection-sampling signer, the verifier, and the
 * packed wire formats for keys and signatures.
 */

mod dilithium;
pub mod ntt;
pub mod packing;
pub mod params;
pub mod poly;
pub mod polyvec;
pub mod reduce;
pub mod rounding;
pub mod sampling;
pub mod sign;

pub use dilithium::*;
pub use packing::{PublicKey, SecretKey, Signature};
pub use params::{
    DilithiumParameters, DilithiumVariant, PUBLIC_KEY_BYTES, SECRET_KEY_BYTES, SIGNATURE_BYTES,
};
pub use sign::{ExpandedPublicKey, MAX_SIGNING_ATTEMPTS};

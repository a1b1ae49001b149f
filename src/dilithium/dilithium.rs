/*!
 * CRYSTALS-Dilithium key pairs, signing and verification
 *
 * This module is the byte-level surface of the signature engine: keys and
 * signatures travel as packed byte strings, and the structured views
 * ([`PublicKey`], [`Signature`], [`ExpandedPublicKey`]) are available for
 * callers that need to serialize them another way.
 */

use std::collections::HashMap;
use std::fmt;

use log::warn;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use zeroize::Zeroize;

use super::packing::{PublicKey, SecretKey, Signature};
use super::params::{DilithiumVariant, CRH_BYTES, SEED_BYTES};
use super::sign::{self, ExpandedPublicKey};
use crate::error::{error_codes, CryptoError, CryptoResult};
use crate::secure_memory::{with_secure_scope, SecureBytes};

/// CRYSTALS-Dilithium key pair for digital signatures
///
/// The secret key is held in a [`SecureBytes`] container and is wiped when
/// the key pair is dropped. `Debug` output never includes it.
#[derive(Clone)]
pub struct DilithiumKeyPair {
    /// Packed public key, `rho ‖ t1`
    pub public_key: Vec<u8>,
    secret_key: SecureBytes,
    /// The algorithm variant (Dilithium2, Dilithium3, or Dilithium5)
    pub algorithm: DilithiumVariant,
}

impl fmt::Debug for DilithiumKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DilithiumKeyPair")
            .field("public_key", &hex::encode(&self.public_key))
            .field("secret_key", &"<elided>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl Zeroize for DilithiumKeyPair {
    fn zeroize(&mut self) {
        self.secret_key.zeroize();
    }
}

/// Public key only version of DilithiumKeyPair for sharing with others
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DilithiumPublicKey {
    /// Packed public key, `rho ‖ t1`
    pub public_key: Vec<u8>,
    /// The algorithm variant (Dilithium2, Dilithium3, or Dilithium5)
    pub algorithm: DilithiumVariant,
}

/// Byte lengths and security level of one parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Params {
    pub variant: DilithiumVariant,
    pub public_key_bytes: usize,
    pub secret_key_bytes: usize,
    pub signature_bytes: usize,
}

impl Params {
    pub fn new(variant: DilithiumVariant) -> Self {
        Self {
            variant,
            public_key_bytes: variant.public_key_size(),
            secret_key_bytes: variant.secret_key_size(),
            signature_bytes: variant.signature_size(),
        }
    }

    pub fn security_level(&self) -> u8 {
        self.variant.security_level()
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new(DilithiumVariant::default())
    }
}

fn seed_from_slice(seed: &[u8]) -> CryptoResult<[u8; SEED_BYTES]> {
    seed.try_into().map_err(|_| CryptoError::InvalidParameter {
        parameter: "seed".to_string(),
        expected: format!("{} bytes", SEED_BYTES),
        actual: format!("{} bytes", seed.len()),
        error_code: error_codes::DILITHIUM_INVALID_SEED,
    })
}

fn fill_random<R: RngCore + CryptoRng>(rng: &mut R, buf: &mut [u8]) -> CryptoResult<()> {
    rng.try_fill_bytes(buf).map_err(|e| {
        warn!("Entropy source failed: {}", e);
        CryptoError::from(e)
    })
}

impl DilithiumKeyPair {
    /// Generate a new Dilithium key pair with the specified variant
    ///
    /// # Arguments
    ///
    /// * `variant` - The Dilithium variant to use (Dilithium2, Dilithium3, or Dilithium5)
    ///
    /// # Returns
    ///
    /// A new DilithiumKeyPair, or `RandomGenerationError` if the operating
    /// system could not supply a seed
    pub fn generate(variant: DilithiumVariant) -> CryptoResult<Self> {
        Self::generate_with_rng(variant, &mut OsRng)
    }

    /// Generate a key pair from a caller-supplied cryptographic RNG.
    ///
    /// The RNG is consulted once, for the 32-byte derivation seed.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(
        variant: DilithiumVariant,
        rng: &mut R,
    ) -> CryptoResult<Self> {
        let mut seed = [0u8; SEED_BYTES];
        with_secure_scope(&mut seed, |seed| {
            fill_random(rng, seed)?;
            Ok(Self::from_seed(seed, variant))
        })
    }

    /// Deterministically derive a key pair from a 32-byte seed
    ///
    /// # Arguments
    ///
    /// * `seed` - Exactly 32 bytes; any other length is rejected with
    ///   `InvalidParameter`
    /// * `variant` - The Dilithium variant to use
    pub fn derive(seed: &[u8], variant: DilithiumVariant) -> CryptoResult<Self> {
        let mut seed = seed_from_slice(seed)?;
        let keypair = Self::from_seed(&seed, variant);
        seed.zeroize();
        Ok(keypair)
    }

    fn from_seed(seed: &[u8; SEED_BYTES], variant: DilithiumVariant) -> Self {
        let (pk, sk) = sign::keypair_from_seed(seed, variant);
        Self {
            public_key: pk.to_bytes(),
            secret_key: SecureBytes::from(sk.to_bytes()),
            algorithm: variant,
        }
    }

    /// Rebuild a key pair from its packed parts. Both keys are fully
    /// decoded and checked against each other.
    pub fn from_parts(public_key: &[u8], secret_key: &[u8]) -> CryptoResult<Self> {
        let variant = DilithiumVariant::from_public_key_size(public_key.len()).ok_or_else(|| {
            CryptoError::decode_error(
                "public key",
                &format!("length {} matches no parameter set", public_key.len()),
                error_codes::DILITHIUM_INVALID_KEY_SIZE,
            )
        })?;
        let pk = PublicKey::from_bytes(public_key, variant)?;
        let sk = SecretKey::from_bytes(secret_key, variant)?;
        if !sign::keys_match(&pk, &sk) {
            return Err(CryptoError::decode_error(
                "secret key",
                "does not belong to the public key",
                error_codes::DILITHIUM_INVALID_SECRET_KEY,
            ));
        }

        Ok(Self {
            public_key: public_key.to_vec(),
            secret_key: SecureBytes::new(secret_key),
            algorithm: variant,
        })
    }

    /// Sign a message deterministically: the same key and message always
    /// give the same signature.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to sign
    ///
    /// # Returns
    ///
    /// The packed signature or an error
    pub fn sign(&self, message: &[u8]) -> CryptoResult<Vec<u8>> {
        let sk = self.secret()?;
        Ok(sign::sign(&sk, message, None)?.to_bytes())
    }

    /// Sign a message with fresh randomness from the operating system.
    pub fn sign_randomized(&self, message: &[u8]) -> CryptoResult<Vec<u8>> {
        self.sign_randomized_with_rng(message, &mut OsRng)
    }

    pub fn sign_randomized_with_rng<R: RngCore + CryptoRng>(
        &self,
        message: &[u8],
        rng: &mut R,
    ) -> CryptoResult<Vec<u8>> {
        let sk = self.secret()?;
        let mut rhoprime = [0u8; CRH_BYTES];
        with_secure_scope(&mut rhoprime, |rhoprime| {
            fill_random(rng, rhoprime)?;
            Ok(sign::sign(&sk, message, Some(&*rhoprime))?.to_bytes())
        })
    }

    /// Verify a signature with this key pair's public key
    ///
    /// # Returns
    ///
    /// Ok(true) if the signature is valid, Ok(false) if invalid or malformed
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> CryptoResult<bool> {
        self.public_key().verify(message, signature)
    }

    /// Extract the public key from this key pair
    pub fn public_key(&self) -> DilithiumPublicKey {
        DilithiumPublicKey {
            public_key: self.public_key.clone(),
            algorithm: self.algorithm,
        }
    }

    /// Packed secret key bytes. Handle with care.
    pub fn expose_secret(&self) -> &[u8] {
        self.secret_key.as_bytes()
    }

    fn secret(&self) -> CryptoResult<SecretKey> {
        SecretKey::from_bytes(self.secret_key.as_bytes(), self.algorithm)
    }

    /// Decoded public key
    pub fn pk(&self) -> CryptoResult<PublicKey> {
        PublicKey::from_bytes(&self.public_key, self.algorithm)
    }

    /// Public key with the matrix already expanded
    pub fn expanded_pk(&self) -> CryptoResult<ExpandedPublicKey> {
        Ok(ExpandedPublicKey::from_public_key(&self.pk()?))
    }

    /// Decode a packed signature of the given variant into its parts.
    pub fn sig_from_bytes(signature: &[u8], variant: DilithiumVariant) -> CryptoResult<Signature> {
        Signature::from_bytes(signature, variant)
    }

    /// Sign a UTF-8 message and return the decoded signature as JSON.
    pub fn sign_json(&self, message: &str) -> CryptoResult<String> {
        let sk = self.secret()?;
        let sig = sign::sign(&sk, message.as_bytes(), None)?;
        Ok(serde_json::to_string(&sig)?)
    }

    pub fn pk_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(&self.pk()?)?)
    }

    pub fn expanded_pk_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(&self.expanded_pk()?)?)
    }

    /// Test key generation for constant-time execution
    #[cfg(feature = "constant-time-testing")]
    pub fn generate_test_constant_time(
        variant: DilithiumVariant,
        config: &crate::security::constant_time::ConstantTimeConfig,
    ) -> CryptoResult<crate::security::constant_time::ConstantTimeResult> {
        use crate::security::constant_time::verify_constant_time;

        let operation = |seed: &[u8; SEED_BYTES]| {
            let _ = Self::derive(seed, variant);
        };
        let mut counter = 0u8;
        let input_generator = || {
            counter = counter.wrapping_add(1);
            [counter; SEED_BYTES]
        };

        verify_constant_time(operation, input_generator, config)
    }

    /// Test signing for constant-time execution
    #[cfg(feature = "constant-time-testing")]
    pub fn sign_test_constant_time(
        &self,
        message: &[u8],
        config: &crate::security::constant_time::ConstantTimeConfig,
    ) -> CryptoResult<crate::security::constant_time::ConstantTimeResult> {
        use crate::security::constant_time::verify_constant_time;

        let operation = |msg: &Vec<u8>| {
            let _ = self.sign(msg);
        };
        let input_generator = || message.to_vec();

        verify_constant_time(operation, input_generator, config)
    }
}

impl DilithiumPublicKey {
    /// Verify a signature on a message using this public key
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the signature is valid, `Ok(false)` if it is invalid or
    /// malformed. An error is returned only when this public key itself
    /// cannot be decoded.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> CryptoResult<bool> {
        let pk = self.decode()?;
        Ok(match Signature::from_bytes(signature, self.algorithm) {
            Ok(sig) => sign::verify(&pk, message, &sig),
            Err(_) => false,
        })
    }

    /// Decoded view of the packed key
    pub fn decode(&self) -> CryptoResult<PublicKey> {
        PublicKey::from_bytes(&self.public_key, self.algorithm)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.public_key.clone()
    }

    /// Wrap a packed public key, identifying the variant by its length
    pub fn from_bytes(data: &[u8]) -> CryptoResult<Self> {
        let algorithm = DilithiumVariant::from_public_key_size(data.len()).ok_or_else(|| {
            CryptoError::decode_error(
                "public key",
                &format!("length {} matches no parameter set", data.len()),
                error_codes::DILITHIUM_INVALID_KEY_SIZE,
            )
        })?;
        Ok(Self {
            public_key: data.to_vec(),
            algorithm,
        })
    }

    /// Generate a fingerprint of this public key
    ///
    /// This can be used as a short identifier for the public key: the
    /// first 8 bytes of SHA3-256 over the security level and the packed
    /// key, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update([self.algorithm.security_level()]);
        hasher.update(&self.public_key);
        let hash = hasher.finalize();

        hex::encode(&hash[..8])
    }

    /// Test verification for constant-time execution
    #[cfg(feature = "constant-time-testing")]
    pub fn verify_test_constant_time(
        &self,
        message: &[u8],
        signature: &[u8],
        config: &crate::security::constant_time::ConstantTimeConfig,
    ) -> CryptoResult<crate::security::constant_time::ConstantTimeResult> {
        use crate::security::constant_time::verify_constant_time;

        let operation = |sig: &Vec<u8>| {
            let _ = self.verify(message, sig);
        };
        let input_generator = || signature.to_vec();

        verify_constant_time(operation, input_generator, config)
    }
}

/// Generate a Dilithium3 key pair from operating-system randomness.
///
/// Returns the packed public key and the packed secret key.
pub fn keypair() -> CryptoResult<(Vec<u8>, SecureBytes)> {
    let kp = DilithiumKeyPair::generate(DilithiumVariant::default())?;
    Ok((kp.public_key.clone(), kp.secret_key.clone()))
}

/// Derive a Dilithium3 key pair from a 32-byte seed.
pub fn keypair_derive(seed: &[u8]) -> CryptoResult<(Vec<u8>, SecureBytes)> {
    let kp = DilithiumKeyPair::derive(seed, DilithiumVariant::default())?;
    Ok((kp.public_key.clone(), kp.secret_key.clone()))
}

/// Sign `message` with a packed secret key. The parameter set is identified
/// from the key length.
pub fn sign(secret_key: &[u8], message: &[u8]) -> CryptoResult<Vec<u8>> {
    let variant = DilithiumVariant::from_secret_key_size(secret_key.len()).ok_or_else(|| {
        CryptoError::decode_error(
            "secret key",
            &format!("length {} matches no parameter set", secret_key.len()),
            error_codes::DILITHIUM_INVALID_KEY_SIZE,
        )
    })?;
    let sk = SecretKey::from_bytes(secret_key, variant)?;
    Ok(sign::sign(&sk, message, None)?.to_bytes())
}

/// Check a packed signature against a packed public key.
///
/// Never fails: inputs of the wrong length or with malformed fields give
/// `false`.
pub fn verify(signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
    DilithiumPublicKey::from_bytes(public_key)
        .and_then(|pk| pk.verify(message, signature))
        .unwrap_or(false)
}

/// Decode a packed public key, identifying the variant by its length.
pub fn public_key_from_bytes(public_key: &[u8]) -> CryptoResult<PublicKey> {
    DilithiumPublicKey::from_bytes(public_key)?.decode()
}

/// Verify several `(message, signature, public key)` triples.
///
/// Entries are independent; a malformed entry yields `false` without
/// affecting the others. Matrix expansion is shared between entries signed
/// under the same key.
pub fn verify_batch(items: &[(&[u8], &[u8], &DilithiumPublicKey)]) -> Vec<bool> {
    let mut expanded: HashMap<(DilithiumVariant, &[u8]), Option<ExpandedPublicKey>> =
        HashMap::new();

    items
        .iter()
        .map(|&(message, signature, public_key)| {
            let epk = expanded
                .entry((public_key.algorithm, public_key.public_key.as_slice()))
                .or_insert_with(|| {
                    public_key
                        .decode()
                        .ok()
                        .map(|pk| ExpandedPublicKey::from_public_key(&pk))
                });
            match (epk, Signature::from_bytes(signature, public_key.algorithm)) {
                (Some(epk), Ok(sig)) => sign::verify_expanded(epk, message, &sig),
                _ => false,
            }
        })
        .collect()
}

//! Key generation, signing and verification over decoded structures
//!
//! These functions work on [`PublicKey`], [`SecretKey`] and [`Signature`]
//! values. Byte-level entry points live in the parent module.

use log::{debug, error, trace};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::packing::{self, PublicKey, SecretKey, Signature};
use super::params::{DilithiumVariant, CRH_BYTES, Q, SEED_BYTES};
use super::poly::Ntt;
use super::polyvec::{Matrix, PolyVec};
use super::sampling::{self, shake256};
use crate::error::{error_codes, CryptoError, CryptoResult};
use crate::security::constant_time::ConstantTime;

/// Hard ceiling on rejection-loop iterations. The expected number is below
/// six for every parameter set; reaching the ceiling means a broken
/// parameter table or arithmetic bug.
pub const MAX_SIGNING_ATTEMPTS: u32 = 1000;

/// Public key with `A` expanded and `t1·2^d` transformed, for verifiers
/// that check many signatures under the same key.
///
/// Deserialization checks the dimensions against the variant and that
/// every coefficient lies in `(-q, q)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ExpandedPublicKeyFields")]
pub struct ExpandedPublicKey {
    pub variant: DilithiumVariant,
    pub tr: [u8; SEED_BYTES],
    pub mat: Matrix,
    pub t1: PolyVec<Ntt>,
}

#[derive(Deserialize)]
struct ExpandedPublicKeyFields {
    variant: DilithiumVariant,
    tr: [u8; SEED_BYTES],
    mat: Matrix,
    t1: PolyVec<Ntt>,
}

impl TryFrom<ExpandedPublicKeyFields> for ExpandedPublicKey {
    type Error = CryptoError;

    fn try_from(fields: ExpandedPublicKeyFields) -> CryptoResult<Self> {
        let epk = Self {
            variant: fields.variant,
            tr: fields.tr,
            mat: fields.mat,
            t1: fields.t1,
        };
        epk.validate()?;
        Ok(epk)
    }
}

impl ExpandedPublicKey {
    pub fn from_public_key(pk: &PublicKey) -> Self {
        let params = pk.variant.params();
        let mut tr = [0u8; SEED_BYTES];
        shake256(&[&pk.to_bytes()], &mut tr);

        let mut t1 = pk.t1.clone();
        t1.shiftl();
        let mut t1 = t1.ntt();
        t1.reduce();

        Self {
            variant: pk.variant,
            tr,
            mat: Matrix::expand(&pk.rho, params),
            t1,
        }
    }

    /// Check that `A` is `k × l`, `t1` has `k` entries, and all
    /// coefficients lie in `(-q, q)`.
    pub fn validate(&self) -> CryptoResult<()> {
        let params = self.variant.params();
        let malformed = |cause: &str| {
            CryptoError::decode_error(
                "expanded public key",
                cause,
                error_codes::DILITHIUM_INVALID_PUBLIC_KEY,
            )
        };

        let rows = self.mat.rows();
        if rows.len() != params.k
            || rows.iter().any(|row| row.len() != params.l)
            || self.t1.len() != params.k
        {
            return Err(malformed("wrong matrix or vector dimensions"));
        }
        if rows
            .iter()
            .flat_map(PolyVec::iter)
            .chain(self.t1.iter())
            .flat_map(|p| p.coeffs().iter())
            .any(|&c| c <= -Q || c >= Q)
        {
            return Err(malformed("coefficient out of range"));
        }
        Ok(())
    }
}

/// Secret vectors in NTT form for the duration of one signing call
#[derive(Zeroize, ZeroizeOnDrop)]
struct SecretNtt {
    s1: PolyVec<Ntt>,
    s2: PolyVec<Ntt>,
    t0: PolyVec<Ntt>,
}

/// `t = A·s1 + s2` with standard representatives
fn commit_secret(mat: &Matrix, s1: &PolyVec, s2: &PolyVec) -> PolyVec {
    let mut s1hat = s1.ntt();
    let mut t = mat.mul_montgomery(&s1hat);
    s1hat.zeroize();
    t.reduce();
    let mut t = t.inverse_tomont();
    t.add_assign(s2);
    t.caddq();
    t
}

/// Whether `sk` is the secret half of `pk`: the matrix seed and the
/// public-key hash agree, and `t1` recomputed from `s1`, `s2` matches.
/// The comparison runs without data-dependent branches.
pub fn keys_match(pk: &PublicKey, sk: &SecretKey) -> bool {
    if pk.variant != sk.variant || pk.validate().is_err() {
        return false;
    }
    let params = sk.variant.params();

    let mut tr = [0u8; SEED_BYTES];
    shake256(&[&pk.to_bytes()], &mut tr);

    let mut t = commit_secret(&Matrix::expand(&sk.rho, params), &sk.s1, &sk.s2);
    let (t1, mut t0) = t.power2round();
    t.zeroize();
    t0.zeroize();

    bool::from(pk.rho.ct_eq(&sk.rho) & tr.ct_eq(&sk.tr) & t1.ct_eq(&pk.t1))
}

/// Derive a key pair from a 32-byte seed.
///
/// `SHAKE256(seed)` is split into `rho` (matrix seed), `rho'` (secret
/// vector seed) and `key` (signing seed).
pub fn keypair_from_seed(seed: &[u8; SEED_BYTES], variant: DilithiumVariant) -> (PublicKey, SecretKey) {
    let params = variant.params();

    let mut seedbuf = [0u8; 2 * SEED_BYTES + CRH_BYTES];
    shake256(&[seed], &mut seedbuf);
    let mut rho = [0u8; SEED_BYTES];
    let mut rhoprime = [0u8; CRH_BYTES];
    let mut key = [0u8; SEED_BYTES];
    rho.copy_from_slice(&seedbuf[..SEED_BYTES]);
    rhoprime.copy_from_slice(&seedbuf[SEED_BYTES..SEED_BYTES + CRH_BYTES]);
    key.copy_from_slice(&seedbuf[SEED_BYTES + CRH_BYTES..]);
    seedbuf.zeroize();

    let s1 = PolyVec::from_polys(
        (0..params.l)
            .map(|i| sampling::sample_short(&rhoprime, i as u16, params.eta))
            .collect(),
    );
    let s2 = PolyVec::from_polys(
        (0..params.k)
            .map(|i| sampling::sample_short(&rhoprime, (params.l + i) as u16, params.eta))
            .collect(),
    );
    rhoprime.zeroize();

    let mut t = commit_secret(&Matrix::expand(&rho, params), &s1, &s2);
    let (t1, t0) = t.power2round();
    t.zeroize();

    let pk = PublicKey { variant, rho, t1 };
    let mut tr = [0u8; SEED_BYTES];
    shake256(&[&pk.to_bytes()], &mut tr);

    debug!("Derived {} key pair", variant);

    let sk = SecretKey {
        variant,
        rho,
        key,
        tr,
        s1,
        s2,
        t0,
    };
    key.zeroize();
    (pk, sk)
}

/// Sign `message`. With `randomness` absent the signature is a
/// deterministic function of the key and message.
pub fn sign(
    sk: &SecretKey,
    message: &[u8],
    randomness: Option<&[u8; CRH_BYTES]>,
) -> CryptoResult<Signature> {
    sign_with_ceiling(sk, message, randomness, MAX_SIGNING_ATTEMPTS)
}

pub(crate) fn sign_with_ceiling(
    sk: &SecretKey,
    message: &[u8],
    randomness: Option<&[u8; CRH_BYTES]>,
    max_attempts: u32,
) -> CryptoResult<Signature> {
    let params = sk.variant.params();

    let mut mu = [0u8; CRH_BYTES];
    shake256(&[&sk.tr, message], &mut mu);

    let mut rhoprime = [0u8; CRH_BYTES];
    match randomness {
        Some(r) => rhoprime.copy_from_slice(r),
        None => shake256(&[&sk.key, &mu], &mut rhoprime),
    }

    let mat = Matrix::expand(&sk.rho, params);
    let secret = SecretNtt {
        s1: sk.s1.ntt(),
        s2: sk.s2.ntt(),
        t0: sk.t0.ntt(),
    };

    for attempt in 0..max_attempts {
        let nonce_base = params.l * attempt as usize;
        let mut y = PolyVec::from_polys(
            (0..params.l)
                .map(|i| sampling::sample_mask(&rhoprime, (nonce_base + i) as u16, params.gamma1))
                .collect(),
        );

        // Commitment w = A·y and its high bits
        let mut w = mat.mul_montgomery(&y.ntt());
        w.reduce();
        let mut w = w.inverse_tomont();
        w.caddq();
        let (w1, mut w0) = w.decompose(params.gamma2);
        w.zeroize();

        let mut c = [0u8; SEED_BYTES];
        shake256(&[&mu, &packing::pack_w1_vec(&w1, params)], &mut c);
        let cp = sampling::sample_challenge(&c, params.tau).ntt();

        let mut z = secret.s1.pointwise_poly_montgomery(&cp).inverse_tomont();
        z.add_assign(&y);
        y.zeroize();
        z.reduce();
        let z_bad = z.norm_exceeds(params.gamma1 - params.beta);

        let mut cs2 = secret.s2.pointwise_poly_montgomery(&cp).inverse_tomont();
        w0.sub_assign(&cs2);
        cs2.zeroize();
        w0.reduce();
        let w0_bad = w0.norm_exceeds(params.gamma2 - params.beta);

        let mut ct0 = secret.t0.pointwise_poly_montgomery(&cp).inverse_tomont();
        ct0.reduce();
        let ct0_bad = ct0.norm_exceeds(params.gamma2);

        if bool::from(z_bad | w0_bad | ct0_bad) {
            trace!("Signing attempt {} rejected on norm bound", attempt + 1);
            z.zeroize();
            w0.zeroize();
            ct0.zeroize();
            continue;
        }

        w0.add_assign(&ct0);
        ct0.zeroize();
        let (h, hint_count) = PolyVec::make_hint(&w0, &w1, params.gamma2);
        w0.zeroize();
        if hint_count > params.omega {
            trace!(
                "Signing attempt {} rejected with {} hint bits",
                attempt + 1,
                hint_count
            );
            z.zeroize();
            continue;
        }

        rhoprime.zeroize();
        debug!(
            "Produced {} signature after {} attempt(s)",
            sk.variant,
            attempt + 1
        );
        return Ok(Signature {
            variant: sk.variant,
            c,
            z,
            h,
        });
    }

    rhoprime.zeroize();
    error!(
        "Rejection sampling for {} exceeded {} attempts",
        sk.variant, max_attempts
    );
    Err(CryptoError::RejectionBoundExceeded {
        attempts: max_attempts,
        variant: sk.variant.to_string(),
        error_code: error_codes::DILITHIUM_REJECTION_BOUND_EXCEEDED,
    })
}

/// Check `sig` on `message` under `pk`.
pub fn verify(pk: &PublicKey, message: &[u8], sig: &Signature) -> bool {
    if pk.validate().is_err() {
        return false;
    }
    verify_expanded(&ExpandedPublicKey::from_public_key(pk), message, sig)
}

/// Check `sig` on `message` under a pre-expanded key. Structures without a
/// packed encoding are rejected up front; after that both conditions (norm
/// of `z`, recomputed challenge) are evaluated before the result is
/// combined.
pub fn verify_expanded(epk: &ExpandedPublicKey, message: &[u8], sig: &Signature) -> bool {
    if sig.variant != epk.variant || sig.validate().is_err() || epk.validate().is_err() {
        return false;
    }
    let params = epk.variant.params();

    let mut mu = [0u8; CRH_BYTES];
    shake256(&[&epk.tr, message], &mut mu);

    let z_ok = !sig.z.norm_exceeds(params.gamma1 - params.beta);

    let cp = sampling::sample_challenge(&sig.c, params.tau).ntt();
    let mut w = epk.mat.mul_montgomery(&sig.z.ntt());
    let ct1 = epk.t1.pointwise_poly_montgomery(&cp);
    w.sub_assign(&ct1);
    w.reduce();
    let mut w = w.inverse_tomont();
    w.caddq();
    let w1 = w.use_hint(&sig.h, params.gamma2);

    let mut c = [0u8; SEED_BYTES];
    shake256(&[&mu, &packing::pack_w1_vec(&w1, params)], &mut c);

    bool::from(c.ct_eq(&sig.c) & z_ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_is_deterministic() {
        let (pk_a, sk_a) = keypair_from_seed(&[7u8; SEED_BYTES], DilithiumVariant::Dilithium2);
        let (pk_b, sk_b) = keypair_from_seed(&[7u8; SEED_BYTES], DilithiumVariant::Dilithium2);
        assert_eq!(pk_a, pk_b);
        assert_eq!(sk_a.to_bytes(), sk_b.to_bytes());
    }

    #[test]
    fn test_secret_key_consistent_with_public_key() {
        let (pk, sk) = keypair_from_seed(&[1u8; SEED_BYTES], DilithiumVariant::Dilithium3);
        let mut tr = [0u8; SEED_BYTES];
        shake256(&[&pk.to_bytes()], &mut tr);
        assert_eq!(sk.tr, tr);
        assert_eq!(sk.rho, pk.rho);
        let params = DilithiumVariant::Dilithium3.params();
        assert!(sk.s1.iter().all(|p| p.infinity_norm() <= params.eta));
        assert!(sk.t0.iter().all(|p| p.infinity_norm() <= 1 << 12));
    }

    #[test]
    fn test_sign_then_verify_all_variants() {
        for variant in DilithiumVariant::ALL {
            let (pk, sk) = keypair_from_seed(&[variant.security_level(); SEED_BYTES], variant);
            let sig = sign(&sk, b"engine", None).unwrap();
            assert!(verify(&pk, b"engine", &sig), "{}", variant);
            assert!(!verify(&pk, b"engin3", &sig), "{}", variant);
        }
    }

    #[test]
    fn test_signature_satisfies_bounds() {
        let variant = DilithiumVariant::Dilithium3;
        let params = variant.params();
        let (_, sk) = keypair_from_seed(&[2u8; SEED_BYTES], variant);
        let sig = sign(&sk, b"bounds", None).unwrap();
        assert!(sig.z.infinity_norm() < params.gamma1 - params.beta);
        let hints: usize = sig.h.iter().map(|p| p.weight()).sum();
        assert!(hints <= params.omega);
    }

    #[test]
    fn test_randomized_signing_differs_but_verifies() {
        let variant = DilithiumVariant::Dilithium2;
        let (pk, sk) = keypair_from_seed(&[3u8; SEED_BYTES], variant);
        let a = sign(&sk, b"msg", Some(&[1u8; CRH_BYTES])).unwrap();
        let b = sign(&sk, b"msg", Some(&[2u8; CRH_BYTES])).unwrap();
        assert_ne!(a, b);
        assert!(verify(&pk, b"msg", &a));
        assert!(verify(&pk, b"msg", &b));
    }

    #[test]
    fn test_ceiling_reports_bound_exceeded() {
        let (_, sk) = keypair_from_seed(&[4u8; SEED_BYTES], DilithiumVariant::Dilithium2);
        let err = sign_with_ceiling(&sk, b"x", None, 0).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::RejectionBoundExceeded { attempts: 0, .. }
        ));
        assert_eq!(err.error_code(), error_codes::DILITHIUM_REJECTION_BOUND_EXCEEDED);
    }

    #[test]
    fn test_expanded_key_matches_plain_verify() {
        let (pk, sk) = keypair_from_seed(&[5u8; SEED_BYTES], DilithiumVariant::Dilithium5);
        let sig = sign(&sk, b"expanded", None).unwrap();
        let epk = ExpandedPublicKey::from_public_key(&pk);
        assert!(verify_expanded(&epk, b"expanded", &sig));
        assert_eq!(verify(&pk, b"other", &sig), verify_expanded(&epk, b"other", &sig));
    }

    #[test]
    fn test_variant_mismatch_rejected() {
        let (pk2, _) = keypair_from_seed(&[6u8; SEED_BYTES], DilithiumVariant::Dilithium2);
        let (_, sk3) = keypair_from_seed(&[6u8; SEED_BYTES], DilithiumVariant::Dilithium3);
        let sig = sign(&sk3, b"m", None).unwrap();
        assert!(!verify(&pk2, b"m", &sig));
    }

    #[test]
    fn test_verify_rejects_signatures_without_encoding() {
        let variant = DilithiumVariant::Dilithium2;
        let (pk, sk) = keypair_from_seed(&[8u8; SEED_BYTES], variant);
        let sig = sign(&sk, b"strict", None).unwrap();
        assert!(verify(&pk, b"strict", &sig));

        let mut huge_z = sig.clone();
        huge_z.z.polys[0].coeffs[0] = i32::MAX;
        assert!(!verify(&pk, b"strict", &huge_z));

        let mut edge_z = sig.clone();
        edge_z.z.polys[1].coeffs[7] = -variant.params().gamma1;
        assert!(!verify(&pk, b"strict", &edge_z));

        // A hint value other than 0 or 1 has no packed form
        let (i, j) = sig
            .h
            .iter()
            .enumerate()
            .find_map(|(i, p)| p.coeffs().iter().position(|&c| c == 1).map(|j| (i, j)))
            .unwrap_or((0, 9));
        let mut wide_hint = sig.clone();
        wide_hint.h.polys[i].coeffs[j] = 7;
        assert!(!verify(&pk, b"strict", &wide_hint));

        let mut short_z = sig;
        short_z.z.polys.pop();
        assert!(!verify(&pk, b"strict", &short_z));
    }

    #[test]
    fn test_verify_rejects_public_key_without_encoding() {
        let (mut pk, sk) = keypair_from_seed(&[9u8; SEED_BYTES], DilithiumVariant::Dilithium3);
        let sig = sign(&sk, b"pk", None).unwrap();
        pk.t1.polys[0].coeffs[0] = i32::MIN;
        assert!(!verify(&pk, b"pk", &sig));
    }

    #[test]
    fn test_expanded_key_json_is_validated() {
        let (pk, _) = keypair_from_seed(&[10u8; SEED_BYTES], DilithiumVariant::Dilithium2);
        let epk = ExpandedPublicKey::from_public_key(&pk);
        assert!(epk.validate().is_ok());
        let json = serde_json::to_string(&epk).unwrap();
        assert_eq!(serde_json::from_str::<ExpandedPublicKey>(&json).unwrap(), epk);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["mat"]["rows"].as_array_mut().unwrap().pop();
        assert!(serde_json::from_value::<ExpandedPublicKey>(value).is_err());

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["variant"] = serde_json::json!("Dilithium5");
        assert!(serde_json::from_value::<ExpandedPublicKey>(value).is_err());
    }

    #[test]
    fn test_keys_match() {
        let variant = DilithiumVariant::Dilithium3;
        let (pk, sk) = keypair_from_seed(&[11u8; SEED_BYTES], variant);
        assert!(keys_match(&pk, &sk));

        let (other_pk, other_sk) = keypair_from_seed(&[12u8; SEED_BYTES], variant);
        assert!(!keys_match(&other_pk, &sk));
        assert!(!keys_match(&pk, &other_sk));

        // Same seed and hash but a different secret vector
        let mut tampered = sk.clone();
        tampered.s1.polys[0].coeffs[0] = -tampered.s1.polys[0].coeffs[0] + 1;
        assert!(!keys_match(&pk, &tampered));
    }
}

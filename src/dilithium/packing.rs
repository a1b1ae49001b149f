//! Wire encodings of keys and signatures
//!
//! Coefficients are packed as a little-endian bit stream: coefficient `i`
//! occupies bits `i·w .. (i+1)·w` of the polynomial's byte string, least
//! significant bit first. With `w` the field width:
//!
//! | field | w                  | stored value   |
//! |-------|--------------------|----------------|
//! | `t1`  | 10                 | `t1`           |
//! | `t0`  | 13                 | `2^12 - t0`    |
//! | `s`   | 3 (eta 2), 4 (eta 4) | `eta - s`    |
//! | `z`   | 18 (gamma1 2^17), 20 (gamma1 2^19) | `gamma1 - z` |
//! | `w1`  | 6 (gamma2 (q-1)/88), 4 (gamma2 (q-1)/32) | `w1` |
//!
//! Structure layouts (offsets in bytes, `P_x` the packed size of one
//! polynomial of field `x`):
//!
//! ```text
//! public key : rho [0, 32) ‖ t1 [32, 32 + k·320)
//! secret key : rho [0, 32) ‖ key [32, 64) ‖ tr [64, 96)
//!              ‖ s1 (l·P_s) ‖ s2 (k·P_s) ‖ t0 (k·416)
//! signature  : c~ [0, 32) ‖ z (l·P_z) ‖ h (omega + k)
//! ```
//!
//! The hint `h` is stored sparsely: the first `omega` bytes hold the
//! positions of the set bits, polynomial after polynomial, each run in
//! strictly increasing order; byte `omega + i` holds the running count of
//! positions after polynomial `i`. Unused position bytes must be zero.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::params::{
    eta_bits, z_bits, DilithiumParameters, DilithiumVariant, D, N, POLY_T0_PACKED_BYTES,
    POLY_T1_PACKED_BYTES, SEED_BYTES,
};
use super::poly::{Normal, Poly};
use super::polyvec::PolyVec;
use crate::error::{error_codes, CryptoError, CryptoResult};

fn pack_bits(values: &[u32; N], bits: u32, out: &mut [u8]) {
    debug_assert_eq!(out.len(), N * bits as usize / 8);
    let mut acc = 0u64;
    let mut filled = 0u32;
    let mut pos = 0;
    for &v in values.iter() {
        acc |= (v as u64) << filled;
        filled += bits;
        while filled >= 8 {
            out[pos] = acc as u8;
            acc >>= 8;
            filled -= 8;
            pos += 1;
        }
    }
}

fn unpack_bits(bytes: &[u8], bits: u32) -> [u32; N] {
    debug_assert_eq!(bytes.len(), N * bits as usize / 8);
    let mask = (1u64 << bits) - 1;
    let mut out = [0u32; N];
    let mut acc = 0u64;
    let mut filled = 0u32;
    let mut idx = 0;
    for &byte in bytes.iter() {
        acc |= (byte as u64) << filled;
        filled += 8;
        while filled >= bits && idx < N {
            out[idx] = (acc & mask) as u32;
            acc >>= bits;
            filled -= bits;
            idx += 1;
        }
    }
    out
}

fn pack_offset(p: &Poly, offset: i32, bits: u32, out: &mut [u8]) {
    let mut values = [0u32; N];
    for (v, &c) in values.iter_mut().zip(p.coeffs().iter()) {
        *v = (offset - c) as u32;
    }
    pack_bits(&values, bits, out);
    values.zeroize();
}

fn unpack_offset(bytes: &[u8], offset: i32, bits: u32) -> Poly {
    let mut values = unpack_bits(bytes, bits);
    let mut coeffs = [0i32; N];
    for (c, &v) in coeffs.iter_mut().zip(values.iter()) {
        *c = offset - v as i32;
    }
    values.zeroize();
    Poly::from_coeffs(coeffs)
}

/// `t1` coefficients in `[0, 2^10)`.
pub fn pack_t1(p: &Poly, out: &mut [u8]) {
    let mut values = [0u32; N];
    for (v, &c) in values.iter_mut().zip(p.coeffs().iter()) {
        *v = c as u32;
    }
    pack_bits(&values, 10, out);
}

pub fn unpack_t1(bytes: &[u8]) -> Poly {
    let values = unpack_bits(bytes, 10);
    let mut coeffs = [0i32; N];
    for (c, &v) in coeffs.iter_mut().zip(values.iter()) {
        *c = v as i32;
    }
    Poly::from_coeffs(coeffs)
}

/// `t0` coefficients in `(-2^12, 2^12]`. Every 13-bit pattern decodes to
/// a value in range.
pub fn pack_t0(p: &Poly, out: &mut [u8]) {
    pack_offset(p, 1 << (D - 1), D, out);
}

pub fn unpack_t0(bytes: &[u8]) -> Poly {
    unpack_offset(bytes, 1 << (D - 1), D)
}

/// `s1`/`s2` coefficients in `[-eta, eta]`.
pub fn pack_eta(p: &Poly, eta: i32, out: &mut [u8]) {
    pack_offset(p, eta, eta_bits(eta), out);
}

/// Fails if a stored value lies outside `[0, 2·eta]`.
pub fn unpack_eta(bytes: &[u8], eta: i32) -> CryptoResult<Poly> {
    let p = unpack_offset(bytes, eta, eta_bits(eta));
    if p.coeffs().iter().any(|&c| c < -eta || c > eta) {
        return Err(CryptoError::decode_error(
            "secret key",
            "short coefficient out of range",
            error_codes::DILITHIUM_INVALID_SECRET_KEY,
        ));
    }
    Ok(p)
}

/// `z` coefficients in `(-gamma1, gamma1]`.
pub fn pack_z(p: &Poly, gamma1: i32, out: &mut [u8]) {
    pack_offset(p, gamma1, z_bits(gamma1), out);
}

/// Every bit pattern decodes into `(-gamma1, gamma1]`; the norm bound is
/// checked by the verifier.
pub fn unpack_z(bytes: &[u8], gamma1: i32) -> Poly {
    unpack_offset(bytes, gamma1, z_bits(gamma1))
}

/// High bits of the commitment, `[0, w1_max]`.
pub fn pack_w1(p: &Poly, bits: u32, out: &mut [u8]) {
    let mut values = [0u32; N];
    for (v, &c) in values.iter_mut().zip(p.coeffs().iter()) {
        *v = c as u32;
    }
    pack_bits(&values, bits, out);
}

/// Concatenated packing of a whole `w1` vector.
pub fn pack_w1_vec(w1: &PolyVec, params: &DilithiumParameters) -> Vec<u8> {
    let size = params.poly_w1_packed_bytes();
    let mut out = vec![0u8; params.w1_packed_bytes()];
    for (chunk, p) in out.chunks_exact_mut(size).zip(w1.iter()) {
        pack_w1(p, params.w1_bits(), chunk);
    }
    out
}

fn pack_hint(h: &PolyVec, omega: usize, out: &mut [u8]) {
    out.iter_mut().for_each(|b| *b = 0);
    let mut idx = 0;
    for (i, p) in h.iter().enumerate() {
        for (j, &c) in p.coeffs().iter().enumerate() {
            if c != 0 && idx < omega {
                out[idx] = j as u8;
                idx += 1;
            }
        }
        out[omega + i] = idx as u8;
    }
}

fn unpack_hint(bytes: &[u8], k: usize, omega: usize) -> CryptoResult<PolyVec> {
    let malformed = |cause: &str| {
        CryptoError::decode_error("signature", cause, error_codes::DILITHIUM_INVALID_SIGNATURE)
    };

    let mut polys = Vec::with_capacity(k);
    let mut start = 0usize;
    for i in 0..k {
        let end = bytes[omega + i] as usize;
        if end < start || end > omega {
            return Err(malformed("hint counts out of order"));
        }
        let mut coeffs = [0i32; N];
        for j in start..end {
            if j > start && bytes[j] <= bytes[j - 1] {
                return Err(malformed("hint positions not strictly increasing"));
            }
            coeffs[bytes[j] as usize] = 1;
        }
        polys.push(Poly::from_coeffs(coeffs));
        start = end;
    }

    if bytes[start..omega].iter().any(|&b| b != 0) {
        return Err(malformed("nonzero hint padding"));
    }

    Ok(PolyVec::from_polys(polys))
}

/// Exclusive upper bound of a `t1` coefficient
const T1_BOUND: i32 = 1 << 10;

/// Decoded public key `(rho, t1)`
///
/// Deserialization applies the same checks as [`PublicKey::from_bytes`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyFields")]
pub struct PublicKey {
    pub variant: DilithiumVariant,
    pub rho: [u8; SEED_BYTES],
    pub t1: PolyVec,
}

#[derive(Deserialize)]
struct PublicKeyFields {
    variant: DilithiumVariant,
    rho: [u8; SEED_BYTES],
    t1: PolyVec,
}

impl TryFrom<PublicKeyFields> for PublicKey {
    type Error = CryptoError;

    fn try_from(fields: PublicKeyFields) -> CryptoResult<Self> {
        let pk = Self {
            variant: fields.variant,
            rho: fields.rho,
            t1: fields.t1,
        };
        pk.validate()?;
        Ok(pk)
    }
}

impl PublicKey {
    /// Check that `t1` has `k` polynomials with coefficients in `[0, 2^10)`,
    /// i.e. that the key has a packed encoding.
    pub fn validate(&self) -> CryptoResult<()> {
        let params = self.variant.params();
        let malformed = |cause: &str| {
            CryptoError::decode_error("public key", cause, error_codes::DILITHIUM_INVALID_PUBLIC_KEY)
        };

        if self.t1.len() != params.k {
            return Err(malformed("wrong number of t1 polynomials"));
        }
        if self
            .t1
            .iter()
            .flat_map(|p| p.coeffs().iter())
            .any(|&c| !(0..T1_BOUND).contains(&c))
        {
            return Err(malformed("t1 coefficient out of range"));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let params = self.variant.params();
        let mut out = vec![0u8; params.public_key_bytes()];
        out[..SEED_BYTES].copy_from_slice(&self.rho);
        for (chunk, p) in out[SEED_BYTES..]
            .chunks_exact_mut(POLY_T1_PACKED_BYTES)
            .zip(self.t1.iter())
        {
            pack_t1(p, chunk);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8], variant: DilithiumVariant) -> CryptoResult<Self> {
        let params = variant.params();
        if bytes.len() != params.public_key_bytes() {
            return Err(CryptoError::length_mismatch(
                "public key",
                params.public_key_bytes(),
                bytes.len(),
                error_codes::DILITHIUM_INVALID_PUBLIC_KEY,
            ));
        }

        let mut rho = [0u8; SEED_BYTES];
        rho.copy_from_slice(&bytes[..SEED_BYTES]);
        let t1 = bytes[SEED_BYTES..]
            .chunks_exact(POLY_T1_PACKED_BYTES)
            .map(unpack_t1)
            .collect();

        Ok(Self {
            variant,
            rho,
            t1: PolyVec::from_polys(t1),
        })
    }
}

/// Decoded secret key. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    #[zeroize(skip)]
    pub variant: DilithiumVariant,
    pub rho: [u8; SEED_BYTES],
    pub key: [u8; SEED_BYTES],
    pub tr: [u8; SEED_BYTES],
    pub s1: PolyVec<Normal>,
    pub s2: PolyVec<Normal>,
    pub t0: PolyVec<Normal>,
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

impl SecretKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        let params = self.variant.params();
        let eta_size = params.poly_eta_packed_bytes();
        let mut out = vec![0u8; params.secret_key_bytes()];

        out[..SEED_BYTES].copy_from_slice(&self.rho);
        out[SEED_BYTES..2 * SEED_BYTES].copy_from_slice(&self.key);
        out[2 * SEED_BYTES..3 * SEED_BYTES].copy_from_slice(&self.tr);

        let mut offset = 3 * SEED_BYTES;
        for p in self.s1.iter().chain(self.s2.iter()) {
            pack_eta(p, params.eta, &mut out[offset..offset + eta_size]);
            offset += eta_size;
        }
        for p in self.t0.iter() {
            pack_t0(p, &mut out[offset..offset + POLY_T0_PACKED_BYTES]);
            offset += POLY_T0_PACKED_BYTES;
        }
        out
    }

    pub fn from_bytes(bytes: &[u8], variant: DilithiumVariant) -> CryptoResult<Self> {
        let params = variant.params();
        if bytes.len() != params.secret_key_bytes() {
            return Err(CryptoError::length_mismatch(
                "secret key",
                params.secret_key_bytes(),
                bytes.len(),
                error_codes::DILITHIUM_INVALID_SECRET_KEY,
            ));
        }

        let mut sk = Self {
            variant,
            rho: [0u8; SEED_BYTES],
            key: [0u8; SEED_BYTES],
            tr: [0u8; SEED_BYTES],
            s1: PolyVec::zero(0),
            s2: PolyVec::zero(0),
            t0: PolyVec::zero(0),
        };
        sk.rho.copy_from_slice(&bytes[..SEED_BYTES]);
        sk.key.copy_from_slice(&bytes[SEED_BYTES..2 * SEED_BYTES]);
        sk.tr.copy_from_slice(&bytes[2 * SEED_BYTES..3 * SEED_BYTES]);

        let eta_size = params.poly_eta_packed_bytes();
        let s1_end = 3 * SEED_BYTES + params.l * eta_size;
        let s2_end = s1_end + params.k * eta_size;

        sk.s1 = bytes[3 * SEED_BYTES..s1_end]
            .chunks_exact(eta_size)
            .map(|chunk| unpack_eta(chunk, params.eta))
            .collect::<CryptoResult<Vec<_>>>()
            .map(PolyVec::from_polys)?;
        sk.s2 = bytes[s1_end..s2_end]
            .chunks_exact(eta_size)
            .map(|chunk| unpack_eta(chunk, params.eta))
            .collect::<CryptoResult<Vec<_>>>()
            .map(PolyVec::from_polys)?;
        sk.t0 = PolyVec::from_polys(
            bytes[s2_end..]
                .chunks_exact(POLY_T0_PACKED_BYTES)
                .map(unpack_t0)
                .collect(),
        );

        Ok(sk)
    }
}

/// Decoded signature `(c~, z, h)`
///
/// Deserialization applies the same checks as [`Signature::from_bytes`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SignatureFields")]
pub struct Signature {
    pub variant: DilithiumVariant,
    pub c: [u8; SEED_BYTES],
    pub z: PolyVec,
    pub h: PolyVec,
}

#[derive(Deserialize)]
struct SignatureFields {
    variant: DilithiumVariant,
    c: [u8; SEED_BYTES],
    z: PolyVec,
    h: PolyVec,
}

impl TryFrom<SignatureFields> for Signature {
    type Error = CryptoError;

    fn try_from(fields: SignatureFields) -> CryptoResult<Self> {
        let sig = Self {
            variant: fields.variant,
            c: fields.c,
            z: fields.z,
            h: fields.h,
        };
        sig.validate()?;
        Ok(sig)
    }
}

impl Signature {
    /// Check that the signature has a packed encoding: `l` polynomials of
    /// `z` in `(-gamma1, gamma1]`, `k` hint polynomials of bits, and at
    /// most `omega` bits set.
    pub fn validate(&self) -> CryptoResult<()> {
        let params = self.variant.params();
        let malformed = |cause: &str| {
            CryptoError::decode_error("signature", cause, error_codes::DILITHIUM_INVALID_SIGNATURE)
        };

        if self.z.len() != params.l || self.h.len() != params.k {
            return Err(malformed("wrong vector dimensions"));
        }
        let gamma1 = params.gamma1;
        if self
            .z
            .iter()
            .flat_map(|p| p.coeffs().iter())
            .any(|&c| c <= -gamma1 || c > gamma1)
        {
            return Err(malformed("z coefficient out of range"));
        }

        let mut weight = 0usize;
        for &c in self.h.iter().flat_map(|p| p.coeffs().iter()) {
            if c != 0 && c != 1 {
                return Err(malformed("hint coefficient is not a bit"));
            }
            weight += c as usize;
        }
        if weight > params.omega {
            return Err(malformed("too many hint bits"));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let params = self.variant.params();
        let z_size = params.poly_z_packed_bytes();
        let mut out = vec![0u8; params.signature_bytes()];

        out[..SEED_BYTES].copy_from_slice(&self.c);
        let z_end = SEED_BYTES + params.l * z_size;
        for (chunk, p) in out[SEED_BYTES..z_end]
            .chunks_exact_mut(z_size)
            .zip(self.z.iter())
        {
            pack_z(p, params.gamma1, chunk);
        }
        pack_hint(&self.h, params.omega, &mut out[z_end..]);
        out
    }

    /// Decode and validate the hint encoding. The `z` norm bound is left to
    /// verification.
    pub fn from_bytes(bytes: &[u8], variant: DilithiumVariant) -> CryptoResult<Self> {
        let params = variant.params();
        if bytes.len() != params.signature_bytes() {
            return Err(CryptoError::length_mismatch(
                "signature",
                params.signature_bytes(),
                bytes.len(),
                error_codes::DILITHIUM_INVALID_SIGNATURE,
            ));
        }

        let mut c = [0u8; SEED_BYTES];
        c.copy_from_slice(&bytes[..SEED_BYTES]);

        let z_size = params.poly_z_packed_bytes();
        let z_end = SEED_BYTES + params.l * z_size;
        let z = bytes[SEED_BYTES..z_end]
            .chunks_exact(z_size)
            .map(|chunk| unpack_z(chunk, params.gamma1))
            .collect();
        let h = unpack_hint(&bytes[z_end..], params.k, params.omega)?;

        Ok(Self {
            variant,
            c,
            z: PolyVec::from_polys(z),
            h,
        })
    }
}

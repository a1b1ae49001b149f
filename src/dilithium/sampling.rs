//! Deterministic samplers driven by SHAKE128 / SHAKE256
//!
//! Every sampler is a pure function of its inputs. Verification depends on
//! this: the verifier re-expands `A` and the challenge from the same seeds
//! the signer used.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Shake128, Shake256};

use super::packing;
use super::params::{self, CRH_BYTES, N, Q, SEED_BYTES};
use super::poly::{Normal, Ntt, Poly};

pub const SHAKE128_RATE: usize = 168;
pub const SHAKE256_RATE: usize = 136;

fn shake128_stream(seed: &[u8], nonce: u16) -> impl XofReader {
    let mut hasher = Shake128::default();
    hasher.update(seed);
    hasher.update(&nonce.to_le_bytes());
    hasher.finalize_xof()
}

fn shake256_stream(seed: &[u8], nonce: u16) -> impl XofReader {
    let mut hasher = Shake256::default();
    hasher.update(seed);
    hasher.update(&nonce.to_le_bytes());
    hasher.finalize_xof()
}

/// SHAKE256 over the concatenation of `inputs`, filling `out`.
pub fn shake256(inputs: &[&[u8]], out: &mut [u8]) {
    let mut hasher = Shake256::default();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize_xof().read(out);
}

/// Polynomial with coefficients uniform in `[0, q)`, read from
/// `SHAKE128(seed ‖ nonce)` by rejecting 23-bit draws that are `>= q`.
///
/// The output is interpreted directly as an NTT-domain element. The
/// rejection rate per draw is below 0.1%, so a handful of blocks suffice.
pub fn sample_uniform(seed: &[u8; SEED_BYTES], nonce: u16) -> Poly<Ntt> {
    let mut reader = shake128_stream(seed, nonce);
    let mut coeffs = [0i32; N];
    let mut ctr = 0;
    let mut block = [0u8; SHAKE128_RATE];

    while ctr < N {
        reader.read(&mut block);
        for chunk in block.chunks_exact(3) {
            if ctr == N {
                break;
            }
            let t = (chunk[0] as i32 | (chunk[1] as i32) << 8 | (chunk[2] as i32) << 16) & 0x7F_FFFF;
            if t < Q {
                coeffs[ctr] = t;
                ctr += 1;
            }
        }
    }

    Poly::from_coeffs(coeffs)
}

/// Polynomial with coefficients uniform in `[-eta, eta]`, read from
/// `SHAKE256(seed ‖ nonce)` one nibble at a time with rejection.
///
/// `eta` must be 2 or 4.
pub fn sample_short(seed: &[u8; CRH_BYTES], nonce: u16, eta: i32) -> Poly<Normal> {
    let mut reader = shake256_stream(seed, nonce);
    let mut coeffs = [0i32; N];
    let mut ctr = 0;
    let mut block = [0u8; SHAKE256_RATE];

    while ctr < N {
        reader.read(&mut block);
        for &byte in block.iter() {
            for nibble in [(byte & 0x0F) as i32, (byte >> 4) as i32] {
                if ctr == N {
                    break;
                }
                if eta == 2 {
                    if nibble < 15 {
                        // nibble mod 5 without a division
                        let reduced = nibble - ((205 * nibble) >> 10) * 5;
                        coeffs[ctr] = 2 - reduced;
                        ctr += 1;
                    }
                } else if nibble < 9 {
                    coeffs[ctr] = 4 - nibble;
                    ctr += 1;
                }
            }
        }
    }

    Poly::from_coeffs(coeffs)
}

/// Masking polynomial with coefficients in `(-gamma1, gamma1]`, unpacked
/// from the first bytes of `SHAKE256(seed ‖ nonce)`.
pub fn sample_mask(seed: &[u8; CRH_BYTES], nonce: u16, gamma1: i32) -> Poly<Normal> {
    let mut buf = vec![0u8; N * params::z_bits(gamma1) as usize / 8];
    shake256_stream(seed, nonce).read(&mut buf);
    packing::unpack_z(&buf, gamma1)
}

/// Challenge polynomial with exactly `tau` coefficients equal to `±1`.
///
/// The first 8 bytes of `SHAKE256(seed)` supply the signs; the following
/// bytes drive an inside-out Fisher-Yates shuffle over positions
/// `256 - tau .. 256`, so no position is chosen twice.
pub fn sample_challenge(seed: &[u8; SEED_BYTES], tau: usize) -> Poly<Normal> {
    let mut hasher = Shake256::default();
    hasher.update(seed);
    let mut reader = hasher.finalize_xof();

    let mut sign_bytes = [0u8; 8];
    reader.read(&mut sign_bytes);
    let mut signs = u64::from_le_bytes(sign_bytes);

    let mut coeffs = [0i32; N];
    let mut byte = [0u8; 1];
    for i in N - tau..N {
        let b = loop {
            reader.read(&mut byte);
            if (byte[0] as usize) <= i {
                break byte[0] as usize;
            }
        };
        coeffs[i] = coeffs[b];
        coeffs[b] = 1 - 2 * (signs & 1) as i32;
        signs >>= 1;
    }

    Poly::from_coeffs(coeffs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dilithium::params::DilithiumVariant;

    #[test]
    fn test_uniform_is_deterministic_and_in_range() {
        let seed = [42u8; SEED_BYTES];
        let a = sample_uniform(&seed, 7);
        let b = sample_uniform(&seed, 7);
        assert_eq!(a, b);
        assert!(a.coeffs().iter().all(|&c| (0..Q).contains(&c)));
        assert_ne!(a, sample_uniform(&seed, 8));
    }

    #[test]
    fn test_short_coefficients_bounded() {
        let seed = [3u8; CRH_BYTES];
        for eta in [2, 4] {
            let p = sample_short(&seed, 0, eta);
            assert!(p.coeffs().iter().all(|&c| (-eta..=eta).contains(&c)));
            assert_eq!(p, sample_short(&seed, 0, eta));
            // Every value of the range shows up in 256 draws
            for v in -eta..=eta {
                assert!(p.coeffs().contains(&v), "eta={} missing {}", eta, v);
            }
        }
    }

    #[test]
    fn test_mask_coefficients_bounded() {
        let seed = [5u8; CRH_BYTES];
        for gamma1 in [1 << 17, 1 << 19] {
            let p = sample_mask(&seed, 3, gamma1);
            assert!(p.coeffs().iter().all(|&c| c > -gamma1 && c <= gamma1));
            assert_eq!(p, sample_mask(&seed, 3, gamma1));
        }
    }

    #[test]
    fn test_challenge_weight() {
        for variant in DilithiumVariant::ALL {
            let tau = variant.params().tau;
            for s in 0..16u8 {
                let c = sample_challenge(&[s; SEED_BYTES], tau);
                let nonzero: Vec<i32> = c.coeffs().iter().copied().filter(|&x| x != 0).collect();
                assert_eq!(nonzero.len(), tau);
                assert!(nonzero.iter().all(|&x| x == 1 || x == -1));
            }
        }
    }

    #[test]
    fn test_challenge_deterministic() {
        let seed = [0xA5u8; SEED_BYTES];
        assert_eq!(sample_challenge(&seed, 49), sample_challenge(&seed, 49));
        assert_ne!(sample_challenge(&seed, 49), sample_challenge(&[0x5Au8; SEED_BYTES], 49));
    }
}

//! Vectors of ring elements and the public matrix `A`
//!
//! Dimensions come from the parameter set and are fixed when a vector is
//! created; nothing here grows afterwards.

use serde::{Deserialize, Serialize};
use subtle::Choice;
use zeroize::Zeroize;

use super::params::{DilithiumParameters, SEED_BYTES};
use super::poly::{Domain, Normal, Ntt, Poly};
use super::sampling;

/// Fixed-length vector of polynomials in one domain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PolyVec<D: Domain = Normal> {
    pub(crate) polys: Vec<Poly<D>>,
}

impl<D: Domain> Zeroize for PolyVec<D> {
    fn zeroize(&mut self) {
        for p in self.polys.iter_mut() {
            p.zeroize();
        }
    }
}

impl<D: Domain> PolyVec<D> {
    pub fn zero(len: usize) -> Self {
        Self {
            polys: vec![Poly::zero(); len],
        }
    }

    pub fn from_polys(polys: Vec<Poly<D>>) -> Self {
        Self { polys }
    }

    pub fn len(&self) -> usize {
        self.polys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polys.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Poly<D>> {
        self.polys.iter()
    }

    pub fn get(&self, i: usize) -> Option<&Poly<D>> {
        self.polys.get(i)
    }

    pub fn reduce(&mut self) {
        self.polys.iter_mut().for_each(Poly::reduce);
    }

    pub fn caddq(&mut self) {
        self.polys.iter_mut().for_each(Poly::caddq);
    }

    pub fn add_assign(&mut self, other: &Self) {
        for (a, b) in self.polys.iter_mut().zip(other.polys.iter()) {
            *a += *b;
        }
    }

    pub fn sub_assign(&mut self, other: &Self) {
        for (a, b) in self.polys.iter_mut().zip(other.polys.iter()) {
            *a -= *b;
        }
    }
}

impl PolyVec<Normal> {
    pub fn ntt(&self) -> PolyVec<Ntt> {
        PolyVec {
            polys: self.polys.iter().map(|p| p.ntt()).collect(),
        }
    }

    pub fn shiftl(&mut self) {
        self.polys.iter_mut().for_each(Poly::shiftl);
    }

    /// `(high, low)` split of every element around `2^d`.
    pub fn power2round(&self) -> (Self, Self) {
        let (high, low) = self.polys.iter().map(Poly::power2round).unzip();
        (Self { polys: high }, Self { polys: low })
    }

    /// `(high, low)` split of every element around `2·gamma2`.
    pub fn decompose(&self, gamma2: i32) -> (Self, Self) {
        let (high, low) = self
            .polys
            .iter()
            .map(|p| p.decompose(gamma2))
            .unzip();
        (Self { polys: high }, Self { polys: low })
    }

    /// Hint vector and the total number of bits set.
    pub fn make_hint(low: &Self, high: &Self, gamma2: i32) -> (Self, usize) {
        let mut total = 0;
        let polys = low
            .polys
            .iter()
            .zip(high.polys.iter())
            .map(|(l, h)| {
                let (hint, count) = Poly::make_hint(l, h, gamma2);
                total += count;
                hint
            })
            .collect();
        (Self { polys }, total)
    }

    pub fn use_hint(&self, hint: &Self, gamma2: i32) -> Self {
        Self {
            polys: self
                .polys
                .iter()
                .zip(hint.polys.iter())
                .map(|(p, h)| p.use_hint(h, gamma2))
                .collect(),
        }
    }

    /// Whether any element reaches `bound` in infinity norm, without early
    /// exit.
    pub fn norm_exceeds(&self, bound: i32) -> Choice {
        self.polys
            .iter()
            .fold(Choice::from(0u8), |acc, p| acc | p.norm_exceeds(bound))
    }

    pub fn infinity_norm(&self) -> i32 {
        self.polys.iter().map(Poly::infinity_norm).max().unwrap_or(0)
    }
}

impl PolyVec<Ntt> {
    pub fn inverse_tomont(&self) -> PolyVec<Normal> {
        PolyVec {
            polys: self.polys.iter().map(|p| p.inverse_tomont()).collect(),
        }
    }

    /// Multiply every element by one polynomial, scaled by `2^-32`.
    pub fn pointwise_poly_montgomery(&self, c: &Poly<Ntt>) -> Self {
        PolyVec {
            polys: self
                .polys
                .iter()
                .map(|p| c.pointwise_montgomery(p))
                .collect(),
        }
    }

    /// Inner product scaled by `2^-32`.
    pub fn dot_montgomery(&self, other: &Self) -> Poly<Ntt> {
        let mut acc = Poly::zero();
        for (a, b) in self.polys.iter().zip(other.polys.iter()) {
            acc += a.pointwise_montgomery(b);
        }
        acc
    }
}

/// The `k × l` public matrix `A`, sampled directly in the NTT domain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    pub(crate) rows: Vec<PolyVec<Ntt>>,
}

impl Matrix {
    /// Expand `A` from `rho`; entry `(i, j)` uses nonce `256·i + j`.
    pub fn expand(rho: &[u8; SEED_BYTES], params: &DilithiumParameters) -> Self {
        let rows = (0..params.k)
            .map(|i| {
                let polys = (0..params.l)
                    .map(|j| sampling::sample_uniform(rho, ((i << 8) + j) as u16))
                    .collect();
                PolyVec::from_polys(polys)
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[PolyVec<Ntt>] {
        &self.rows
    }

    /// `A·v` scaled by `2^-32`.
    pub fn mul_montgomery(&self, v: &PolyVec<Ntt>) -> PolyVec<Ntt> {
        PolyVec {
            polys: self.rows.iter().map(|row| row.dot_montgomery(v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dilithium::params::DilithiumVariant;

    #[test]
    fn test_matrix_dimensions() {
        let params = DilithiumVariant::Dilithium3.params();
        let a = Matrix::expand(&[9u8; SEED_BYTES], params);
        assert_eq!(a.rows().len(), params.k);
        assert!(a.rows().iter().all(|row| row.len() == params.l));
    }

    #[test]
    fn test_matrix_entries_differ() {
        let params = DilithiumVariant::Dilithium2.params();
        let a = Matrix::expand(&[1u8; SEED_BYTES], params);
        assert_ne!(a.rows[0].polys[0], a.rows[0].polys[1]);
        assert_ne!(a.rows[0].polys[0], a.rows[1].polys[0]);
    }

    #[test]
    fn test_norm_exceeds_over_vector() {
        let mut v = PolyVec::<Normal>::zero(3);
        assert!(!bool::from(v.norm_exceeds(1)));
        let mut coeffs = [0i32; crate::dilithium::params::N];
        coeffs[5] = 7;
        v.polys[2] = Poly::from_coeffs(coeffs);
        assert!(bool::from(v.norm_exceeds(7)));
        assert!(!bool::from(v.norm_exceeds(8)));
        assert_eq!(v.infinity_norm(), 7);
    }
}

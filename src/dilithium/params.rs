//! Dilithium parameter sets
//!
//! This module defines the round-3 parameter sets for the three Dilithium
//! variants and the byte lengths derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ring dimension
pub const N: usize = 256;
/// Prime modulus, `q = 2^23 - 2^13 + 1`
pub const Q: i32 = 8_380_417;
/// Dropped bits of `t`
pub const D: u32 = 13;
/// Primitive 512-th root of unity mod `q`
pub const ROOT_OF_UNITY: i32 = 1753;

/// Length of `rho`, `key`, `tr`, the challenge seed and the derivation seed
pub const SEED_BYTES: usize = 32;
/// Length of `mu` and `rho'`
pub const CRH_BYTES: usize = 64;

pub const POLY_T1_PACKED_BYTES: usize = 320;
pub const POLY_T0_PACKED_BYTES: usize = 416;

/// CRYSTALS-Dilithium algorithm variants with different security levels
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DilithiumVariant {
    /// Dilithium2 (NIST security level 2)
    Dilithium2,
    /// Dilithium3 (NIST security level 3, recommended)
    #[default]
    Dilithium3,
    /// Dilithium5 (NIST security level 5)
    Dilithium5,
}

impl fmt::Display for DilithiumVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DilithiumVariant::Dilithium2 => write!(f, "Dilithium2"),
            DilithiumVariant::Dilithium3 => write!(f, "Dilithium3"),
            DilithiumVariant::Dilithium5 => write!(f, "Dilithium5"),
        }
    }
}

impl DilithiumVariant {
    /// All supported variants, weakest first
    pub const ALL: [DilithiumVariant; 3] = [
        DilithiumVariant::Dilithium2,
        DilithiumVariant::Dilithium3,
        DilithiumVariant::Dilithium5,
    ];

    /// Get the parameter table for this variant
    pub fn params(&self) -> &'static DilithiumParameters {
        DilithiumParameters::for_variant(*self)
    }

    /// Get the security level of this variant
    pub fn security_level(&self) -> u8 {
        match self {
            DilithiumVariant::Dilithium2 => 2,
            DilithiumVariant::Dilithium3 => 3,
            DilithiumVariant::Dilithium5 => 5,
        }
    }

    /// Get the public key size for this variant in bytes
    pub fn public_key_size(&self) -> usize {
        self.params().public_key_bytes()
    }

    /// Get the secret key size for this variant in bytes
    pub fn secret_key_size(&self) -> usize {
        self.params().secret_key_bytes()
    }

    /// Get the signature size for this variant in bytes
    pub fn signature_size(&self) -> usize {
        self.params().signature_bytes()
    }

    /// Identify the variant from a public key length
    pub fn from_public_key_size(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.public_key_size() == len)
    }

    /// Identify the variant from a secret key length
    pub fn from_secret_key_size(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.secret_key_size() == len)
    }
}

/// Parameters for a Dilithium instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DilithiumParameters {
    pub variant: DilithiumVariant,
    /// Rows of `A` (length of `s2`, `t`, `w`, `h`)
    pub k: usize,
    /// Columns of `A` (length of `s1`, `y`, `z`)
    pub l: usize,
    /// Coefficient bound of `s1`, `s2`
    pub eta: i32,
    /// Number of `±1` coefficients in the challenge
    pub tau: usize,
    /// `tau * eta`
    pub beta: i32,
    /// Coefficient bound of the masking vector `y`
    pub gamma1: i32,
    /// Low-order rounding range
    pub gamma2: i32,
    /// Maximum number of hint bits
    pub omega: usize,
}

const DILITHIUM2: DilithiumParameters = DilithiumParameters {
    variant: DilithiumVariant::Dilithium2,
    k: 4,
    l: 4,
    eta: 2,
    tau: 39,
    beta: 78,
    gamma1: 1 << 17,
    gamma2: (Q - 1) / 88,
    omega: 80,
};

const DILITHIUM3: DilithiumParameters = DilithiumParameters {
    variant: DilithiumVariant::Dilithium3,
    k: 6,
    l: 5,
    eta: 4,
    tau: 49,
    beta: 196,
    gamma1: 1 << 19,
    gamma2: (Q - 1) / 32,
    omega: 55,
};

const DILITHIUM5: DilithiumParameters = DilithiumParameters {
    variant: DilithiumVariant::Dilithium5,
    k: 8,
    l: 7,
    eta: 2,
    tau: 60,
    beta: 120,
    gamma1: 1 << 19,
    gamma2: (Q - 1) / 32,
    omega: 75,
};

/// Packed width of a coefficient in `[-eta, eta]`
pub const fn eta_bits(eta: i32) -> u32 {
    if eta == 2 {
        3
    } else {
        4
    }
}

/// Packed width of a coefficient in `(-gamma1, gamma1]`
pub const fn z_bits(gamma1: i32) -> u32 {
    if gamma1 == (1 << 17) {
        18
    } else {
        20
    }
}

impl DilithiumParameters {
    /// Get parameters for a specific Dilithium variant
    pub fn for_variant(variant: DilithiumVariant) -> &'static Self {
        match variant {
            DilithiumVariant::Dilithium2 => &DILITHIUM2,
            DilithiumVariant::Dilithium3 => &DILITHIUM3,
            DilithiumVariant::Dilithium5 => &DILITHIUM5,
        }
    }

    /// Bits per packed `s1`/`s2` coefficient
    pub fn eta_bits(&self) -> u32 {
        eta_bits(self.eta)
    }

    /// Bits per packed `z` coefficient
    pub fn z_bits(&self) -> u32 {
        z_bits(self.gamma1)
    }

    /// Bits per packed `w1` coefficient
    pub fn w1_bits(&self) -> u32 {
        if self.gamma2 == (Q - 1) / 88 {
            6
        } else {
            4
        }
    }

    /// Largest high-bits value produced by decomposition
    pub fn w1_max(&self) -> i32 {
        (Q - 1) / (2 * self.gamma2) - 1
    }

    pub fn poly_eta_packed_bytes(&self) -> usize {
        N * self.eta_bits() as usize / 8
    }

    pub fn poly_z_packed_bytes(&self) -> usize {
        N * self.z_bits() as usize / 8
    }

    pub fn poly_w1_packed_bytes(&self) -> usize {
        N * self.w1_bits() as usize / 8
    }

    /// `rho ‖ t1`
    pub fn public_key_bytes(&self) -> usize {
        SEED_BYTES + self.k * POLY_T1_PACKED_BYTES
    }

    /// `rho ‖ key ‖ tr ‖ s1 ‖ s2 ‖ t0`
    pub fn secret_key_bytes(&self) -> usize {
        3 * SEED_BYTES
            + (self.l + self.k) * self.poly_eta_packed_bytes()
            + self.k * POLY_T0_PACKED_BYTES
    }

    /// `c~ ‖ z ‖ h`
    pub fn signature_bytes(&self) -> usize {
        SEED_BYTES + self.l * self.poly_z_packed_bytes() + self.omega + self.k
    }

    /// Byte length of the packed commitment `w1`
    pub fn w1_packed_bytes(&self) -> usize {
        self.k * self.poly_w1_packed_bytes()
    }
}

/// Public key length of the default variant
pub const PUBLIC_KEY_BYTES: usize = 1952;
/// Secret key length of the default variant
pub const SECRET_KEY_BYTES: usize = 4000;
/// Signature length of the default variant
pub const SIGNATURE_BYTES: usize = 3293;

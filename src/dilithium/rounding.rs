//! High/low bit decomposition of coefficients and the hint logic built on it.

use super::params::{D, Q};

/// Split a standard representative `a` into `(a1, a0)` with
/// `a = a1·2^D + a0` and `-2^{D-1} < a0 <= 2^{D-1}`.
#[inline]
pub fn power2round(a: i32) -> (i32, i32) {
    let a1 = (a + (1 << (D - 1)) - 1) >> D;
    let a0 = a - (a1 << D);
    (a1, a0)
}

/// Split a standard representative `a` into `(a1, a0)` with
/// `a ≡ a1·2·gamma2 + a0 (mod q)` and `-gamma2 < a0 <= gamma2`, except for
/// the wrap-around case `a1 = (q-1)/(2·gamma2)` which is folded to `a1 = 0`
/// with `a0 = a - q`.
///
/// Only the two round-3 values of `gamma2` are supported.
#[inline]
pub fn decompose(a: i32, gamma2: i32) -> (i32, i32) {
    let mut a1 = (a + 127) >> 7;
    if gamma2 == (Q - 1) / 32 {
        a1 = (a1 * 1025 + (1 << 21)) >> 22;
        a1 &= 15;
    } else {
        a1 = (a1 * 11275 + (1 << 23)) >> 24;
        a1 ^= ((43 - a1) >> 31) & a1;
    }
    let mut a0 = a - a1 * 2 * gamma2;
    a0 -= (((Q - 1) / 2 - a0) >> 31) & Q;
    (a1, a0)
}

#[inline]
fn nonzero(x: i32) -> i32 {
    ((x | x.wrapping_neg()) >> 31) & 1
}

/// 1 if the low part `a0` overflows into the high part `a1`, else 0.
#[inline]
pub fn make_hint(a0: i32, a1: i32, gamma2: i32) -> i32 {
    let above = ((gamma2 - a0) >> 31) & 1;
    let below = ((a0 + gamma2) >> 31) & 1;
    let on_edge = 1 - nonzero(a0 + gamma2);
    above | below | (on_edge & nonzero(a1))
}

/// Correct the high bits of `a` with a hint bit. Runs on public data only.
pub fn use_hint(a: i32, hint: i32, gamma2: i32) -> i32 {
    let (a1, a0) = decompose(a, gamma2);
    if hint == 0 {
        return a1;
    }

    if gamma2 == (Q - 1) / 32 {
        if a0 > 0 {
            (a1 + 1) & 15
        } else {
            (a1 - 1) & 15
        }
    } else if a0 > 0 {
        if a1 == 43 {
            0
        } else {
            a1 + 1
        }
    } else if a1 == 0 {
        43
    } else {
        a1 - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMMA2_88: i32 = (Q - 1) / 88;
    const GAMMA2_32: i32 = (Q - 1) / 32;

    #[test]
    fn test_power2round_recombines() {
        for a in [0, 1, 4096, 4097, 8191, 8192, Q - 1, 1234567] {
            let (a1, a0) = power2round(a);
            assert_eq!((a1 << D) + a0, a);
            assert!(a0 > -(1 << (D - 1)) && a0 <= (1 << (D - 1)));
        }
    }

    #[test]
    fn test_decompose_recombines() {
        for gamma2 in [GAMMA2_88, GAMMA2_32] {
            for a in (0..Q).step_by(7919).chain([Q - 1, Q - gamma2, gamma2, gamma2 + 1]) {
                let (a1, a0) = decompose(a, gamma2);
                assert_eq!((a1 * 2 * gamma2 + a0).rem_euclid(Q), a);
                assert!(a0 >= -gamma2 && a0 <= gamma2, "a={} a0={}", a, a0);
                assert!(a1 >= 0 && a1 <= (Q - 1) / (2 * gamma2) - 1);
            }
        }
    }

    #[test]
    fn test_make_hint_edges() {
        let g = GAMMA2_32;
        assert_eq!(make_hint(0, 5, g), 0);
        assert_eq!(make_hint(g, 5, g), 0);
        assert_eq!(make_hint(g + 1, 5, g), 1);
        assert_eq!(make_hint(-g - 1, 5, g), 1);
        assert_eq!(make_hint(-g, 0, g), 0);
        assert_eq!(make_hint(-g, 3, g), 1);
    }

    #[test]
    fn test_hint_recovers_high_bits() {
        // A hint computed from the low part of r + z lets the high bits of r
        // be recovered from r + z alone.
        for gamma2 in [GAMMA2_88, GAMMA2_32] {
            let cases = [
                (1_000_000, 500),
                (77, -300),
                (Q - 5, 9),
                (2 * gamma2, -gamma2 + 1),
                (3 * gamma2 - 10, 50),
                (Q - 3, -20),
            ];
            for (r, z) in cases {
                let (r1, r0) = decompose(r, gamma2);
                let hint = make_hint(r0 + z, r1, gamma2);
                let shifted = (r + z).rem_euclid(Q);
                assert_eq!(use_hint(shifted, hint, gamma2), r1, "r={} z={}", r, z);
            }
        }
        assert_eq!(make_hint(3 * GAMMA2_32 - 10 - 2 * GAMMA2_32 + 50, 1, GAMMA2_32), 1);
    }
}

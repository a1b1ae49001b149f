//! Modular arithmetic in `Z_q`
//!
//! Every function here is branch-free: coefficients may be secret.

use super::params::Q;

/// `q^-1 mod 2^32`
pub const QINV: i32 = 58_728_449;
/// `2^32 mod q`
pub const MONT: i32 = 4_193_792;
/// `2^64 mod q`, lifts a Montgomery-reduced product back to the plain domain
pub const MONT_SQ: i32 = 2_365_951;

/// For `-2^31 q <= a <= 2^31 q`, compute `r ≡ a · 2^-32 (mod q)` with
/// `-q < r < q`.
#[inline]
pub fn montgomery_reduce(a: i64) -> i32 {
    let t = (a as i32).wrapping_mul(QINV);
    ((a - t as i64 * Q as i64) >> 32) as i32
}

/// For `a <= 2^31 - 2^22 - 1`, compute `r ≡ a (mod q)` with
/// `-6283009 <= r <= 6283007`.
#[inline]
pub fn reduce32(a: i32) -> i32 {
    let t = (a + (1 << 22)) >> 23;
    a - t * Q
}

/// Add `q` if `a` is negative.
#[inline]
pub fn caddq(a: i32) -> i32 {
    a + ((a >> 31) & Q)
}

/// Standard representative in `[0, q)`.
#[inline]
pub fn freeze(a: i32) -> i32 {
    caddq(reduce32(a))
}

/// Map a standard representative in `[0, q)` to `(-(q-1)/2, (q-1)/2]`.
#[inline]
pub fn center(a: i32) -> i32 {
    a - ((((Q - 1) / 2) - a) >> 31 & Q)
}

/// `|a|` for `-2^31 < a`.
#[inline]
pub fn abs(a: i32) -> i32 {
    let sign = a >> 31;
    a - (sign & (2 * a))
}

/// All-ones if `a >= b`, zero otherwise. Operands must lie within
/// `(-2^30, 2^30)`.
#[inline]
pub fn ge_mask(a: i32, b: i32) -> i32 {
    !((a - b) >> 31)
}

/// Plain modular product of two standard representatives, used where
/// performance does not matter (tests, table checks).
pub fn mul_mod(a: i32, b: i32) -> i32 {
    ((a as i64 * b as i64).rem_euclid(Q as i64)) as i32
}

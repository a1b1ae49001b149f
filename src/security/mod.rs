/*!
 * Side-channel hardening support
 *
 * A constant-time comparison trait for engine values, and a
 * timing harness for measuring key generation, signing and verification.
 */

pub mod constant_time;

pub use constant_time::{
    verify_constant_time, ConstantTime, ConstantTimeConfig, ConstantTimeResult, StatisticalTest,
};

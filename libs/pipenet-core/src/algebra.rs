//! # Vector Algebra Helpers
//!
//! Small pure functions shared by the orientation and piece code. Everything
//! here is kernel-free and deterministic.

use glam::{DVec2, DVec3};

use crate::error::{Error, Result};

// =============================================================================
// ANGLES AND PROJECTIONS
// =============================================================================

/// Unsigned angle between two vectors, in radians.
///
/// The cosine is clamped before `acos`, so nearly-parallel inputs cannot
/// produce NaN from rounding.
pub fn vec_angle(a: DVec3, b: DVec3) -> f64 {
    let cos = a.dot(b) / (a.length() * b.length());
    cos.clamp(-1.0, 1.0).acos()
}

/// Unsigned angle between two plane vectors, in radians.
pub fn vec_angle_2d(a: DVec2, b: DVec2) -> f64 {
    let cos = a.dot(b) / (a.length() * b.length());
    cos.clamp(-1.0, 1.0).acos()
}

/// Scalar component of `v` along `onto` (not normalized by `|v|`).
pub fn proj(v: DVec3, onto: DVec3) -> f64 {
    v.dot(onto) / onto.length()
}

/// Normalizes a direction, rejecting zero-length input.
pub fn unit(v: DVec3) -> Result<DVec3> {
    let len = v.length();
    if len <= 0.0 || !len.is_finite() {
        return Err(Error::InvalidArgument(
            "direction must be a vector with length".to_string(),
        ));
    }
    Ok(v / len)
}

// =============================================================================
// TESTS
// =============================================================================

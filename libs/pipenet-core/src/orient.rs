//! # Piece Orientation
//!
//! Every piece is built in a canonical frame with its inlet cap at the
//! origin facing down (`-z`) and its flow leaving along [`UP`]. Orientation
//! happens in two stages:
//!
//! 1. **Inlet alignment**: rotate the solid so the flow axis [`UP`] lands on
//!    the requested inlet direction ([`inlet_rotation`]).
//! 2. **Outlet roll**: spin the solid about the inlet direction until the
//!    (already transformed) outlet direction lands on the requested one
//!    ([`outlet_roll`]).
//!
//! Both stages are pure rotation math; the kernel wrappers at the bottom
//! apply them to a volume and keep the model synchronized.

use glam::{DQuat, DVec2, DVec3};

use config::constants::{DEGENERATE_AXIS_TOLERANCE, DIRECTION_TOLERANCE};
use pipenet_kernel::{DimTag, Kernel};

use crate::algebra::{proj, unit, vec_angle, vec_angle_2d};
use crate::error::Result;

/// Canonical flow axis of a freshly built piece.
pub const UP: DVec3 = DVec3::Z;

// =============================================================================
// PURE ROTATIONS
// =============================================================================

/// Axis-angle rotation, right-handed about a unit axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    /// Unit rotation axis.
    pub axis: DVec3,
    /// Right-handed angle in radians.
    pub angle: f64,
}

impl Rotation {
    /// Applies the rotation to a vector.
    pub fn apply(&self, v: DVec3) -> DVec3 {
        DQuat::from_axis_angle(self.axis, self.angle) * v
    }
}

/// Rotation carrying [`UP`] onto `in_direction`, or `None` when the inlet
/// already faces that way.
///
/// When the target is antiparallel to [`UP`] the rotation axis is
/// ill-defined; `+x` is used, matching the flip produced by building the
/// piece upside down.
pub fn inlet_rotation(in_direction: DVec3) -> Result<Option<Rotation>> {
    let target = unit(in_direction)?;
    if (target - UP).length() < DIRECTION_TOLERANCE {
        return Ok(None);
    }
    let cross = UP.cross(target);
    let axis = if cross.length() < DEGENERATE_AXIS_TOLERANCE {
        DVec3::X
    } else {
        cross.normalize()
    };
    Ok(Some(Rotation {
        axis,
        angle: vec_angle(target, UP),
    }))
}

/// Roll about `in_direction` carrying `new_out` onto `out_direction`.
///
/// `new_out` is the outlet direction after inlet alignment. Both outlet
/// directions are projected onto a basis perpendicular to the inlet axis;
/// the returned angle is the signed right-handed angle between the
/// projections. Degenerate inputs (outlet parallel to inlet, or a vanishing
/// projection) yield a zero roll.
pub fn outlet_roll(out_direction: DVec3, in_direction: DVec3, new_out: DVec3) -> Result<Rotation> {
    let axis = unit(in_direction)?;
    let zero = Rotation { axis, angle: 0.0 };

    let basis_1 = out_direction.cross(in_direction);
    if basis_1.length() < DEGENERATE_AXIS_TOLERANCE {
        return Ok(zero);
    }
    let basis_2 = basis_1.cross(in_direction);

    let alpha = DVec2::new(proj(new_out, basis_1), proj(new_out, basis_2));
    let beta = DVec2::new(proj(out_direction, basis_1), proj(out_direction, basis_2));
    if alpha.length() < DEGENERATE_AXIS_TOLERANCE || beta.length() < DEGENERATE_AXIS_TOLERANCE {
        return Ok(zero);
    }

    let magnitude = vec_angle_2d(alpha, beta);
    let orientation = axis.dot(new_out.cross(out_direction));
    let angle = if orientation >= 0.0 { magnitude } else { -magnitude };
    Ok(Rotation { axis, angle })
}

// =============================================================================
// KERNEL WRAPPERS
// =============================================================================

/// Rotates a canonical volume so its inlet faces `in_direction`, returning
/// the outlet direction carried along by the same rotation.
pub fn rotate_inlet<K: Kernel>(
    kernel: &mut K,
    vol: DimTag,
    in_direction: DVec3,
    out_direction: DVec3,
) -> Result<DVec3> {
    match inlet_rotation(in_direction)? {
        Some(rotation) => {
            kernel.rotate(&[vol], DVec3::ZERO, rotation.axis, rotation.angle)?;
            kernel.synchronize()?;
            Ok(rotation.apply(out_direction))
        }
        None => Ok(out_direction),
    }
}

/// Rolls a volume about its inlet axis so the outlet faces `out_direction`.
///
/// `new_out` must be the value returned by [`rotate_inlet`].
pub fn rotate_outlet<K: Kernel>(
    kernel: &mut K,
    vol: DimTag,
    out_direction: DVec3,
    in_direction: DVec3,
    new_out: DVec3,
) -> Result<()> {
    let rotation = outlet_roll(out_direction, in_direction, new_out)?;
    if rotation.angle != 0.0 {
        kernel.rotate(&[vol], DVec3::ZERO, rotation.axis, rotation.angle)?;
        kernel.synchronize()?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

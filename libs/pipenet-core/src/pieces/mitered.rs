//! Sharp bend made of two obliquely cut cylinder halves.

use glam::DVec3;

use config::constants::MITER_HEIGHT_FACTOR;
use pipenet_kernel::Kernel;

use crate::algebra::vec_angle;
use crate::error::{Error, Result};
use crate::orient::{rotate_inlet, rotate_outlet, UP};

use super::{
    planar_face_along, planar_face_excluding, probe_faces, require_direction_change,
    require_positive_radius, rim_edge_towards, PipePiece,
};

/// Builds a mitered (sharp) bend turning the flow from `in_direction` to
/// `out_direction`.
///
/// One half is a cylinder truncated by the miter plane: a box is chamfered
/// so its cut passes through the cylinder axis at `1.1 * r * tan(a/2)`,
/// tilted by half the bend angle, and the two are intersected. Mirroring
/// the half and swinging it onto the miter plane closes the bend; fusion
/// welds the two elliptical cut faces away.
pub fn mitered<K: Kernel>(
    kernel: &mut K,
    radius: f64,
    in_direction: DVec3,
    out_direction: DVec3,
    mesh_size: f64,
) -> Result<PipePiece> {
    require_positive_radius(radius)?;
    require_direction_change(in_direction, out_direction)?;

    let angle = vec_angle(in_direction, out_direction);
    let tan_half = (angle / 2.0).tan();
    let height = MITER_HEIGHT_FACTOR * radius * tan_half;
    let slant = 2.0 * radius * tan_half;

    // Cut one cylinder half at the miter plane.
    let stub = kernel.add_cylinder(DVec3::ZERO, height * UP, radius)?;
    let mask = kernel.add_box(
        DVec3::new(-radius - 1.0, -radius, -1.0),
        DVec3::new(2.0 * radius + 1.0, 2.0 * radius, height + 1.0),
    )?;
    kernel.synchronize()?;
    let top = planar_face_along(&probe_faces(kernel, mask)?, UP)?.dimtag;
    let rim = rim_edge_towards(kernel, top, DVec3::X)?;
    kernel.chamfer(mask, rim, top, [2.0 * radius, slant])?;
    let half = kernel
        .intersect(&[mask], &[stub], true, true)?
        .first()
        .copied()
        .ok_or_else(|| Error::InternalInvariant("miter cut produced no volume".to_string()))?;
    kernel.synchronize()?;

    // Mirror the half and swing it about the miter ellipse onto the plane.
    let twin = kernel
        .copy(&[half])?
        .first()
        .copied()
        .ok_or_else(|| Error::InternalInvariant("copy produced no volume".to_string()))?;
    kernel.symmetrize(&[twin], [1.0, 0.0, 0.0, 0.0])?;
    kernel.synchronize()?;
    let pivot = planar_face_excluding(&probe_faces(kernel, twin)?, &[-UP])?.centroid;
    kernel.rotate(&[twin], pivot, DVec3::Y, -(std::f64::consts::PI - angle))?;
    kernel.synchronize()?;

    let vol = kernel
        .fuse(&[half], &[twin], true, true)?
        .first()
        .copied()
        .ok_or_else(|| Error::InternalInvariant("miter fusion produced no volume".to_string()))?;
    kernel.synchronize()?;

    let canonical_out = DVec3::new(angle.sin(), 0.0, angle.cos());
    let probes = probe_faces(kernel, vol)?;
    let in_tag = planar_face_along(&probes, -UP)?.dimtag;
    let out_tag = planar_face_along(&probes, canonical_out)?.dimtag;

    let new_out = rotate_inlet(kernel, vol, in_direction, canonical_out)?;
    rotate_outlet(kernel, vol, out_direction, in_direction, new_out)?;

    PipePiece::assemble(
        kernel,
        vol,
        in_tag,
        out_tag,
        in_direction,
        out_direction,
        radius,
        radius,
        mesh_size,
    )
}

//! Smooth bend swept along a circular arc.

use glam::DVec3;

use pipenet_kernel::Kernel;

use crate::algebra::vec_angle;
use crate::error::{Error, Result};
use crate::orient::{rotate_inlet, rotate_outlet, UP};

use super::{
    planar_face_along, probe_faces, require_direction_change, require_positive_radius, PipePiece,
};

/// Builds a smooth bend turning the flow from `in_direction` to
/// `out_direction` along an arc of radius `bend_radius`.
///
/// The canonical bend is swept in the xz-plane: a disk at the origin is
/// revolved about the `+y` axis through `(bend_radius, 0, 0)`, so the flow
/// enters along `+z` and leaves along `(sin a, 0, cos a)` for bend angle
/// `a`.
pub fn curve<K: Kernel>(
    kernel: &mut K,
    radius: f64,
    in_direction: DVec3,
    out_direction: DVec3,
    bend_radius: f64,
    mesh_size: f64,
) -> Result<PipePiece> {
    require_positive_radius(radius)?;
    require_direction_change(in_direction, out_direction)?;
    if bend_radius <= 0.0 {
        return Err(Error::InvalidArgument(
            "bend radius must be greater than 0".to_string(),
        ));
    }

    let disk = kernel.add_disk(DVec3::ZERO, radius, radius)?;
    let angle = vec_angle(in_direction, out_direction);
    let created = kernel.revolve(&[disk], DVec3::new(bend_radius, 0.0, 0.0), DVec3::Y, angle)?;
    let vol = created
        .into_iter()
        .find(|dimtag| dimtag.dim == 3)
        .ok_or_else(|| Error::InternalInvariant("revolve produced no volume".to_string()))?;
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

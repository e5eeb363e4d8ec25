//! Straight pipe with a conical radius transition.

use glam::DVec3;

use pipenet_kernel::Kernel;

use crate::error::{Error, Result};
use crate::orient::{rotate_inlet, UP};

use super::{planar_face_along, probe_faces, require_positive_radius, PipePiece};

/// Builds a straight pipe whose radius changes from `in_radius` to
/// `out_radius` over the first or last `change_length` of its run.
///
/// The piece starts as a cylinder at the larger radius; chamfering the rim
/// of the smaller end's cap carves the conical transition. A growing piece
/// tapers up from the inlet, a shrinking one tapers down to the outlet.
pub fn change_radius<K: Kernel>(
    kernel: &mut K,
    length: f64,
    change_length: f64,
    in_radius: f64,
    out_radius: f64,
    direction: DVec3,
    mesh_size: f64,
) -> Result<PipePiece> {
    if length <= 0.0 {
        return Err(Error::InvalidArgument(
            "length must be greater than 0".to_string(),
        ));
    }
    if change_length >= length {
        return Err(Error::InvalidArgument(
            "change_length must be less than length".to_string(),
        ));
    }
    if change_length <= 0.0 {
        return Err(Error::InvalidArgument(
            "change_length must be greater than 0".to_string(),
        ));
    }
    require_positive_radius(in_radius)?;
    require_positive_radius(out_radius)?;
    if in_radius == out_radius {
        return Err(Error::InvalidArgument(
            "radius is not different".to_string(),
        ));
    }
    crate::algebra::unit(direction)?;

    let widest = in_radius.max(out_radius);
    let vol = kernel.add_cylinder(DVec3::ZERO, length * UP, widest)?;
    kernel.synchronize()?;
    let probes = probe_faces(kernel, vol)?;
    let in_tag = planar_face_along(&probes, -UP)?.dimtag;
    let out_tag = planar_face_along(&probes, UP)?.dimtag;

    // Chamfer the cap at the narrower end down to its target radius.
    let (cap, taper) = if out_radius > in_radius {
        (in_tag, out_radius - in_radius)
    } else {
        (out_tag, in_radius - out_radius)
    };
    let rim = kernel
        .boundary(&[cap], false, false)?
        .first()
        .copied()
        .ok_or_else(|| Error::InternalInvariant("cap has no rim edge".to_string()))?;
    kernel.chamfer(vol, rim, cap, [taper, change_length])?;
    kernel.synchronize()?;

    rotate_inlet(kernel, vol, direction, direction)?;

    PipePiece::assemble(
        kernel, vol, in_tag, out_tag, direction, direction, in_radius, out_radius, mesh_size,
    )
}

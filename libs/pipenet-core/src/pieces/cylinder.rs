//! Straight pipe piece.

use glam::DVec3;

use pipenet_kernel::Kernel;

use crate::error::{Error, Result};
use crate::orient::{rotate_inlet, UP};

use super::{planar_face_along, probe_faces, require_positive_radius, PipePiece};

/// Builds a straight pipe of the given length and radius, oriented so its
/// flow runs along `direction`.
pub fn cylinder<K: Kernel>(
    kernel: &mut K,
    length: f64,
    radius: f64,
    direction: DVec3,
    mesh_size: f64,
) -> Result<PipePiece> {
    if length <= 0.0 {
        return Err(Error::InvalidArgument(
            "length must be greater than 0".to_string(),
        ));
    }
    require_positive_radius(radius)?;
    crate::algebra::unit(direction)?;

    let vol = kernel.add_cylinder(DVec3::ZERO, length * UP, radius)?;
    kernel.synchronize()?;
    let probes = probe_faces(kernel, vol)?;
    let in_tag = planar_face_along(&probes, -UP)?.dimtag;
    let out_tag = planar_face_along(&probes, UP)?.dimtag;

    rotate_inlet(kernel, vol, direction, direction)?;

    PipePiece::assemble(
        kernel, vol, in_tag, out_tag, direction, direction, radius, radius, mesh_size,
    )
}

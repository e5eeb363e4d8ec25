//! Three-way branch piece.

use glam::DVec3;

use config::constants::JUNCTION_CLEARANCE_FACTOR;
use pipenet_kernel::Kernel;

use crate::algebra::vec_angle;
use crate::error::{Error, Result};
use crate::orient::{rotate_inlet, rotate_outlet, UP};

use super::{
    planar_face_along, planar_face_excluding, probe_faces, require_direction_change,
    require_positive_radius, PipePiece,
};
use crate::surface::Surface;

/// Builds a T-junction on a main pipe flowing along `direction`, with a
/// branch of radius `t_radius` whose inlet faces `t_direction`.
///
/// Three over-long stubs are fused in the canonical frame: main run up and
/// down `z`, branch tilted by the junction's offset from a right angle.
/// When the branch leans upstream the joint is built leaning downstream and
/// flipped, so the inlet always ends up as the `-z` cap.
pub fn t_junction<K: Kernel>(
    kernel: &mut K,
    radius: f64,
    t_radius: f64,
    direction: DVec3,
    t_direction: DVec3,
    mesh_size: f64,
) -> Result<PipePiece> {
    require_positive_radius(radius)?;
    require_positive_radius(t_radius)?;
    if t_radius > radius {
        return Err(Error::InvalidArgument(
            "t_radius cannot be bigger than radius".to_string(),
        ));
    }
    require_direction_change(direction, t_direction)?;

    let t_angle = vec_angle(direction, t_direction);
    let inverted = t_angle > std::f64::consts::FRAC_PI_2;
    let beta = (t_angle - std::f64::consts::FRAC_PI_2).abs();

    // Stub lengths that guarantee all three end caps emerge from the joint.
    let reach = radius * beta.tan() + radius / beta.cos();
    let reach_short = radius * beta.cos().abs();
    let long = JUNCTION_CLEARANCE_FACTOR * reach;
    let short = JUNCTION_CLEARANCE_FACTOR * reach_short;

    let main = kernel.add_cylinder(DVec3::ZERO, long * UP, radius)?;
    let branch = kernel.add_cylinder(DVec3::ZERO, long * DVec3::X, t_radius)?;
    let tail = kernel.add_cylinder(DVec3::ZERO, -short * UP, radius)?;
    kernel.rotate(&[branch], DVec3::ZERO, DVec3::Y, -beta)?;
    let vol = kernel
        .fuse(&[main], &[branch, tail], true, true)?
        .first()
        .copied()
        .ok_or_else(|| Error::InternalInvariant("junction fusion produced no volume".to_string()))?;
    kernel.synchronize()?;

    let canonical_branch = if inverted {
        kernel.rotate(&[vol], DVec3::ZERO, DVec3::X, std::f64::consts::PI)?;
        kernel.synchronize()?;
        DVec3::new(beta.cos(), 0.0, -beta.sin())
    } else {
        DVec3::new(beta.cos(), 0.0, beta.sin())
    };

    let probes = probe_faces(kernel, vol)?;
    let in_tag = planar_face_along(&probes, -UP)?.dimtag;
    let out_tag = planar_face_along(&probes, UP)?.dimtag;
    let t_tag = planar_face_excluding(&probes, &[UP, -UP])?.dimtag;

    let new_branch = rotate_inlet(kernel, vol, direction, canonical_branch)?;
    rotate_outlet(kernel, vol, t_direction, direction, new_branch)?;

    let mut piece = PipePiece::assemble(
        kernel, vol, in_tag, out_tag, direction, direction, radius, radius, mesh_size,
    )?;
    let t_centre = kernel.center_of_mass(t_tag)?;
    piece.t_surface = Some(Surface::new(t_tag, t_centre, t_direction, t_radius));
    Ok(piece)
}

//! # Pipe Pieces
//!
//! Builders for the five piece kinds a network is grown from:
//!
//! - [`cylinder`]: straight pipe
//! - [`change_radius`]: straight pipe with a conical radius transition
//! - [`curve`]: smooth bend swept along a circular arc
//! - [`mitered`]: sharp bend made of two obliquely cut cylinders
//! - [`t_junction`]: three-way branch
//!
//! Every builder constructs its solid in the canonical frame (inlet cap at
//! the origin facing `-z`, flow leaving along `+z`), classifies the end
//! faces geometrically, then orients the solid with the two-stage rotation
//! from [`crate::orient`]. The caller translates the finished piece into
//! place.

use glam::DVec3;

use pipenet_kernel::{DimTag, Kernel};

use crate::error::{Error, Result};
use crate::orient::Rotation;
use crate::surface::Surface;

mod change_radius;
mod classify;
mod curve;
mod cylinder;
mod mitered;
mod t_junction;


pub use change_radius::change_radius;
pub use curve::curve;
pub use cylinder::cylinder;
pub use mitered::mitered;
pub use t_junction::t_junction;

pub(crate) use classify::{
    planar_face_along, planar_face_excluding, probe_faces, rim_edge_towards,
};

// =============================================================================
// PIECE RECORD
// =============================================================================

/// One placed piece of a network.
///
/// Holds the volume handle (until the final fusion consumes it), the cached
/// volume centroid, the per-piece mesh size, and the end surfaces.
#[derive(Debug, Clone)]
pub struct PipePiece {
    /// Volume handle; `None` once the network fusion has consumed it.
    pub vol: Option<DimTag>,
    /// Cached centroid of the volume.
    pub vol_centre: DVec3,
    /// Target element size inside this piece.
    pub mesh_size: f64,
    /// Upstream end.
    pub in_surface: Surface,
    /// Downstream end.
    pub out_surface: Surface,
    /// Branch end, present on T-junctions only.
    pub t_surface: Option<Surface>,
}

impl PipePiece {
    /// Builds the record for a freshly oriented piece, reading the volume
    /// and end-face centroids back from the kernel.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble<K: Kernel>(
        kernel: &mut K,
        vol: DimTag,
        in_tag: DimTag,
        out_tag: DimTag,
        in_direction: DVec3,
        out_direction: DVec3,
        in_radius: f64,
        out_radius: f64,
        mesh_size: f64,
    ) -> Result<Self> {
        if in_radius <= 0.0 || out_radius <= 0.0 {
            return Err(Error::InvalidArgument(
                "radius must be greater than 0".to_string(),
            ));
        }
        let vol_centre = kernel.center_of_mass(vol)?;
        let in_centre = kernel.center_of_mass(in_tag)?;
        let out_centre = kernel.center_of_mass(out_tag)?;
        Ok(Self {
            vol: Some(vol),
            vol_centre,
            mesh_size,
            in_surface: Surface::new(in_tag, in_centre, in_direction, in_radius),
            out_surface: Surface::new(out_tag, out_centre, out_direction, out_radius),
            t_surface: None,
        })
    }

    /// Re-reads the volume and surface centroids after a transform.
    pub(crate) fn refresh_centres<K: Kernel>(&mut self, kernel: &mut K) -> Result<()> {
        if let Some(vol) = self.vol {
            self.vol_centre = kernel.center_of_mass(vol)?;
        }
        self.in_surface.refresh_centre(kernel)?;
        self.out_surface.refresh_centre(kernel)?;
        if let Some(t_surface) = &mut self.t_surface {
            t_surface.refresh_centre(kernel)?;
        }
        Ok(())
    }

    /// Rotates all cached directions along with the solid.
    pub(crate) fn rotate_directions(&mut self, rotation: &Rotation) {
        self.in_surface.rotate_direction(rotation);
        self.out_surface.rotate_direction(rotation);
        if let Some(t_surface) = &mut self.t_surface {
            t_surface.rotate_direction(rotation);
        }
    }
}

// =============================================================================
// SHARED VALIDATION
// =============================================================================

/// Rejects a bend whose requested outlet direction equals its inlet
/// direction (after normalization): such a piece has no bend plane.
pub(crate) fn require_direction_change(in_direction: DVec3, out_direction: DVec3) -> Result<()> {
    let a = crate::algebra::unit(in_direction)?;
    let b = crate::algebra::unit(out_direction)?;
    if (a - b).length() < config::constants::DIRECTION_TOLERANCE {
        return Err(Error::InvalidArgument(
            "directions must be different".to_string(),
        ));
    }
    Ok(())
}

/// Rejects non-positive radii up front, before any kernel work.
pub(crate) fn require_positive_radius(radius: f64) -> Result<()> {
    if radius <= 0.0 {
        return Err(Error::InvalidArgument(
            "radius must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

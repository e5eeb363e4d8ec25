//! # Surface Bookkeeping
//!
//! A [`Surface`] records everything the network needs to know about one end
//! face of a piece: the kernel handle, the cached centroid, the outward
//! direction as given by the caller, and the pipe radius at that end.

use glam::DVec3;

use pipenet_kernel::{DimTag, Kernel};

use crate::error::Result;
use crate::orient::Rotation;

/// One circular end face of a piece.
///
/// The direction is stored exactly as the caller supplied it, unnormalized;
/// consumers normalize at the point of use. The centroid is a cache of the
/// kernel's answer and must be refreshed after every transform.
#[derive(Debug, Clone)]
pub struct Surface {
    /// Kernel handle of the face.
    pub dimtag: DimTag,
    /// Cached centroid in world coordinates.
    pub centre: DVec3,
    /// Outward direction, unnormalized caller input.
    pub direction: DVec3,
    /// Pipe radius at this end.
    pub radius: f64,
}

impl Surface {
    /// Creates a surface record.
    pub fn new(dimtag: DimTag, centre: DVec3, direction: DVec3, radius: f64) -> Self {
        Self {
            dimtag,
            centre,
            direction,
            radius,
        }
    }

    /// Rotates the cached direction along with the solid.
    pub(crate) fn rotate_direction(&mut self, rotation: &Rotation) {
        self.direction = rotation.apply(self.direction);
    }

    /// Re-reads the centroid from the kernel.
    pub(crate) fn refresh_centre<K: Kernel>(&mut self, kernel: &mut K) -> Result<()> {
        self.centre = kernel.center_of_mass(self.dimtag)?;
        Ok(())
    }
}

//! # Mesh Sizing Fields
//!
//! Per-piece element sizing. Each piece seeds a point at its volume centroid
//! carrying the piece's mesh size; a distance + threshold field pair grows
//! elements from that size at the piece out to the background size past the
//! piece's reach. The pointwise minimum of all thresholds becomes the
//! background field, so the finest piece wins wherever pieces meet.

use config::constants::SIZING_FALLOFF;
use pipenet_kernel::Kernel;

use crate::error::Result;
use crate::pieces::PipePiece;

/// Installs the per-piece sizing fields and the combined background field.
///
/// A piece's influence radius is the distance from its volume centroid to
/// its inlet centre, padded by the inlet radius so the whole cross-section
/// is covered.
pub(crate) fn apply_mesh_fields<K: Kernel>(
    kernel: &mut K,
    pieces: &[PipePiece],
    background: f64,
) -> Result<()> {
    let mut thresholds = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let half_length = (piece.in_surface.centre - piece.vol_centre).length();
        let influence = half_length.hypot(piece.in_surface.radius);

        let seed = kernel.add_seed_point(piece.vol_centre, piece.mesh_size)?;
        kernel.synchronize()?;
        let distance = kernel.add_distance_field(&[seed])?;
        let threshold = kernel.add_threshold_field(
            distance,
            piece.mesh_size,
            background,
            influence,
            SIZING_FALLOFF * influence,
        )?;
        thresholds.push(threshold);
    }

    let min = kernel.add_min_field(&thresholds)?;
    kernel.set_background_field(min)?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

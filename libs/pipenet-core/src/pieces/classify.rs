//! # Geometric Face Classification
//!
//! End faces are identified by what they look like, not by the order the
//! kernel happens to return them in: a probe pass collects every boundary
//! face's centroid and normal, and the piece builders then ask for "the
//! planar face pointing that way". A lookup that matches zero or several
//! faces is an internal invariant failure, never a silent guess.

use glam::DVec3;

use config::constants::CLASSIFY_TOLERANCE;
use pipenet_kernel::{DimTag, Kernel};

use crate::error::{Error, Result};

/// Snapshot of one boundary face.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FaceProbe {
    pub dimtag: DimTag,
    pub centroid: DVec3,
    /// Outward unit normal, `None` for curved faces.
    pub normal: Option<DVec3>,
}

/// Probes every boundary face of a volume.
pub(crate) fn probe_faces<K: Kernel>(kernel: &mut K, vol: DimTag) -> Result<Vec<FaceProbe>> {
    let faces = kernel.boundary(&[vol], false, false)?;
    let mut probes = Vec::with_capacity(faces.len());
    for face in faces {
        probes.push(FaceProbe {
            dimtag: face,
            centroid: kernel.center_of_mass(face)?,
            normal: kernel.planar_face_normal(face)?,
        });
    }
    Ok(probes)
}

fn along(normal: DVec3, direction: DVec3) -> bool {
    normal.dot(direction.normalize()) > 1.0 - CLASSIFY_TOLERANCE
}

/// The unique planar face whose outward normal points along `direction`.
pub(crate) fn planar_face_along(probes: &[FaceProbe], direction: DVec3) -> Result<FaceProbe> {
    let mut hit = None;
    for probe in probes {
        let Some(normal) = probe.normal else { continue };
        if !along(normal, direction) {
            continue;
        }
        if hit.is_some() {
            return Err(Error::InternalInvariant(format!(
                "multiple planar faces point along {direction}"
            )));
        }
        hit = Some(*probe);
    }
    hit.ok_or_else(|| {
        Error::InternalInvariant(format!("no planar face points along {direction}"))
    })
}

/// The unique planar face whose outward normal points along none of the
/// `excluded` directions.
pub(crate) fn planar_face_excluding(
    probes: &[FaceProbe],
    excluded: &[DVec3],
) -> Result<FaceProbe> {
    let mut hit = None;
    for probe in probes {
        let Some(normal) = probe.normal else { continue };
        if excluded.iter().any(|&dir| along(normal, dir)) {
            continue;
        }
        if hit.is_some() {
            return Err(Error::InternalInvariant(
                "multiple unclassified planar faces remain".to_string(),
            ));
        }
        hit = Some(*probe);
    }
    hit.ok_or_else(|| Error::InternalInvariant("no unclassified planar face remains".to_string()))
}

/// The rim edge of a face whose midpoint reaches furthest along `direction`.
pub(crate) fn rim_edge_towards<K: Kernel>(
    kernel: &mut K,
    face: DimTag,
    direction: DVec3,
) -> Result<DimTag> {
    let edges = kernel.boundary(&[face], false, false)?;
    let mut best: Option<(f64, DimTag)> = None;
    for edge in edges {
        let reach = kernel.center_of_mass(edge)?.dot(direction);
        if best.map_or(true, |(r, _)| reach > r) {
            best = Some((reach, edge));
        }
    }
    best.map(|(_, edge)| edge)
        .ok_or_else(|| Error::InternalInvariant("face has no rim edges".to_string()))
}

// =============================================================================
// TESTS
// =============================================================================

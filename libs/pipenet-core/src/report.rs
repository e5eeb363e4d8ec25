//! # Network Reports
//!
//! Serializable summary of a generated network: physical identifiers, end
//! surface poses, wall centroids, and junction locations. The report is the
//! data a downstream solver needs to attach boundary conditions to the mesh,
//! written either as a tab-separated text table or as XML.

use std::fmt::Write as _;
use std::path::Path;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use config::constants::MATCH_TOLERANCE;

use crate::error::Result;

// =============================================================================
// REPORT TYPES
// =============================================================================

/// One inlet or outlet, keyed by its physical surface identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceReport {
    /// Physical surface identifier in the mesh.
    pub physical_id: i32,
    /// Centroid of the surface.
    pub centre: DVec3,
    /// Outward direction, as supplied when the network was built.
    pub outward_direction: DVec3,
}

/// One no-slip wall surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallReport {
    /// Physical surface identifier in the mesh.
    pub physical_id: i32,
    /// Centroid of the surface.
    pub centre: DVec3,
}

/// Where one piece hands flow to the next (or out of the network).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionReport {
    /// Centroid of the joint surface.
    pub centre: DVec3,
    /// Flow direction through the joint.
    pub direction: DVec3,
}

/// Full summary of a generated network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkReport {
    /// Inlet first, then outlets in the order their pieces were added.
    pub in_out: Vec<SurfaceReport>,
    /// No-slip wall surfaces.
    pub walls: Vec<WallReport>,
    /// Piece-to-piece joint locations, in piece order.
    pub junctions: Vec<JunctionReport>,
    /// Physical volume identifier in the mesh.
    pub volume_id: i32,
}

// =============================================================================
// FORMATTING
// =============================================================================

/// Zeroes components that are only nonzero by floating-point noise.
pub(crate) fn round_small(v: DVec3) -> DVec3 {
    let clean = |x: f64| if x.abs() < MATCH_TOLERANCE { 0.0 } else { x };
    DVec3::new(clean(v.x), clean(v.y), clean(v.z))
}

fn fmt_vec(v: DVec3) -> String {
    format!("[{}, {}, {}]", v.x, v.y, v.z)
}

// =============================================================================
// WRITERS
// =============================================================================

/// Writes the report as a tab-separated text table.
pub fn write_info(report: &NetworkReport, path: &Path) -> Result<()> {
    let mut out = String::new();
    out.push_str("Physical Surface, Centre, Outward Direction");
    out.push_str("\nInOut Surfaces");
    for surf in &report.in_out {
        let _ = write!(
            out,
            "\n{}\t{}\t{}",
            surf.physical_id,
            fmt_vec(surf.centre),
            fmt_vec(surf.outward_direction)
        );
    }
    out.push_str("\nCylinder Surfaces");
    for wall in &report.walls {
        let _ = write!(out, "\n{}\t{}", wall.physical_id, fmt_vec(wall.centre));
    }
    out.push_str("\nIntersection locations and directions");
    for junction in &report.junctions {
        let _ = write!(
            out,
            "\n{}\t{}",
            fmt_vec(junction.centre),
            fmt_vec(junction.direction)
        );
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// Writes the report as an XML document.
pub fn write_xml(report: &NetworkReport, path: &Path) -> Result<()> {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<root>\n");
    out.push_str("  <inlet_surfaces>\n");
    for surf in &report.in_out {
        let _ = writeln!(
            out,
            "    <surface id=\"{}\" centre=\"{}\" outward_direction=\"{}\" />",
            surf.physical_id,
            fmt_vec(surf.centre),
            fmt_vec(surf.outward_direction)
        );
    }
    out.push_str("  </inlet_surfaces>\n");
    out.push_str("  <cylinder_surfaces>\n");
    for wall in &report.walls {
        let _ = writeln!(
            out,
            "    <surface id=\"{}\" centre=\"{}\" />",
            wall.physical_id,
            fmt_vec(wall.centre)
        );
    }
    out.push_str("  </cylinder_surfaces>\n");
    let _ = writeln!(out, "  <volume>{}</volume>", report.volume_id);
    out.push_str("</root>\n");
    std::fs::write(path, out)?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NetworkReport {
        NetworkReport {
            in_out: vec![
                SurfaceReport {
                    physical_id: 1,
                    centre: DVec3::ZERO,
                    outward_direction: DVec3::new(-1.0, 0.0, 0.0),
                },
                SurfaceReport {
                    physical_id: 2,
                    centre: DVec3::X,
                    outward_direction: DVec3::X,
                },
            ],
            walls: vec![WallReport {
                physical_id: 3,
                centre: DVec3::new(0.5, 0.0, 0.0),
            }],
            junctions: vec![JunctionReport {
                centre: DVec3::X,
                direction: DVec3::X,
            }],
            volume_id: 1,
        }
    }

    #[test]
    fn test_round_small_zeroes_noise() {
        let v = round_small(DVec3::new(1e-9, -1e-12, 0.5));
        assert_eq!(v, DVec3::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn test_write_info_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.txt");
        write_info(&sample(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Physical Surface, Centre, Outward Direction")
        );
        assert_eq!(lines.next(), Some("InOut Surfaces"));
        assert_eq!(lines.next(), Some("1\t[0, 0, 0]\t[-1, 0, 0]"));
        assert!(text.contains("Cylinder Surfaces"));
        assert!(text.contains("Intersection locations and directions"));
    }

    #[test]
    fn test_write_xml_is_well_formed_elements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.xml");
        write_xml(&sample(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains("<surface id=\"1\""));
        assert!(text.contains("<volume>1</volume>"));
        assert!(text.ends_with("</root>\n"));
    }
}

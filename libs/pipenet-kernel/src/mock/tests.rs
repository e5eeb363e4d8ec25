//! # Tests for the Mock Kernel
//!
//! Exercises the analytic geometry behind the mock: primitive face sets,
//! transform propagation, the chamfer/intersect path that builds mitered
//! halves, cap welding during fusion, and the bookkeeping surfaces.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use approx::assert_relative_eq;
use glam::DVec3;

use super::*;

fn ready() -> MockKernel {
    let mut kernel = MockKernel::new();
    kernel.initialize().expect("initialize");
    kernel
}

fn vec_eq(a: DVec3, b: DVec3) {
    assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
    assert_relative_eq!(a.y, b.y, epsilon = 1e-9);
    assert_relative_eq!(a.z, b.z, epsilon = 1e-9);
}

// =============================================================================
// LIFECYCLE AND SYNCHRONIZATION
// =============================================================================

#[test]
fn test_queries_require_synchronize() {
    let mut kernel = ready();
    let vol = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, 1.0), 0.5)
        .expect("cylinder");
    let err = kernel.center_of_mass(vol).unwrap_err();
    assert!(matches!(err, KernelError::StaleModel { .. }));
    kernel.synchronize().expect("synchronize");
    vec_eq(
        kernel.center_of_mass(vol).expect("com"),
        DVec3::new(0.0, 0.0, 0.5),
    );
}

#[test]
fn test_finalize_clears_state() {
    let mut kernel = ready();
    kernel
        .add_cylinder(DVec3::ZERO, DVec3::Z, 0.5)
        .expect("cylinder");
    kernel.finalize().expect("finalize");
    let err = kernel.synchronize().unwrap_err();
    assert!(matches!(err, KernelError::NotInitialized));
}

// =============================================================================
// PRIMITIVES
// =============================================================================

#[test]
fn test_cylinder_face_set() {
    let mut kernel = ready();
    let vol = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, 2.0), 0.5)
        .expect("cylinder");
    kernel.synchronize().expect("synchronize");
    let faces = kernel.boundary(&[vol], false, true).expect("boundary");
    assert_eq!(faces.len(), 3);

    let mut planar = 0;
    let mut curved = 0;
    for face in &faces {
        match kernel.planar_face_normal(*face).expect("normal") {
            Some(normal) => {
                planar += 1;
                assert_relative_eq!(normal.z.abs(), 1.0, epsilon = 1e-12);
            }
            None => curved += 1,
        }
    }
    assert_eq!(planar, 2);
    assert_eq!(curved, 1);
}

#[test]
fn test_negative_extent_cylinder_points_down() {
    let mut kernel = ready();
    let vol = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, -1.0), 0.5)
        .expect("cylinder");
    kernel.synchronize().expect("synchronize");
    vec_eq(
        kernel.center_of_mass(vol).expect("com"),
        DVec3::new(0.0, 0.0, -0.5),
    );
}

#[test]
fn test_box_faces_and_edges() {
    let mut kernel = ready();
    let vol = kernel
        .add_box(DVec3::new(-1.0, -1.0, 0.0), DVec3::new(2.0, 2.0, 3.0))
        .expect("box");
    kernel.synchronize().expect("synchronize");
    let faces = kernel.boundary(&[vol], false, false).expect("faces");
    assert_eq!(faces.len(), 6);

    // The +z face carries four rim edges, one of which sits at max x.
    let mut top = None;
    for face in &faces {
        if let Some(normal) = kernel.planar_face_normal(*face).expect("normal") {
            if normal.z > 0.9 {
                top = Some(*face);
            }
        }
    }
    let top = top.expect("top face");
    let edges = kernel.boundary(&[top], false, false).expect("edges");
    assert_eq!(edges.len(), 4);
    let max_x = edges
        .iter()
        .map(|e| kernel.center_of_mass(*e).expect("midpoint").x)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_relative_eq!(max_x, 1.0, epsilon = 1e-12);
}

// =============================================================================
// TRANSFORMS
// =============================================================================

#[test]
fn test_translate_moves_faces() {
    let mut kernel = ready();
    let vol = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, 1.0), 0.5)
        .expect("cylinder");
    kernel
        .translate(&[vol], DVec3::new(1.0, 2.0, 3.0))
        .expect("translate");
    kernel.synchronize().expect("synchronize");
    let faces = kernel.boundary(&[vol], false, false).expect("faces");
    let mut cap_centres: Vec<DVec3> = Vec::new();
    for face in faces {
        if kernel.planar_face_normal(face).expect("normal").is_some() {
            cap_centres.push(kernel.center_of_mass(face).expect("com"));
        }
    }
    cap_centres.sort_by(|a, b| a.z.total_cmp(&b.z));
    vec_eq(cap_centres[0], DVec3::new(1.0, 2.0, 3.0));
    vec_eq(cap_centres[1], DVec3::new(1.0, 2.0, 4.0));
}

#[test]
fn test_rotate_turns_cap_normals() {
    let mut kernel = ready();
    let vol = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, 1.0), 0.5)
        .expect("cylinder");
    // Quarter turn about +y maps +z to +x.
    kernel
        .rotate(&[vol], DVec3::ZERO, DVec3::Y, FRAC_PI_2)
        .expect("rotate");
    kernel.synchronize().expect("synchronize");
    let faces = kernel.boundary(&[vol], false, false).expect("faces");
    let mut normals: Vec<DVec3> = Vec::new();
    for face in faces {
        if let Some(normal) = kernel.planar_face_normal(face).expect("normal") {
            normals.push(normal);
        }
    }
    assert!(normals.iter().any(|n| n.x > 0.999));
    assert!(normals.iter().any(|n| n.x < -0.999));
}

#[test]
fn test_symmetrize_mirrors_across_plane() {
    let mut kernel = ready();
    let vol = kernel
        .add_cylinder(DVec3::new(1.0, 0.0, 0.0), DVec3::new(0.0, 0.0, 1.0), 0.25)
        .expect("cylinder");
    kernel
        .symmetrize(&[vol], [1.0, 0.0, 0.0, 0.0])
        .expect("symmetrize");
    kernel.synchronize().expect("synchronize");
    vec_eq(
        kernel.center_of_mass(vol).expect("com"),
        DVec3::new(-1.0, 0.0, 0.5),
    );
}

#[test]
fn test_copy_mints_fresh_tags() {
    let mut kernel = ready();
    let vol = kernel
        .add_cylinder(DVec3::ZERO, DVec3::Z, 0.5)
        .expect("cylinder");
    let copies = kernel.copy(&[vol]).expect("copy");
    assert_eq!(copies.len(), 1);
    assert_ne!(copies[0], vol);
    kernel.synchronize().expect("synchronize");
    vec_eq(
        kernel.center_of_mass(copies[0]).expect("com"),
        kernel.center_of_mass(vol).expect("com"),
    );
}

// =============================================================================
// CHAMFER AND INTERSECTION
// =============================================================================

/// Builds one mitered half for a right-angle bend of pipe radius 0.5 and
/// checks the cut cylinder against the closed-form expectation: the miter
/// ellipse sits on the axis at 1.1 * r * tan(theta/2) with normal tilted by
/// theta/2 in the xz-plane.
#[test]
fn test_chamfered_box_masks_cylinder() {
    let mut kernel = ready();
    let radius = 0.5;
    let theta = FRAC_PI_2;
    let tan_half = (theta / 2.0).tan();
    let height = 2.1 * radius * tan_half;
    let sdist = 2.0 * radius * tan_half;

    let cyl = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, height), radius)
        .expect("cylinder");
    let boxv = kernel
        .add_box(
            DVec3::new(-radius - 1.0, -radius, -1.0),
            DVec3::new(2.0 * radius + 1.0, 2.0 * radius, height + 1.0),
        )
        .expect("box");
    kernel.synchronize().expect("synchronize");

    let faces = kernel.boundary(&[boxv], false, false).expect("faces");
    let mut top = None;
    for face in &faces {
        if let Some(normal) = kernel.planar_face_normal(*face).expect("normal") {
            if normal.z > 0.9 {
                top = Some(*face);
            }
        }
    }
    let top = top.expect("top face");
    let edges = kernel.boundary(&[top], false, false).expect("edges");
    let edge = edges
        .iter()
        .max_by(|a, b| {
            let xa = kernel.center_of_mass(**a).expect("midpoint").x;
            let xb = kernel.center_of_mass(**b).expect("midpoint").x;
            xa.total_cmp(&xb)
        })
        .copied()
        .expect("rim edge");

    kernel
        .chamfer(boxv, edge, top, [2.0 * radius, sdist])
        .expect("chamfer");
    let cut = kernel.intersect(&[boxv], &[cyl], true, true).expect("intersect");
    assert_eq!(cut.len(), 1);
    kernel.synchronize().expect("synchronize");

    let faces = kernel.boundary(&[cut[0]], false, false).expect("faces");
    assert_eq!(faces.len(), 3);
    let half = theta / 2.0;
    let mut saw_ellipse = false;
    let mut saw_base = false;
    for face in faces {
        let centre = kernel.center_of_mass(face).expect("com");
        match kernel.planar_face_normal(face).expect("normal") {
            Some(normal) if normal.z < -0.9 => {
                saw_base = true;
                vec_eq(centre, DVec3::ZERO);
            }
            Some(normal) => {
                saw_ellipse = true;
                vec_eq(centre, DVec3::new(0.0, 0.0, 1.1 * radius * tan_half));
                vec_eq(normal, DVec3::new(half.sin(), 0.0, half.cos()));
            }
            None => {}
        }
    }
    assert!(saw_base && saw_ellipse);
}

#[test]
fn test_cap_chamfer_makes_conical_transition() {
    let mut kernel = ready();
    let vol = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, 2.0), 0.4)
        .expect("cylinder");
    kernel.synchronize().expect("synchronize");
    let faces = kernel.boundary(&[vol], false, false).expect("faces");
    let mut bottom = None;
    for face in &faces {
        if let Some(normal) = kernel.planar_face_normal(*face).expect("normal") {
            if normal.z < -0.9 {
                bottom = Some(*face);
            }
        }
    }
    let bottom = bottom.expect("bottom cap");
    let edges = kernel.boundary(&[bottom], false, false).expect("edges");
    kernel
        .chamfer(vol, edges[0], bottom, [0.2, 0.5])
        .expect("chamfer");
    kernel.synchronize().expect("synchronize");
    // The cap survives in place, and the solid gains the conical wall.
    vec_eq(kernel.center_of_mass(bottom).expect("com"), DVec3::ZERO);
    let faces = kernel.boundary(&[vol], false, false).expect("faces");
    assert_eq!(faces.len(), 4);
}

// =============================================================================
// FUSION
// =============================================================================

/// Three stubs arranged like a right-angle tee: fusing welds away the three
/// caps that meet at the origin and keeps the three free end caps.
#[test]
fn test_fuse_drops_buried_and_welded_caps() {
    let mut kernel = ready();
    let up = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, 1.1), 0.5)
        .expect("up");
    let side = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(1.1, 0.0, 0.0), 0.3)
        .expect("side");
    let down = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, -0.55), 0.5)
        .expect("down");
    let fused = kernel
        .fuse(&[up], &[side, down], true, true)
        .expect("fuse");
    assert_eq!(fused.len(), 1);
    kernel.synchronize().expect("synchronize");

    let faces = kernel.boundary(&[fused[0]], false, false).expect("faces");
    assert_eq!(faces.len(), 6);
    let mut planar_centres = Vec::new();
    for face in faces {
        if kernel.planar_face_normal(face).expect("normal").is_some() {
            planar_centres.push(kernel.center_of_mass(face).expect("com"));
        }
    }
    assert_eq!(planar_centres.len(), 3);
    assert!(planar_centres.iter().all(|c| c.length() > 0.5));
}

#[test]
fn test_fuse_welds_coincident_cap_pair() {
    let mut kernel = ready();
    let lower = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, 1.0), 0.5)
        .expect("lower");
    let upper = kernel
        .add_cylinder(DVec3::new(0.0, 0.0, 1.0), DVec3::new(0.0, 0.0, 1.0), 0.5)
        .expect("upper");
    let fused = kernel.fuse(&[lower], &[upper], true, true).expect("fuse");
    kernel.synchronize().expect("synchronize");
    let faces = kernel.boundary(&[fused[0]], false, false).expect("faces");
    // Two free caps and two lateral walls; the shared cap pair is gone.
    assert_eq!(faces.len(), 4);
}

// =============================================================================
// OVERLAP DETECTION
// =============================================================================

#[test]
fn test_intersect_reports_overlapping_solids() {
    let mut kernel = ready();
    let a = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, 1.0), 0.5)
        .expect("a");
    let b = kernel
        .add_cylinder(DVec3::new(0.0, 0.0, 0.5), DVec3::new(0.0, 0.0, 1.0), 0.5)
        .expect("b");
    let hits = kernel.intersect(&[a], &[b], false, false).expect("intersect");
    assert!(!hits.is_empty());
}

#[test]
fn test_intersect_ignores_touching_solids() {
    let mut kernel = ready();
    let a = kernel
        .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, 1.0), 0.5)
        .expect("a");
    let b = kernel
        .add_cylinder(DVec3::new(0.0, 0.0, 1.0), DVec3::new(0.0, 0.0, 1.0), 0.5)
        .expect("b");
    let hits = kernel.intersect(&[a], &[b], false, false).expect("intersect");
    assert!(hits.is_empty());
}

// =============================================================================
// REVOLUTION
// =============================================================================

/// Quarter bend of pipe radius 0.25 about the axis through (1, 0, 0): the
/// far cap must land at (1, 0, 1) facing +x.
#[test]
fn test_revolve_quarter_bend() {
    let mut kernel = ready();
    let disk = kernel.add_disk(DVec3::ZERO, 0.25, 0.25).expect("disk");
    let created = kernel
        .revolve(&[disk], DVec3::new(1.0, 0.0, 0.0), DVec3::Y, FRAC_PI_2)
        .expect("revolve");
    let vol = created
        .iter()
        .find(|dt| dt.dim == 3)
        .copied()
        .expect("volume");
    kernel.synchronize().expect("synchronize");

    let faces = kernel.boundary(&[vol], false, false).expect("faces");
    assert_eq!(faces.len(), 3);
    let mut saw_start = false;
    let mut saw_end = false;
    for face in faces {
        let centre = kernel.center_of_mass(face).expect("com");
        if let Some(normal) = kernel.planar_face_normal(face).expect("normal") {
            if normal.z < -0.9 {
                saw_start = true;
                vec_eq(centre, DVec3::ZERO);
            } else {
                saw_end = true;
                vec_eq(centre, DVec3::new(1.0, 0.0, 1.0));
                vec_eq(normal, DVec3::X);
            }
        }
    }
    assert!(saw_start && saw_end);
    let centroid = kernel.center_of_mass(vol).expect("com");
    // Bisector at 45 degrees, chord factor sin(pi/4)/(pi/4).
    let chord = FRAC_PI_4.sin() / FRAC_PI_4;
    vec_eq(
        centroid,
        DVec3::new(1.0 - chord * FRAC_PI_4.cos(), 0.0, chord * FRAC_PI_4.sin()),
    );
}

// =============================================================================
// PHYSICAL GROUPS, FIELDS AND MESH OUTPUT
// =============================================================================

#[test]
fn test_physical_groups_count_per_dimension() {
    let mut kernel = ready();
    let vol = kernel
        .add_cylinder(DVec3::ZERO, DVec3::Z, 0.5)
        .expect("cylinder");
    kernel.synchronize().expect("synchronize");
    let faces = kernel.boundary(&[vol], false, false).expect("faces");
    let first = kernel
        .add_physical_group(2, &[faces[0].tag])
        .expect("group");
    let second = kernel
        .add_physical_group(2, &[faces[1].tag])
        .expect("group");
    let volume_group = kernel.add_physical_group(3, &[vol.tag]).expect("group");
    assert_eq!(first, 1);
    assert_eq!(second, 2);
    assert_eq!(volume_group, 1);
    assert_eq!(
        kernel.physical_group_tags(2, 1),
        Some(&[faces[0].tag][..])
    );
}

#[test]
fn test_sizing_field_chain() {
    let mut kernel = ready();
    let seed = kernel
        .add_seed_point(DVec3::new(0.0, 0.0, 0.5), 0.1)
        .expect("seed");
    let distance = kernel.add_distance_field(&[seed]).expect("distance");
    let threshold = kernel
        .add_threshold_field(distance, 0.1, 0.3, 1.0, 1.1)
        .expect("threshold");
    let minimum = kernel.add_min_field(&[threshold]).expect("min");
    kernel.set_background_field(minimum).expect("background");
    assert_eq!(kernel.background_field(), Some(minimum));
    assert_eq!(kernel.seed_count(), 1);
}

#[test]
fn test_write_mesh_requires_generation() {
    let mut kernel = ready();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.msh");
    let err = kernel
        .write_mesh(&path, MeshFormat::Msh2, false)
        .unwrap_err();
    assert!(matches!(err, KernelError::MeshNotGenerated));
}

#[test]
fn test_write_mesh_emits_header_and_names() {
    let mut kernel = ready();
    let vol = kernel
        .add_cylinder(DVec3::ZERO, DVec3::Z, 0.5)
        .expect("cylinder");
    kernel.synchronize().expect("synchronize");
    kernel.add_physical_group(3, &[vol.tag]).expect("group");
    kernel.generate_mesh(3).expect("generate");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.msh");
    kernel
        .write_mesh(&path, MeshFormat::Msh4, false)
        .expect("write");
    let contents = std::fs::read_to_string(&path).expect("read");
    assert!(contents.starts_with("$MeshFormat\n4.1 0 8\n"));
    assert!(contents.contains("$PhysicalNames\n1\n"));
    assert!(contents.contains("3 1 \"physical_3_1\""));
}

//! # Tests for Config Constants
//!
//! Unit tests verifying the relationships between configuration constants.

use crate::constants::*;

// =============================================================================
// PRECISION TESTS
// =============================================================================

#[test]
fn test_match_tolerance_is_positive() {
    assert!(MATCH_TOLERANCE > 0.0, "MATCH_TOLERANCE must be positive");
}

#[test]
fn test_match_tolerance_is_small() {
    assert!(
        MATCH_TOLERANCE < 1e-6,
        "MATCH_TOLERANCE should be tighter than classification"
    );
}

#[test]
fn test_classify_tolerance_looser_than_match() {
    assert!(
        CLASSIFY_TOLERANCE >= MATCH_TOLERANCE,
        "CLASSIFY_TOLERANCE should be >= MATCH_TOLERANCE"
    );
}

#[test]
fn test_degenerate_axis_tolerance_tightest() {
    assert!(DEGENERATE_AXIS_TOLERANCE > 0.0);
    assert!(DEGENERATE_AXIS_TOLERANCE <= DIRECTION_TOLERANCE);
}

// =============================================================================
// MESHING TESTS
// =============================================================================

#[test]
fn test_background_coarser_than_default() {
    assert!(
        BACKGROUND_MESH_SIZE > DEFAULT_MESH_SIZE,
        "background size must be coarser than the default element size"
    );
}

#[test]
fn test_sizing_falloff_extends_outward() {
    // Falloff below 1 would put the coarse region inside the piece itself.
    assert!(SIZING_FALLOFF > 1.0);
}

// =============================================================================
// CONSTRUCTION TESTS
// =============================================================================

#[test]
fn test_min_bend_radius_exceeds_pipe_radius() {
    assert!(MIN_BEND_RADIUS_FACTOR > 1.0);
}

#[test]
fn test_miter_height_spans_cut() {
    // The cutting box reaches up to 2r tan(theta/2) along the axis, so the
    // canonical cylinder must be longer than twice the pipe radius.
    assert!(MITER_HEIGHT_FACTOR > 2.0);
}

#[test]
fn test_junction_clearance_exceeds_joint() {
    assert!(JUNCTION_CLEARANCE_FACTOR > 1.0);
}

//! # Configuration Constants
//!
//! Centralized constants for the pipenet pipeline. Geometric tolerances,
//! meshing defaults, and construction safety margins are defined here.
//!
//! ## Categories
//!
//! - **Precision**: Floating-point comparison tolerances
//! - **Meshing**: Default and background element sizes
//! - **Construction**: Safety factors used when building pieces

// =============================================================================
// PRECISION CONSTANTS
// =============================================================================

/// Absolute tolerance for matching a cached surface centroid against a
/// boundary-face centroid returned by the kernel.
///
/// Used after the final boolean fusion to re-identify inlet and outlet faces,
/// and when rounding near-zero vector components in reports.
///
/// # Example
///
/// ```rust
/// use config::constants::MATCH_TOLERANCE;
///
/// fn matches(distance: f64) -> bool {
///     distance < MATCH_TOLERANCE
/// }
///
/// assert!(matches(1e-9));
/// assert!(!matches(1e-3));
/// ```
pub const MATCH_TOLERANCE: f64 = 1e-8;

/// Tolerance for comparing direction vectors.
///
/// Two directions are considered identical when the norm of their difference
/// (after normalization) is below this value. Also bounds the acceptable
/// deviation of a unit vector's norm from 1.
pub const DIRECTION_TOLERANCE: f64 = 1e-8;

/// Tolerance for classifying boundary faces in the canonical frame.
///
/// Looser than [`MATCH_TOLERANCE`] because classification compares values that
/// went through a chain of kernel transforms, not values cached from the same
/// kernel query.
pub const CLASSIFY_TOLERANCE: f64 = 1e-6;

/// Threshold below which a rotation axis or projection basis is treated as
/// degenerate and replaced by a fallback axis.
pub const DEGENERATE_AXIS_TOLERANCE: f64 = 1e-12;

// =============================================================================
// MESHING CONSTANTS
// =============================================================================

/// Default target element size used when the caller passes a non-positive one.
pub const DEFAULT_MESH_SIZE: f64 = 0.1;

/// Coarse element size the sizing field grows to outside a piece's
/// influence radius.
pub const BACKGROUND_MESH_SIZE: f64 = 0.3;

/// Multiplier on a piece's influence radius giving the distance at which the
/// sizing field reaches the background size.
pub const SIZING_FALLOFF: f64 = 1.1;

// =============================================================================
// CONSTRUCTION CONSTANTS
// =============================================================================

/// Minimum ratio of bend radius to pipe radius for a smooth curve.
///
/// Below this the revolved solid self-intersects (or comes close enough to
/// break the boolean union), so the network rejects the request up front.
pub const MIN_BEND_RADIUS_FACTOR: f64 = 1.1;

/// Over-length factor applied to the canonical mitered-bend cylinder so the
/// chamfered cutting box always spans the full miter plane.
pub const MITER_HEIGHT_FACTOR: f64 = 2.1;

/// Over-length factor applied to the three T-junction stub cylinders so each
/// end face emerges cleanly from the fused joint.
pub const JUNCTION_CLEARANCE_FACTOR: f64 = 1.1;

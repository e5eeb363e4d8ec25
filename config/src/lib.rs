//! # Config Crate
//!
//! Centralized configuration constants for the pipenet pipeline.
//! All magic numbers and tunable parameters are defined here to ensure
//! consistency across crates and easy configuration management.
//!
//! ## Usage
//!
//! ```rust
//! use config::constants::{MATCH_TOLERANCE, DEFAULT_MESH_SIZE};
//!
//! // Use MATCH_TOLERANCE for centroid correspondence checks
//! let distance: f64 = 1e-10;
//! assert!(distance < MATCH_TOLERANCE);
//!
//! // Fall back to the default mesh size when the caller passes junk
//! let requested = -1.0;
//! let mesh_size = if requested > 0.0 { requested } else { DEFAULT_MESH_SIZE };
//! assert_eq!(mesh_size, DEFAULT_MESH_SIZE);
//! ```
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All constants defined once, used everywhere
//! - **Well-Documented**: Every constant has clear documentation

pub mod constants;

#[cfg(test)]
mod tests;

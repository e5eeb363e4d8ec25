//! # Pipenet-Core
//!
//! Parametric builder for branching pipe-network solids and their CFD
//! meshes. A [`Network`] starts from an inlet cylinder and grows piece by
//! piece (straight runs, smooth and mitered bends, radius changes,
//! T-junctions); generating it fuses the pieces into one solid, registers
//! physical surface groups for boundary conditions, and meshes the result.
//!
//! ## Architecture
//!
//! ```text
//! pieces (canonical solids + orientation)
//!       ↓
//! Network (placement, fusion, physical groups)
//!       ↓
//! sizing fields + report writers
//! ```
//!
//! All geometry goes through the [`pipenet_kernel::Kernel`] trait, so the
//! whole pipeline runs against the analytic mock kernel in tests.
//!
//! ## Usage
//!
//! ```rust
//! use glam::DVec3;
//! use pipenet_core::{GenerateOptions, Network};
//! use pipenet_kernel::{MockKernel, Session};
//!
//! let mut session = Session::new(MockKernel::new()).unwrap();
//! let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
//! network.add_curve(DVec3::Z, 1.0, 0.1, 0).unwrap();
//! let report = network.generate(&GenerateOptions::default()).unwrap();
//! assert_eq!(report.in_out.len(), 2);
//! ```

pub mod algebra;
pub mod error;
pub mod network;
pub mod orient;
pub mod pieces;
pub mod report;

mod sizing;
mod surface;

pub use error::{Error, Result};
pub use network::{GenerateOptions, Network};
pub use pieces::PipePiece;
pub use report::{JunctionReport, NetworkReport, SurfaceReport, WallReport};
pub use surface::Surface;

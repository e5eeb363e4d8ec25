//! # Error Types
//!
//! Error types for network construction. All errors are explicit and provide
//! clear debugging information.
//!
//! ## Error Policy
//!
//! - NO fallback mechanisms when operations fail
//! - All failures return explicit errors
//! - Errors include context for debugging

use thiserror::Error;

use pipenet_kernel::KernelError;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while building or generating a pipe network.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller passed a value outside the valid domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Two pieces of the network occupy the same space, which would make
    /// the boolean fusion produce a non-pipe solid.
    #[error("Pieces overlap")]
    GeometryOverlap,

    /// Operation is not valid in the network's current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An internal geometric invariant failed. This indicates a bug, not a
    /// user error; the model cannot be trusted past this point.
    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),

    /// Failure at the kernel boundary.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// Filesystem failure while writing report output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// RESULT TYPE ALIAS
// =============================================================================

/// Result type alias for network operations.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// TESTS
// =============================================================================

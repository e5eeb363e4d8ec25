//! # Error Types
//!
//! Error types for kernel operations. All errors are explicit and provide
//! clear debugging information.
//!
//! ## Error Policy
//!
//! - NO fallback mechanisms when operations fail
//! - All failures return explicit errors
//! - Errors include context for debugging

use thiserror::Error;

use crate::DimTag;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur at the kernel boundary.
///
/// ## Example
///
/// ```rust
/// use pipenet_kernel::{KernelError, DimTag};
///
/// let err = KernelError::UnknownEntity(DimTag::volume(7));
/// assert!(err.to_string().contains("(3, 7)"));
/// ```
#[derive(Error, Debug)]
pub enum KernelError {
    /// The kernel was initialized twice without an intervening finalize.
    #[error("Kernel already initialized")]
    AlreadyInitialized,

    /// An operation was requested before initialize or after finalize.
    #[error("Kernel not initialized")]
    NotInitialized,

    /// A (dimension, tag) pair does not name a live entity.
    ///
    /// Typically means the entity was consumed by a boolean operation.
    #[error("Unknown entity {0}")]
    UnknownEntity(DimTag),

    /// A geometry query was issued while pending operations had not been
    /// synchronized into the queryable model.
    #[error("Stale model: synchronize before querying {query}")]
    StaleModel {
        /// Name of the rejected query.
        query: &'static str,
    },

    /// The kernel cannot perform the requested operation on these inputs.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The operation produced or was given degenerate geometry.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Mesh output was requested before any mesh was generated.
    #[error("No mesh generated")]
    MeshNotGenerated,

    /// Filesystem failure while writing mesh or report output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// RESULT TYPE ALIAS
// =============================================================================

/// Result type alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

// =============================================================================
// TESTS
// =============================================================================

//! # Session Management
//!
//! Ties kernel lifetime to a Rust scope. A [`Session`] initializes its kernel
//! on construction and finalizes it on drop, so a panic or early return can
//! never leak a live kernel.

use tracing::{debug, warn};

use crate::error::KernelResult;
use crate::Kernel;

// =============================================================================
// SESSION
// =============================================================================

/// Scope guard owning an initialized kernel.
///
/// All geometry work goes through [`kernel`](Session::kernel). Call
/// [`finish`](Session::finish) to finalize explicitly and observe any
/// teardown error; otherwise drop finalizes and logs failures.
///
/// ## Example
///
/// ```rust
/// use pipenet_kernel::{MockKernel, Session};
///
/// let mut session = Session::new(MockKernel::new()).unwrap();
/// // ... build geometry through session.kernel() ...
/// session.finish().unwrap();
/// ```
#[derive(Debug)]
pub struct Session<K: Kernel> {
    kernel: K,
    finished: bool,
}

impl<K: Kernel> Session<K> {
    /// Initializes `kernel` and wraps it in a session.
    pub fn new(mut kernel: K) -> KernelResult<Self> {
        kernel.initialize()?;
        debug!("kernel session opened");
        Ok(Self {
            kernel,
            finished: false,
        })
    }

    /// Mutable access to the underlying kernel.
    pub fn kernel(&mut self) -> &mut K {
        &mut self.kernel
    }

    /// Finalizes the kernel, consuming the session.
    pub fn finish(mut self) -> KernelResult<()> {
        self.finished = true;
        debug!("kernel session closed");
        self.kernel.finalize()
    }
}

impl<K: Kernel> Drop for Session<K> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.kernel.finalize() {
                warn!("kernel finalize failed during drop: {err}");
            }
        }
    }
}

/// Runs `f` inside a fresh session, finalizing afterwards even on error.
pub fn with<K, T, F>(kernel: K, f: F) -> KernelResult<T>
where
    K: Kernel,
    F: FnOnce(&mut Session<K>) -> KernelResult<T>,
{
    let mut session = Session::new(kernel)?;
    let out = f(&mut session)?;
    session.finish()?;
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================

//! Job-scoped cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A one-way latch shared by every stage of a single conversion job.
///
/// Starts clear. [`cancel`](Self::cancel) moves it to set, and it stays
/// set for the rest of the job; there is no way back. A new job gets a
/// new signal rather than resetting an old one, so overlapping jobs
/// never see each other's stop requests.
///
/// Clones share the same latch. Checking is a single atomic load and
/// never blocks.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal(Arc<AtomicBool>);

impl CancellationSignal {
    /// Create a clear signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    ///
    /// Returns `true` if this call performed the clear-to-set
    /// transition.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ABOUTME: Cooperative cancellation for blocking work spawned off the async runtime.
// ABOUTME: A guard held by the async side raises the flag when its future is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag telling in-flight packing or git transfers to stop.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise the flag when the returned guard is dropped.
    ///
    /// Held by the async side so a cancelled or timed-out future stops the
    /// blocking work it spawned.
    pub fn raise_on_drop(&self) -> AbortOnDrop {
        AbortOnDrop(self.clone())
    }
}

#[must_use = "the flag is raised as soon as the guard is dropped"]
#[derive(Debug)]
pub struct AbortOnDrop(AbortFlag);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.raise();
    }
}

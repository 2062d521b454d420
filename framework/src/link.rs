//! Network link readiness flag
//!
//! Written by the WiFi event handlers, read once per sampling iteration.
//! Relaxed ordering: the flag publishes no other data.

use core::sync::atomic::{AtomicBool, Ordering};

/// Shared "network is usable" flag
#[derive(Debug, Default)]
pub struct LinkState {
    ready: AtomicBool,
}

impl LinkState {
    /// Starts not ready
    pub const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

//! Platform seams for the supervisor
//!
//! The firmware implements these with the FreeRTOS tick and the chip reset;
//! tests use a virtual clock and a restart that unwinds.

/// Monotonic millisecond clock with blocking delays
pub trait Scheduler {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;

    /// Block for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Block until `deadline_ms`; returns immediately if it already passed
    fn delay_until_ms(&mut self, deadline_ms: u64);
}

/// Whole-device restart
pub trait Restart {
    fn restart(&mut self) -> !;
}

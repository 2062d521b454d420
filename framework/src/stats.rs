//! Sampling loop counters and periodic rate report

use core::fmt;

/// Result category of one sampling iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Block read and handed to the transport
    Published,
    /// Block read, link down, nothing sent
    LinkDown,
    /// Block read, transport rejected it
    SendFailed,
    /// Sensor read failed
    Degraded,
}

/// Iteration counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub iterations: u32,
    pub published: u32,
    pub link_down: u32,
    pub send_failed: u32,
    pub degraded: u32,
}

impl Counters {
    fn record(&mut self, outcome: Outcome) {
        self.iterations = self.iterations.wrapping_add(1);
        let counter = match outcome {
            Outcome::Published => &mut self.published,
            Outcome::LinkDown => &mut self.link_down,
            Outcome::SendFailed => &mut self.send_failed,
            Outcome::Degraded => &mut self.degraded,
        };
        *counter = counter.wrapping_add(1);
    }
}

/// One finished reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub counters: Counters,
    pub elapsed_ms: u64,
}

impl Report {
    /// Events per second over the window
    pub fn rate_hz(&self, count: u32) -> u32 {
        if self.elapsed_ms == 0 {
            return 0;
        }
        (u64::from(count) * 1000 / self.elapsed_ms) as u32
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loop: {}Hz | UDP: {}Hz | Drops: {} | Fails: {} | Degraded: {}",
            self.rate_hz(self.counters.iterations),
            self.rate_hz(self.counters.published),
            self.counters.link_down,
            self.counters.send_failed,
            self.counters.degraded
        )
    }
}

/// Lifetime totals plus a rolling reporting window
#[derive(Debug, Clone)]
pub struct LoopStats {
    totals: Counters,
    window: Counters,
    window_start_ms: u64,
    interval_ms: u32,
}

impl LoopStats {
    pub fn new(now_ms: u64, interval_ms: u32) -> Self {
        Self {
            totals: Counters::default(),
            window: Counters::default(),
            window_start_ms: now_ms,
            interval_ms,
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.totals.record(outcome);
        self.window.record(outcome);
    }

    pub fn totals(&self) -> Counters {
        self.totals
    }

    /// Close the window once `interval_ms` has elapsed
    ///
    /// Returns `None` while the window is still open or reporting is
    /// disabled (zero interval).
    pub fn take_report(&mut self, now_ms: u64) -> Option<Report> {
        if self.interval_ms == 0 {
            return None;
        }
        let elapsed_ms = now_ms.saturating_sub(self.window_start_ms);
        if elapsed_ms < u64::from(self.interval_ms) {
            return None;
        }

        let report = Report {
            counters: core::mem::take(&mut self.window),
            elapsed_ms,
        };
        self.window_start_ms = now_ms;
        Some(report)
    }
}

//! Fixed-rate wake schedule
//!
//! Deadlines sit on the grid `start + k * period`. Advancing always moves by
//! exactly one period from the previous deadline, never from "now", so time
//! spent in an iteration does not accumulate as drift.

/// Absolute wake schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    period_ms: u32,
    last_wake_ms: u64,
}

impl Cadence {
    /// Anchor the grid at `start_ms`
    pub fn new(start_ms: u64, period_ms: u32) -> Self {
        Self {
            period_ms: period_ms.max(1),
            last_wake_ms: start_ms,
        }
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Most recent grid point handed out
    pub fn last_wake_ms(&self) -> u64 {
        self.last_wake_ms
    }

    /// Move to the next grid point and return it as the deadline
    pub fn advance(&mut self) -> u64 {
        self.last_wake_ms += u64::from(self.period_ms);
        self.last_wake_ms
    }

    /// Drop grid points that already lie in the past
    ///
    /// After a long stall the last wake is moved to the latest grid point not
    /// after `now_ms`, so the next `advance` lands in the future instead of
    /// releasing a burst of overdue ticks. Returns the number of skipped
    /// points.
    pub fn resync(&mut self, now_ms: u64) -> u64 {
        let period = u64::from(self.period_ms);
        if now_ms < self.last_wake_ms + period {
            return 0;
        }
        let behind = (now_ms - self.last_wake_ms) / period;
        self.last_wake_ms += behind * period;
        behind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_stays_on_grid() {
        let mut cadence = Cadence::new(1_000, 50);
        for k in 1..=200u64 {
            assert_eq!(cadence.advance(), 1_000 + k * 50);
        }
    }

    #[test]
    fn test_resync_noop_within_period() {
        let mut cadence = Cadence::new(0, 50);
        assert_eq!(cadence.resync(49), 0);
        assert_eq!(cadence.last_wake_ms(), 0);
        assert_eq!(cadence.advance(), 50);
    }

    #[test]
    fn test_resync_skips_missed_points() {
        let mut cadence = Cadence::new(100, 50);
        cadence.advance(); // 150

        // Stalled until 1_173
        assert_eq!(cadence.resync(1_173), 20);
        assert_eq!(cadence.last_wake_ms(), 1_150);

        let next = cadence.advance();
        assert_eq!(next, 1_200);
        assert!(next > 1_173);
        assert_eq!((next - 100) % 50, 0);
    }

    #[test]
    fn test_resync_exact_boundary() {
        let mut cadence = Cadence::new(0, 50);
        assert_eq!(cadence.resync(100), 2);
        assert_eq!(cadence.advance(), 150);
    }

    #[test]
    fn test_zero_period_clamped() {
        let mut cadence = Cadence::new(0, 0);
        assert_eq!(cadence.period_ms(), 1);
        assert_eq!(cadence.advance(), 1);
    }
}

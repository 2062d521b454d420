//! Supervisor configuration

use core::time::Duration;

use mpu6050::DEFAULT_ADDRESS;

/// Sampling period (20 Hz)
pub const DEFAULT_PERIOD_MS: u32 = 50;
/// Sensor power-up settle time before configuration
pub const DEFAULT_SETTLE_MS: u32 = 500;
/// Pause after a failed sampling iteration
pub const DEFAULT_ERROR_PAUSE_MS: u32 = 1000;
/// Delay between a fatal boot error and restart
pub const DEFAULT_FATAL_BACKOFF_MS: u32 = 1000;
/// Per-transaction bus timeout
pub const DEFAULT_BUS_TIMEOUT_MS: u32 = 1000;
/// Interval between loop statistics reports
pub const DEFAULT_REPORT_INTERVAL_MS: u32 = 5000;

/// Timing and addressing for the sampling supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub period_ms: u32,
    pub settle_ms: u32,
    pub error_pause_ms: u32,
    pub fatal_backoff_ms: u32,
    pub bus_timeout_ms: u32,
    pub report_interval_ms: u32,
    /// 7-bit device address
    pub device_address: u8,
}

impl SupervisorConfig {
    /// Nominal sampling rate
    pub fn rate_hz(&self) -> u32 {
        1000 / self.period_ms.max(1)
    }

    pub fn bus_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.bus_timeout_ms))
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_PERIOD_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            error_pause_ms: DEFAULT_ERROR_PAUSE_MS,
            fatal_backoff_ms: DEFAULT_FATAL_BACKOFF_MS,
            bus_timeout_ms: DEFAULT_BUS_TIMEOUT_MS,
            report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
            device_address: DEFAULT_ADDRESS,
        }
    }
}

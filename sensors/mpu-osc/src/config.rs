//! Configuration management for the MPU-6050 OSC node
//! Defaults match the reference wiring; build-time environment variables
//! override them

use core::fmt::Display;
use core::str::FromStr;

use imu_telemetry::SupervisorConfig;
use log::warn;
use mpu6050::bus::BusConfig;

/// Network configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network to join (station mode only)
    pub wifi_ssid: &'static str,
    /// WPA passphrase, empty for an open network
    pub wifi_password: &'static str,
    /// Telemetry receiver as `host:port`
    pub udp_server: &'static str,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: "mpu-osc",
            wifi_password: "",
            // Placeholder - set UDP_SERVER at build time
            udp_server: "192.168.1.100:12345",
        }
    }
}

/// Sampling task settings
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig {
    /// NUL-terminated FreeRTOS task name
    pub name: &'static [u8],
    pub stack_size: usize,
    pub priority: u8,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            name: b"mpu_read_task\0",
            stack_size: 8192,
            priority: 10,
        }
    }
}

/// Complete system configuration
#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    pub network: NetworkConfig,
    pub bus: BusConfig,
    pub supervisor: SupervisorConfig,
    pub task: TaskConfig,
}

impl SystemConfig {
    /// Load configuration from build-time environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ssid) = option_env!("WIFI_SSID") {
            config.network.wifi_ssid = ssid;
        }
        if let Some(password) = option_env!("WIFI_PASSWORD") {
            config.network.wifi_password = password;
        }
        if let Some(server) = option_env!("UDP_SERVER") {
            config.network.udp_server = server;
        }

        config.bus.clock_stretch_ticks = override_or(
            "I2C_CLK_STRETCH",
            option_env!("I2C_CLK_STRETCH"),
            config.bus.clock_stretch_ticks,
        );
        config.supervisor.period_ms = override_or(
            "SAMPLE_PERIOD_MS",
            option_env!("SAMPLE_PERIOD_MS"),
            config.supervisor.period_ms,
        );

        config
    }
}

/// Parse an optional override, keeping `default` when absent or malformed
fn override_or<T>(name: &str, value: Option<&str>, default: T) -> T
where
    T: FromStr + Display,
{
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring {}={:?}, using {}", name, raw, default);
            default
        }),
    }
}

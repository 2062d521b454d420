//! IMU Telemetry Framework
//!
//! Hardware-independent core of a small IMU streaming node: an MPU-6050 is
//! sampled over I2C at a fixed rate and each raw measurement block is
//! published as one UDP datagram.
//!
//! ## Features
//!
//! - **Supervisor**: Boot sequence, fixed-rate sampling loop, restart on fatal errors
//! - **Absolute Cadence**: Wake-ups stay on a fixed grid regardless of work time
//! - **Link Flag**: Lock-free network readiness shared with event handlers
//! - **Transport Abstraction**: Any datagram sink behind [`TelemetrySink`]
//! - **Host Testable**: Clock, restart and transport are traits; tests run against
//!   the simulated bus from the `mpu6050` driver
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Supervisor (state machine, cadence)    │
//! ├──────────────────┬──────────────────────┤
//! │  MPU-6050 driver │  TelemetrySink       │
//! ├──────────────────┼──────────────────────┤
//! │  I2C BusEngine   │  UDP / WiFi (target) │
//! └──────────────────┴──────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use imu_telemetry::{LinkState, Supervisor, SupervisorConfig};
//! use mpu6050::bus::BusConfig;
//!
//! let link = Arc::new(LinkState::new());
//! let supervisor = Supervisor::new(
//!     SupervisorConfig::default(),
//!     BusConfig::default(),
//!     scheduler,
//!     udp_sink,
//!     restart,
//!     Arc::clone(&link),
//! );
//!
//! // Never returns
//! supervisor.run(i2c_controller);
//! ```
//!
//! ## Modules
//!
//! - [`supervisor`] - Lifecycle state machine and sampling loop
//! - [`cadence`] - Fixed-rate wake schedule
//! - [`sample`] - Measurement block decoding
//! - [`sink`] - Telemetry transport trait
//! - [`stats`] - Loop counters and rate report

pub mod cadence;
pub mod config;
pub mod fault;
pub mod link;
pub mod platform;
pub mod sample;
pub mod sink;
pub mod stats;
pub mod supervisor;

// Re-export commonly used types
pub use config::SupervisorConfig;
pub use fault::Fault;
pub use link::LinkState;
pub use platform::{Restart, Scheduler};
pub use sample::{MeasurementBlock, Sample};
pub use sink::{SendError, TelemetrySink};
pub use supervisor::{Iteration, State, Supervisor};

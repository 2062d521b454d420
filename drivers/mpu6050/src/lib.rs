//! MPU-6050 6-Axis IMU I2C Driver
//!
//! This crate provides a pure Rust driver for the InvenSense MPU-6050
//! accelerometer/gyroscope, built on a small phase-level I2C transaction
//! engine ([`bus`]).
//!
//! # Features
//!
//! - Explicit start/address/data/stop sequencing, one atomic command per
//!   transaction
//! - Device configuration (low-pass filter, clock source)
//! - Lightweight `WHO_AM_I` presence check
//! - 14-byte measurement burst read
//! - `no_std` compatible
//! - In-memory simulated bus for host tests (`sim` feature)
//!
//! # Example
//!
//! ```ignore
//! use mpu6050::{bus::{BusConfig, BusEngine}, Mpu6050, DEFAULT_ADDRESS, DEFAULT_TIMEOUT};
//!
//! let mut bus = BusEngine::initialize(controller, BusConfig::default())?;
//! let imu = Mpu6050::new(DEFAULT_ADDRESS, DEFAULT_TIMEOUT);
//!
//! imu.configure(&mut bus)?;
//!
//! let mut block = [0u8; mpu6050::MEASUREMENT_LEN];
//! imu.verify_identity(&mut bus)?;
//! imu.read_measurement(&mut bus, &mut block)?;
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

use core::fmt::Debug;
use core::time::Duration;

#[cfg(feature = "logging")]
use log::{info, warn};

pub mod bus;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

use bus::{BusController, BusEngine, Stage};

/// Default 7-bit address (AD0 low)
pub const DEFAULT_ADDRESS: u8 = 0x68;
/// Alternate 7-bit address (AD0 high)
pub const ALTERNATE_ADDRESS: u8 = 0x69;
/// Expected `WHO_AM_I` content, independent of AD0
pub const WHO_AM_I_RESPONSE: u8 = 0x68;
/// Size of the accel/temp/gyro burst
pub const MEASUREMENT_LEN: usize = 14;
/// Per-transaction timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Register addresses
pub mod reg {
    /// Frame sync and digital low-pass filter
    pub const CONFIG: u8 = 0x1A;
    /// First byte of the accel/temp/gyro burst
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    /// Power management 1 (sleep, clock source)
    pub const PWR_MGMT_1: u8 = 0x6B;
    /// Device identity
    pub const WHO_AM_I: u8 = 0x75;
}

/// Digital low-pass filter setting (CONFIG.DLPF_CFG)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DlpfConfig {
    /// Accel 260 Hz, gyro 256 Hz
    Bw260Hz = 0,
    /// Accel 184 Hz, gyro 188 Hz
    Bw184Hz = 1,
    /// Accel 94 Hz, gyro 98 Hz
    Bw94Hz = 2,
    /// Accel 44 Hz, gyro 42 Hz
    Bw44Hz = 3,
    /// Accel 21 Hz, gyro 20 Hz
    Bw21Hz = 4,
    /// Accel 10 Hz, gyro 10 Hz
    Bw10Hz = 5,
    /// Accel 5 Hz, gyro 5 Hz
    Bw5Hz = 6,
}

/// Clock source (PWR_MGMT_1.CLKSEL)
///
/// Writing any value also clears the SLEEP bit that is set at power-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClockSource {
    /// Internal 8 MHz oscillator
    Internal = 0,
    /// PLL with X axis gyroscope reference
    PllGyroX = 1,
    /// PLL with Y axis gyroscope reference
    PllGyroY = 2,
    /// PLL with Z axis gyroscope reference
    PllGyroZ = 3,
    /// PLL with external 32.768 kHz reference
    PllExternal32k = 4,
    /// PLL with external 19.2 MHz reference
    PllExternal19M = 5,
}

/// Driver errors
///
/// `S` is the status type of the underlying bus controller.
#[derive(Debug, thiserror::Error)]
pub enum Error<S>
where
    S: Debug,
{
    /// Bus controller could not be installed or configured
    #[error("bus configuration failed: {0:?}")]
    BusConfig(S),

    /// A transaction phase failed (timeout, NACK, controller error)
    #[error("{stage:?} transaction failed: {status:?}")]
    Bus { stage: Stage, status: S },

    /// Device answered but is not an MPU-6050
    #[error("unexpected WHO_AM_I {found:#04x} (expected {expected:#04x})")]
    IdentityMismatch { expected: u8, found: u8 },
}

/// MPU-6050 register-level driver
///
/// Holds no bus handle; every operation borrows the engine for its duration.
#[derive(Debug, Clone, Copy)]
pub struct Mpu6050 {
    address: u8,
    timeout: Duration,
    dlpf: DlpfConfig,
    clock: ClockSource,
}

impl Mpu6050 {
    /// Create a driver for the device at `address`
    ///
    /// # Arguments
    ///
    /// * `address` - 7-bit I2C address
    /// * `timeout` - Budget for each bus transaction
    pub const fn new(address: u8, timeout: Duration) -> Self {
        Self {
            address,
            timeout,
            dlpf: DlpfConfig::Bw21Hz,
            clock: ClockSource::PllGyroX,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Write the low-pass filter then the clock source
    ///
    /// Stops at the first failed write.
    pub fn configure<C: BusController>(
        &self,
        bus: &mut BusEngine<C>,
    ) -> Result<(), Error<C::Status>> {
        bus.write_register(self.address, self.timeout, reg::CONFIG, &[self.dlpf as u8])?;
        bus.write_register(
            self.address,
            self.timeout,
            reg::PWR_MGMT_1,
            &[self.clock as u8],
        )?;

        #[cfg(feature = "logging")]
        info!(
            "MPU-6050 at {:#04x} configured (dlpf={:?}, clock={:?})",
            self.address, self.dlpf, self.clock
        );

        Ok(())
    }

    /// Read `WHO_AM_I` and compare it against [`WHO_AM_I_RESPONSE`]
    pub fn verify_identity<C: BusController>(
        &self,
        bus: &mut BusEngine<C>,
    ) -> Result<(), Error<C::Status>> {
        let mut who_am_i = [0u8; 1];
        bus.read_register(self.address, self.timeout, reg::WHO_AM_I, &mut who_am_i)?;

        if who_am_i[0] != WHO_AM_I_RESPONSE {
            #[cfg(feature = "logging")]
            warn!("MPU-6050 WHO_AM_I mismatch: 0x{:02X}", who_am_i[0]);
            return Err(Error::IdentityMismatch {
                expected: WHO_AM_I_RESPONSE,
                found: who_am_i[0],
            });
        }

        Ok(())
    }

    /// Burst-read accel, temperature and gyro registers
    pub fn read_measurement<C: BusController>(
        &self,
        bus: &mut BusEngine<C>,
        out: &mut [u8; MEASUREMENT_LEN],
    ) -> Result<(), Error<C::Status>> {
        bus.read_register(self.address, self.timeout, reg::ACCEL_XOUT_H, out)
    }
}

impl Default for Mpu6050 {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, DEFAULT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusConfig;
    use crate::sim::{SimBus, SimStatus};

    fn setup() -> (SimBus, BusEngine<SimBus>, Mpu6050) {
        let sim = SimBus::mpu6050();
        let engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();
        (sim, engine, Mpu6050::default())
    }

    #[test]
    fn test_configure_writes_filter_then_clock() {
        let (sim, mut engine, imu) = setup();

        imu.configure(&mut engine).unwrap();

        assert_eq!(sim.register(reg::CONFIG), 4);
        assert_eq!(sim.register(reg::PWR_MGMT_1), 1);

        let writes: Vec<_> = sim
            .log()
            .iter()
            .filter(|r| r.stage == Stage::Write)
            .map(|r| r.register)
            .collect();
        assert_eq!(writes, [Some(reg::CONFIG), Some(reg::PWR_MGMT_1)]);
    }

    #[test]
    fn test_configure_stops_at_first_failure() {
        let (sim, mut engine, imu) = setup();
        sim.fail_register(reg::CONFIG, 1);

        match imu.configure(&mut engine) {
            Err(Error::Bus {
                stage: Stage::Write,
                status: SimStatus::DataNack,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        // Power management never touched
        assert_eq!(sim.log().len(), 1);
        assert_eq!(sim.register(reg::PWR_MGMT_1), 0x40);
    }

    #[test]
    fn test_verify_identity_ok() {
        let (_sim, mut engine, imu) = setup();
        assert!(imu.verify_identity(&mut engine).is_ok());
    }

    #[test]
    fn test_verify_identity_mismatch_for_every_other_value() {
        let (sim, mut engine, imu) = setup();

        for value in 0..=255u8 {
            sim.set_register(reg::WHO_AM_I, value);
            let result = imu.verify_identity(&mut engine);
            if value == WHO_AM_I_RESPONSE {
                assert!(result.is_ok());
            } else {
                match result {
                    Err(Error::IdentityMismatch { expected, found }) => {
                        assert_eq!(expected, 0x68);
                        assert_eq!(found, value);
                    }
                    other => panic!("value {:#04x}: {:?}", value, other),
                }
            }
        }
    }

    #[test]
    fn test_verify_identity_bus_failure() {
        let (sim, mut engine, imu) = setup();
        sim.set_present(false);

        assert!(matches!(
            imu.verify_identity(&mut engine),
            Err(Error::Bus {
                stage: Stage::Select,
                status: SimStatus::AddressNack
            })
        ));
    }

    #[test]
    fn test_read_measurement_block() {
        let (sim, mut engine, imu) = setup();
        let block = [
            0x00, 0x01, 0xFF, 0xFF, 0x7F, 0xFF, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x02,
        ];
        sim.set_block(reg::ACCEL_XOUT_H, &block);

        let mut out = [0u8; MEASUREMENT_LEN];
        imu.read_measurement(&mut engine, &mut out).unwrap();
        assert_eq!(out, block);
        assert_eq!(sim.selects_of(reg::ACCEL_XOUT_H), 1);
    }

    #[test]
    fn test_alternate_address() {
        let sim = SimBus::new(ALTERNATE_ADDRESS);
        sim.set_register(reg::WHO_AM_I, WHO_AM_I_RESPONSE);
        let mut engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();

        let imu = Mpu6050::new(ALTERNATE_ADDRESS, DEFAULT_TIMEOUT);
        assert!(imu.verify_identity(&mut engine).is_ok());

        let wrong = Mpu6050::default();
        assert!(wrong.verify_identity(&mut engine).is_err());
    }

    #[test]
    fn test_error_display() {
        let err: Error<SimStatus> = Error::IdentityMismatch {
            expected: 0x68,
            found: 0x70,
        };
        assert_eq!(
            err.to_string(),
            "unexpected WHO_AM_I 0x70 (expected 0x68)"
        );

        let err: Error<SimStatus> = Error::Bus {
            stage: Stage::Read,
            status: SimStatus::Timeout,
        };
        assert_eq!(err.to_string(), "Read transaction failed: Timeout");
    }
}

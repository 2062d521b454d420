//! ESP-IDF I2C master controller
//!
//! Maps each engine [`Transaction`] onto one `I2cDriver` call. The driver
//! builds, runs and frees its own command link, so nothing is held between
//! transactions.

use std::time::Duration;

use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio::{AnyIOPin, IOPin, Pin};
use esp_idf_hal::i2c::{APBTickType, I2cConfig, I2cDriver, I2C0};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::sys::{EspError, ESP_ERR_INVALID_ARG, ESP_ERR_INVALID_STATE};
use log::{info, warn};
use mpu6050::bus::{BusConfig, BusController, Transaction};

/// Longest SCL hold the controller timeout register can express (0xFFFFF APB cycles)
const MAX_STRETCH: Duration = Duration::from_micros(13_107);

/// Clock-stretch allowance: one tick is one SCL period
fn stretch_timeout(config: &BusConfig) -> Duration {
    let micros = u64::from(config.clock_stretch_ticks) * 1_000_000 / u64::from(config.clock_hz.max(1));
    Duration::from_micros(micros).min(MAX_STRETCH)
}

/// Whether `config` names the controller and pins this bus was wired with
fn matches_wiring(config: &BusConfig, sda: i32, scl: i32) -> bool {
    config.port == 0 && config.sda_pin == sda && config.scl_pin == scl
}

/// Peripherals claimed at startup, handed to the driver on install
struct Wiring {
    i2c: I2C0,
    sda: AnyIOPin,
    scl: AnyIOPin,
}

/// I2C0 in master mode
pub struct EspI2cBus {
    wiring: Option<Wiring>,
    driver: Option<I2cDriver<'static>>,
}

impl EspI2cBus {
    pub fn new(i2c: I2C0, sda: impl IOPin, scl: impl IOPin) -> Self {
        Self {
            wiring: Some(Wiring {
                i2c,
                sda: sda.downgrade(),
                scl: scl.downgrade(),
            }),
            driver: None,
        }
    }

    fn driver(&mut self) -> Result<&mut I2cDriver<'static>, EspError> {
        self.driver
            .as_mut()
            .ok_or_else(EspError::from_infallible::<ESP_ERR_INVALID_STATE>)
    }
}

impl BusController for EspI2cBus {
    type Status = EspError;

    fn install(&mut self, config: &BusConfig) -> Result<(), EspError> {
        let wiring = self
            .wiring
            .take()
            .ok_or_else(EspError::from_infallible::<ESP_ERR_INVALID_STATE>)?;

        let (sda, scl) = (i32::from(wiring.sda.pin()), i32::from(wiring.scl.pin()));
        if !matches_wiring(config, sda, scl) {
            warn!(
                "I2C{} SDA={} SCL={} requested, wired as I2C0 SDA={} SCL={}",
                config.port, config.sda_pin, config.scl_pin, sda, scl
            );
            self.wiring = Some(wiring);
            return Err(EspError::from_infallible::<ESP_ERR_INVALID_ARG>());
        }

        let stretch = stretch_timeout(config);
        let i2c_config = I2cConfig::new()
            .baudrate(Hertz(config.clock_hz))
            .sda_enable_pullup(config.pullups)
            .scl_enable_pullup(config.pullups)
            .timeout(APBTickType::from(stretch));

        self.driver = Some(I2cDriver::new(
            wiring.i2c,
            wiring.sda,
            wiring.scl,
            &i2c_config,
        )?);

        info!(
            "I2C0 master on SDA={} SCL={} at {} Hz (stretch {:?})",
            sda, scl, config.clock_hz, stretch
        );
        Ok(())
    }

    fn execute(
        &mut self,
        transaction: &mut Transaction<'_>,
        timeout: Duration,
    ) -> Result<(), EspError> {
        let ticks = TickType::from(timeout).ticks();
        let driver = self.driver()?;

        match transaction {
            Transaction::Select { address, register } => driver.write(*address, &[*register], ticks),
            // Nothing to clock in; the driver rejects zero-length reads
            Transaction::Read { buf, .. } if buf.is_empty() => Ok(()),
            Transaction::Read { address, buf } => driver.read(*address, buf, ticks),
            Transaction::Write {
                address,
                register,
                data,
            } => {
                let mut bytes = Vec::with_capacity(data.len() + 1);
                bytes.push(*register);
                bytes.extend_from_slice(data);
                driver.write(*address, &bytes, ticks)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretch_timeout_default() {
        // 300 SCL periods at 100 kHz
        assert_eq!(stretch_timeout(&BusConfig::default()), Duration::from_millis(3));
    }

    #[test]
    fn test_stretch_timeout_capped() {
        let config = BusConfig::default().with_clock_stretch(100_000);
        assert_eq!(stretch_timeout(&config), MAX_STRETCH);
    }

    #[test]
    fn test_wiring_check() {
        let config = BusConfig::default();
        assert!(matches_wiring(&config, 14, 2));
        assert!(!matches_wiring(&config, 21, 22));
        assert!(!matches_wiring(&BusConfig::new(1, 14, 2), 14, 2));
    }
}

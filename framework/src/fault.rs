//! Supervisor fault classification

use core::fmt::Debug;

use mpu6050::bus::Stage;

use crate::sink::SendError;

/// Everything that can go wrong while booting or sampling
///
/// `S` is the bus controller status type.
#[derive(Debug, thiserror::Error)]
pub enum Fault<S>
where
    S: Debug,
{
    /// Bus driver could not be installed
    #[error("unable to initialize I2C: {0:?}")]
    BusConfig(S),

    /// A bus transaction failed
    #[error("{stage:?} transaction failed: {status:?}")]
    Bus { stage: Stage, status: S },

    /// Something answered that is not an MPU-6050
    #[error("MPU not found: WHO_AM_I {found:#04x}, expected {expected:#04x}")]
    IdentityMismatch { expected: u8, found: u8 },

    /// Telemetry transport failure
    #[error("telemetry: {0}")]
    Send(#[from] SendError),
}

impl<S: Debug> From<mpu6050::Error<S>> for Fault<S> {
    fn from(err: mpu6050::Error<S>) -> Self {
        match err {
            mpu6050::Error::BusConfig(status) => Fault::BusConfig(status),
            mpu6050::Error::Bus { stage, status } => Fault::Bus { stage, status },
            mpu6050::Error::IdentityMismatch { expected, found } => {
                Fault::IdentityMismatch { expected, found }
            }
        }
    }
}

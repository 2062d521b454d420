//! Measurement block decoding
//!
//! The MPU-6050 burst starting at ACCEL_XOUT_H is seven big-endian signed
//! 16-bit channels. The same 14 bytes are the telemetry wire format.
use core::fmt;

use mpu6050::MEASUREMENT_LEN;

/// Raw accel/temp/gyro burst as read from the device and sent on the wire
pub type MeasurementBlock = [u8; MEASUREMENT_LEN];

/// Number of channels in a block
pub const CHANNELS: usize = MEASUREMENT_LEN / 2;

/// Channel names in wire order
pub const CHANNEL_NAMES: [&str; CHANNELS] = ["ax", "ay", "az", "temp", "gx", "gy", "gz"];

/// One decoded measurement (raw sensor counts)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    /// Accelerometer X, Y, Z
    pub accel: [i16; 3],
    /// Die temperature
    pub temperature: i16,
    /// Gyroscope X, Y, Z
    pub gyro: [i16; 3],
}

impl Sample {
    /// Decode a measurement block
    pub fn from_block(block: &MeasurementBlock) -> Self {
        let channel = |i: usize| i16::from_be_bytes([block[2 * i], block[2 * i + 1]]);

        Self {
            accel: [channel(0), channel(1), channel(2)],
            temperature: channel(3),
            gyro: [channel(4), channel(5), channel(6)],
        }
    }

    /// Decode a datagram payload, rejecting anything but a full block
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let block: &MeasurementBlock = bytes.try_into().ok()?;
        Some(Self::from_block(block))
    }

    /// Encode back into wire order
    pub fn to_block(&self) -> MeasurementBlock {
        let mut block = [0u8; MEASUREMENT_LEN];
        for (i, value) in self.channels().iter().enumerate() {
            block[2 * i..2 * i + 2].copy_from_slice(&value.to_be_bytes());
        }
        block
    }

    /// All channels in wire order
    pub fn channels(&self) -> [i16; CHANNELS] {
        [
            self.accel[0],
            self.accel[1],
            self.accel[2],
            self.temperature,
            self.gyro[0],
            self.gyro[1],
            self.gyro[2],
        ]
    }

    /// Die temperature in °C (datasheet: raw / 340 + 36.53)
    pub fn temperature_celsius(&self) -> f32 {
        self.temperature as f32 / 340.0 + 36.53
    }

    /// Accelerometer scaled to [-1, 1] of full range
    pub fn accel_normalized(&self) -> [f32; 3] {
        self.accel.map(normalize)
    }

    /// Gyroscope scaled to [-1, 1] of full range
    pub fn gyro_normalized(&self) -> [f32; 3] {
        self.gyro.map(normalize)
    }
}

impl From<&MeasurementBlock> for Sample {
    fn from(block: &MeasurementBlock) -> Self {
        Self::from_block(block)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.channels();
        write!(
            f,
            "{:6} {:6} {:6} {:6} {:6} {:6} {:6}",
            c[0], c[1], c[2], c[3], c[4], c[5], c[6]
        )
    }
}

/// Scale a raw count so that both ends of the i16 range map to ±1.0
pub fn normalize(raw: i16) -> f32 {
    if raw < 0 {
        raw as f32 / 32768.0
    } else {
        raw as f32 / 32767.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reference_block() {
        let block = [
            0x00, 0x01, 0xFF, 0xFF, 0x7F, 0xFF, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x02,
        ];
        let sample = Sample::from_block(&block);
        assert_eq!(sample.channels(), [1, -1, 32767, 0, -32768, 0, 2]);
        assert_eq!(sample.accel, [1, -1, 32767]);
        assert_eq!(sample.temperature, 0);
        assert_eq!(sample.gyro, [-32768, 0, 2]);
    }

    #[test]
    fn test_to_block_matches_wire_order() {
        let sample = Sample {
            accel: [0x0102, -2, 0],
            temperature: -340,
            gyro: [0x7F00, 1, -32768],
        };
        let block = sample.to_block();
        assert_eq!(&block[0..2], &[0x01, 0x02]);
        assert_eq!(&block[2..4], &[0xFF, 0xFE]);
        assert_eq!(&block[12..14], &[0x80, 0x00]);
        assert_eq!(Sample::from_block(&block), sample);
    }

    #[test]
    fn test_from_bytes_length_check() {
        assert!(Sample::from_bytes(&[0u8; 13]).is_none());
        assert!(Sample::from_bytes(&[0u8; 15]).is_none());
        assert_eq!(Sample::from_bytes(&[0u8; 14]), Some(Sample::default()));
    }

    #[test]
    fn test_normalize_full_range() {
        assert_eq!(normalize(i16::MIN), -1.0);
        assert_eq!(normalize(i16::MAX), 1.0);
        assert_eq!(normalize(0), 0.0);
        assert!((normalize(16384) - 0.50002).abs() < 1e-4);
    }

    #[test]
    fn test_temperature_celsius() {
        let sample = Sample {
            temperature: -521,
            ..Default::default()
        };
        // -521 / 340 + 36.53 ≈ 35.0 °C
        assert!((sample.temperature_celsius() - 34.998).abs() < 0.01);
    }

    #[test]
    fn test_display_columns() {
        let sample = Sample::from_block(&[
            0x00, 0x01, 0xFF, 0xFF, 0x7F, 0xFF, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x02,
        ]);
        assert_eq!(
            sample.to_string(),
            "     1     -1  32767      0 -32768      0      2"
        );
    }
}

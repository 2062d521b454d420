//! Telemetry transport abstraction

use crate::sample::MeasurementBlock;

/// Transport failures
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// `open` was never called or failed
    #[error("transport not initialized")]
    NotInitialized,

    /// Socket-level failure
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for measurement blocks
///
/// One call to `send` is one datagram carrying exactly the 14 raw bytes.
pub trait TelemetrySink {
    /// Acquire transport resources; called once during boot
    fn open(&mut self) -> Result<(), SendError> {
        Ok(())
    }

    /// Transmit one block, fire and forget
    fn send(&mut self, block: &MeasurementBlock) -> Result<(), SendError>;
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Box<T> {
    fn open(&mut self) -> Result<(), SendError> {
        (**self).open()
    }

    fn send(&mut self, block: &MeasurementBlock) -> Result<(), SendError> {
        (**self).send(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting(usize);

    impl TelemetrySink for Counting {
        fn send(&mut self, _block: &MeasurementBlock) -> Result<(), SendError> {
            self.0 += 1;
            Ok(())
        }
    }

    #[test]
    fn test_default_open_succeeds() {
        let mut sink = Counting(0);
        assert!(sink.open().is_ok());
    }

    #[test]
    fn test_boxed_sink_forwards() {
        let mut sink: Box<Counting> = Box::new(Counting(0));
        sink.send(&[0u8; 14]).unwrap();
        sink.send(&[0u8; 14]).unwrap();
        assert_eq!(sink.0, 2);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            SendError::NotInitialized.to_string(),
            "transport not initialized"
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "no route");
        assert_eq!(SendError::from(io).to_string(), "transport error: no route");
    }
}

/// UDP telemetry streaming
/// One datagram per measurement block, fire and forget
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use imu_telemetry::{MeasurementBlock, SendError, TelemetrySink};
use log::info;

pub struct UdpTelemetryStream {
    socket: Option<UdpSocket>,
    server_addr: &'static str,
    destination: Option<SocketAddr>,
}

impl UdpTelemetryStream {
    pub fn new(server_addr: &'static str) -> Self {
        info!("UDP telemetry client created for: {}", server_addr);

        Self {
            socket: None,
            server_addr,
            destination: None,
        }
    }
}

impl TelemetrySink for UdpTelemetryStream {
    /// Bind to any available port and resolve the destination once
    fn open(&mut self) -> Result<(), SendError> {
        info!("Initializing UDP socket for {}", self.server_addr);

        let destination = self.server_addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "UDP_SERVER resolved to nothing")
        })?;

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(false)?;

        self.socket = Some(socket);
        self.destination = Some(destination);
        info!("UDP socket ready");

        Ok(())
    }

    fn send(&mut self, block: &MeasurementBlock) -> Result<(), SendError> {
        match (&self.socket, self.destination) {
            (Some(socket), Some(destination)) => {
                socket.send_to(block, destination)?;
                Ok(())
            }
            _ => Err(SendError::NotInitialized),
        }
    }
}

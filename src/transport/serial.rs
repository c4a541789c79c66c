//! Serial transport for USB/UART vocoder dongles (ThumbDV, DV3000 boards)
//!
//! Reads use a very short port timeout so that an idle line shows up as
//! `Ok(0)`; the packet reader decides how long to keep polling.

use super::{SerialSpeed, Transport};
use crate::constants::SERIAL_READ_TIMEOUT_MS;
use crate::error::{DvError, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// Serial transport
///
/// # Example
///
/// ```ignore
/// let transport = SerialTransport::open("/dev/ttyUSB0", SerialSpeed::B460800)?;
/// ```
pub struct SerialTransport {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open `port_name` at `speed`, 8N1, no flow control
    pub fn open(port_name: &str, speed: SerialSpeed) -> Result<Self> {
        let map_err = |e: serialport::Error| DvError::SerialOpen {
            port: port_name.to_string(),
            source: std::io::Error::other(e.to_string()),
        };

        let port = serialport::new(port_name, speed.baud())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(SERIAL_READ_TIMEOUT_MS))
            .open()
            .map_err(map_err)?;

        info!("Opened serial device {} @ {} baud", port_name, speed.baud());

        Ok(Self {
            port_name: port_name.to_string(),
            port: Some(port),
        })
    }

    /// Device path this transport was opened on
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(DvError::Closed)
    }
}

impl Transport for SerialTransport {
    fn prepare_next_message(&mut self) -> Result<()> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port()?.read(buf) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(0)
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {
                debug!("Serial read interrupted");
                Ok(0)
            }
            Err(e) => Err(DvError::Read { source: e }),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let port = self.port()?;
        port.write_all(data)
            .and_then(|_| port.flush())
            .map_err(|e| DvError::Write { source: e })?;
        Ok(data.len())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed serial device {}", self.port_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let err = SerialTransport::open("/dev/serialdv-does-not-exist", SerialSpeed::B460800)
            .err()
            .unwrap();
        match err {
            DvError::SerialOpen { port, .. } => assert_eq!(port, "/dev/serialdv-does-not-exist"),
            other => panic!("Expected SerialOpen, got {:?}", other),
        }
    }
}

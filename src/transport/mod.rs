//! Transport abstraction for byte-level I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: How bytes reach the chip (serial line, UDP vocoder server)
//! - **Protocol**: How packets are framed and classified (see `protocol`)
//!
//! All transports are blocking and polled by the packet reader; none of them
//! spawns threads.

pub mod mock;
pub mod serial;
pub mod udp;

pub use mock::MockTransport;
pub use serial::SerialTransport;
pub use udp::UdpTransport;

use crate::error::Result;

/// Line speed presets for serial devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialSpeed {
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B76800,
    B115200,
    B230400,
    B460800,
}

impl SerialSpeed {
    /// Baud rate in bits per second
    pub fn baud(self) -> u32 {
        match self {
            Self::B1200 => 1_200,
            Self::B2400 => 2_400,
            Self::B4800 => 4_800,
            Self::B9600 => 9_600,
            Self::B19200 => 19_200,
            Self::B38400 => 38_400,
            Self::B76800 => 76_800,
            Self::B115200 => 115_200,
            Self::B230400 => 230_400,
            Self::B460800 => 460_800,
        }
    }

    /// High-speed preset used when opening a vocoder
    pub fn for_half_speed(half_speed: bool) -> Self {
        if half_speed {
            Self::B230400
        } else {
            Self::B460800
        }
    }
}

/// Trait for byte-stream / datagram transports
///
/// A transport handles:
/// - Moving raw bytes to and from the chip
/// - Staging one datagram per message for message-oriented links
///
/// A transport does NOT handle:
/// - Packet framing or resynchronization (that's the reader's job)
/// - Waiting or retry policy (that's the reader's job)
/// - Reconnection (callers close and reopen the session)
///
/// Opening is done by each implementation's constructor.
pub trait Transport: Send {
    /// Prepare the next inbound message
    ///
    /// No-op for byte streams. Datagram transports fetch one whole
    /// message here; failing to get one is an error.
    fn prepare_next_message(&mut self) -> Result<()>;

    /// Read available bytes into `buf`
    ///
    /// Returns `Ok(0)` when no data is available right now, otherwise the
    /// number of bytes delivered (possibly fewer than `buf.len()`).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write `data`, returning the number of bytes accepted
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Release the underlying device or socket
    fn close(&mut self);
}

/// Which transport an address selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Serial device path (e.g. `/dev/ttyUSB0`, `COM3`)
    Serial,
    /// Vocoder server as `ip:port`
    Udp,
}

impl TransportKind {
    /// Select the transport from the address syntax
    pub fn from_address(address: &str) -> Self {
        if address.contains(':') {
            Self::Udp
        } else {
            Self::Serial
        }
    }
}

/// Open the transport an address selects
///
/// `speed` only matters for serial devices.
pub fn open(address: &str, speed: SerialSpeed) -> Result<Box<dyn Transport>> {
    match TransportKind::from_address(address) {
        TransportKind::Udp => Ok(Box::new(UdpTransport::open(address)?)),
        TransportKind::Serial => Ok(Box::new(SerialTransport::open(address, speed)?)),
    }
}

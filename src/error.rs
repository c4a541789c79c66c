//! Centralized error types
//!
//! All errors are represented by the `DvError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, DvError>`.

use std::fmt;
use std::path::PathBuf;

/// Coarse classification of a failure
///
/// Every public operation fails with one of these; the distinction is for
/// diagnostics, callers are expected to treat them alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A transport read/write/open failed
    Transport,
    /// No classifiable response arrived within the time budget
    Timeout,
    /// A well-formed response arrived but was not the one awaited
    ProtocolMismatch,
    /// The response could not be classified
    UnrecognizedPacket,
    /// The caller misused the session (closed session, bad buffer, bad config)
    Usage,
}

/// All errors
#[derive(Debug)]
pub enum DvError {
    // === Transport ===
    /// Failed to open serial device
    SerialOpen {
        port: String,
        source: std::io::Error,
    },
    /// Failed to bind UDP socket
    UdpBind { port: u16, source: std::io::Error },
    /// Address is neither a device path nor a usable `ip:port`
    InvalidAddress {
        address: String,
        reason: &'static str,
    },
    /// Transport read failed
    Read { source: std::io::Error },
    /// Transport write failed
    Write { source: std::io::Error },
    /// Transport accepted fewer bytes than requested
    ShortWrite { written: usize, expected: usize },
    /// Datagram transport had no message to deliver
    NoMessage,
    /// Transport used after close
    Closed,

    // === Protocol ===
    /// Response did not complete in time
    Timeout { stage: &'static str },
    /// Response arrived but was not the awaited kind
    UnexpectedResponse {
        expected: &'static str,
        received: &'static str,
    },
    /// Response could not be classified
    Unrecognized,
    /// Declared packet length exceeds the receive buffer
    Oversized { length: usize, max: usize },
    /// Response payload is shorter than the frame it must carry
    Truncated { expected: usize, actual: usize },

    // === Session ===
    /// Operation requires an open session
    NotOpen,
    /// Chip never identified itself
    NotIdentified,
    /// Rate or gain reconfiguration failed (strict cache policy)
    ReconfigurationFailed { what: &'static str },
    /// Caller buffer cannot hold the frame
    BufferTooSmall { needed: usize, actual: usize },

    // === Config / IO ===
    /// Failed to read config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },
    /// File system operation failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DvError {
    /// Map the error onto the failure taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SerialOpen { .. }
            | Self::UdpBind { .. }
            | Self::InvalidAddress { .. }
            | Self::Read { .. }
            | Self::Write { .. }
            | Self::ShortWrite { .. }
            | Self::NoMessage
            | Self::Closed
            | Self::Io { .. } => ErrorKind::Transport,
            Self::Timeout { .. } | Self::NotIdentified => ErrorKind::Timeout,
            Self::UnexpectedResponse { .. }
            | Self::Truncated { .. }
            | Self::ReconfigurationFailed { .. } => ErrorKind::ProtocolMismatch,
            Self::Unrecognized | Self::Oversized { .. } => ErrorKind::UnrecognizedPacket,
            Self::NotOpen
            | Self::BufferTooSmall { .. }
            | Self::ConfigRead { .. }
            | Self::ConfigValidation { .. } => ErrorKind::Usage,
        }
    }
}

impl std::error::Error for DvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerialOpen { source, .. }
            | Self::UdpBind { source, .. }
            | Self::Read { source }
            | Self::Write { source }
            | Self::ConfigRead { source, .. }
            | Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for DvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialOpen { port, .. } => write!(f, "Cannot open serial device: {}", port),
            Self::UdpBind { port, .. } => write!(f, "Cannot bind UDP port {}", port),
            Self::InvalidAddress { address, reason } => {
                write!(f, "Invalid device address '{}': {}", address, reason)
            }
            Self::Read { source } => write!(f, "Transport read failed: {}", source),
            Self::Write { source } => write!(f, "Transport write failed: {}", source),
            Self::ShortWrite { written, expected } => {
                write!(f, "Short write: {} of {} bytes", written, expected)
            }
            Self::NoMessage => write!(f, "No message available from transport"),
            Self::Closed => write!(f, "Transport is closed"),
            Self::Timeout { stage } => write!(f, "Timed out waiting for {}", stage),
            Self::UnexpectedResponse { expected, received } => {
                write!(f, "Expected {} response, received {}", expected, received)
            }
            Self::Unrecognized => write!(f, "Unrecognized packet"),
            Self::Oversized { length, max } => {
                write!(f, "Packet length {} exceeds maximum {}", length, max)
            }
            Self::Truncated { expected, actual } => {
                write!(f, "Truncated payload: {} of {} bytes", actual, expected)
            }
            Self::NotOpen => write!(f, "Vocoder session is not open"),
            Self::NotIdentified => write!(f, "Vocoder chip did not identify itself"),
            Self::ReconfigurationFailed { what } => {
                write!(f, "Vocoder {} reconfiguration failed", what)
            }
            Self::BufferTooSmall { needed, actual } => {
                write!(f, "Buffer too small: need {} got {}", needed, actual)
            }
            Self::ConfigRead { path, .. } => write!(f, "Cannot read config: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Io { path, .. } => write!(f, "IO error: {}", path.display()),
        }
    }
}

/// Alias for Result with DvError
pub type Result<T> = std::result::Result<T, DvError>;

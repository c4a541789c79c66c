//! SerialDV - driver for DVSI AMBE3000/3003 vocoder chips
//!
//! Translates between 8 kS/s PCM audio and compressed voice frames by
//! talking the chip's packet protocol over a serial line or a UDP
//! vocoder server.
//!
//! - `protocol`: framing, request templates, rate table, packet reader
//! - `transport`: serial, UDP and mock byte transports
//! - `controller`: session state and encode/decode orchestration

pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod transport;

pub use config::{CachePolicy, Config, LengthField, SessionConfig};
pub use controller::{AudioFrame, DvController, SessionStats};
pub use error::{DvError, ErrorKind, Result};
pub use protocol::rate::{get_nb_mbe_bits, get_nb_mbe_bytes};
pub use protocol::{RateProfile, Response};

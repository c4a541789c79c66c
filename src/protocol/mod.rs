//! AMBE3000 packet protocol
//!
//! Every message exchanged with the chip has the same shape:
//!
//! ```text
//! [0x61] [len_hi] [len_lo] [type] [payload...]
//! ```
//!
//! - `0x61`: start marker, used to resynchronize the byte stream
//! - `len`: payload length (header excluded), big-endian
//! - `type`: control (0), voice (1) or audio (2)
//! - control payloads start with a subtype byte (rate, gain, product id, ready)
//!
//! Split in three parts:
//! - **rate**: the static rate profile table
//! - **catalog**: request templates and outbound packet builders
//! - **reader**: inbound framing, resynchronization and classification

pub mod catalog;
pub mod rate;
pub mod reader;

pub use catalog::ByteOrder;
pub use rate::RateProfile;
pub use reader::PacketReader;

/// Start marker of every packet
pub const START_BYTE: u8 = 0x61;

/// Marker + length (2) + type
pub const HEADER_LEN: usize = 4;

/// Header + field id + bit/sample count, ahead of voice and audio data
pub const DATA_HEADER_LEN: usize = 6;

// Packet types
pub const TYPE_CONTROL: u8 = 0x00;
pub const TYPE_VOICE: u8 = 0x01;
pub const TYPE_AUDIO: u8 = 0x02;

// Control subtypes
pub const CONTROL_RATEP: u8 = 0x0A;
pub const CONTROL_GAIN: u8 = 0x4B;
pub const CONTROL_PRODID: u8 = 0x30;
pub const CONTROL_READY: u8 = 0x39;

// Data field identifiers
pub const FIELD_CHAND: u8 = 0x01;
pub const FIELD_SPEECHD: u8 = 0x00;

/// Classified response from the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Decoded audio block
    Audio,
    /// Encoded voice frame
    Voice,
    /// Product identification (string follows the subtype)
    NameInfo,
    /// Rate parameters acknowledged
    RateAck,
    /// Gain acknowledged
    GainAck,
    /// Ready notification, unknown subtype or unknown type
    Unknown,
}

impl Response {
    /// Short name for diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Voice => "voice",
            Self::NameInfo => "product id",
            Self::RateAck => "rate",
            Self::GainAck => "gain",
            Self::Unknown => "unknown",
        }
    }
}

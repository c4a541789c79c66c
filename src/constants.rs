//! Crate-wide constants
//!
//! Centralized sizes and timings shared by the protocol engine, the
//! transports and the session controller.

// =============================================================================
// Audio / voice frames
// =============================================================================

/// Samples in one 20 ms audio block at 8 kS/s
pub const AUDIO_BLOCK_SIZE: usize = 160;

/// Bytes in one audio block (16-bit samples)
pub const AUDIO_BLOCK_BYTES: usize = AUDIO_BLOCK_SIZE * 2;

/// Widest voice frame of any driven rate profile (bytes)
pub const VOICE_FRAME_MAX_BYTES: usize = 18;

// =============================================================================
// Packets
// =============================================================================

/// Largest packet the reader accepts, header included
///
/// An audio packet (4-byte header + 322 payload bytes) is the largest thing
/// the chip sends back during normal operation.
pub const MAX_PACKET_LEN: usize = 400;

/// Size of the UDP datagram staging buffer
pub const UDP_BUFFER_SIZE: usize = 2000;

// =============================================================================
// Timing
// =============================================================================

/// Default time budget for one response (milliseconds)
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 500;

/// Default delay between two empty reads (microseconds)
pub const DEFAULT_POLL_INTERVAL_US: u64 = 100;

/// Default number of responses inspected while waiting for identification
pub const DEFAULT_IDENTIFY_ATTEMPTS: u32 = 10;

/// Serial read timeout, kept short so the reader owns the wait policy (milliseconds)
pub const SERIAL_READ_TIMEOUT_MS: u64 = 1;

/// Wait for one datagram in the UDP prepare hook (milliseconds)
pub const UDP_RECEIVE_TIMEOUT_MS: u64 = 50;

/// Lowest UDP port accepted for a vocoder server
pub const MIN_UDP_PORT: u16 = 1024;

// =============================================================================
// Gain
// =============================================================================

/// Gain limit accepted by the chip, in decibels (symmetric)
pub const MAX_GAIN_DB: i32 = 90;

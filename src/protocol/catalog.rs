//! Request templates and outbound packet builders
//!
//! Templates are fixed byte strings; builders append caller data to them.
//! Audio samples always travel big-endian. The voice packet length field is
//! composed through the host byte order probe, see [`voice_packet`].

use super::{
    RateProfile, CONTROL_GAIN, CONTROL_PRODID, DATA_HEADER_LEN, FIELD_CHAND, FIELD_SPEECHD,
    START_BYTE, TYPE_AUDIO, TYPE_CONTROL, TYPE_VOICE,
};
use crate::constants::{AUDIO_BLOCK_BYTES, AUDIO_BLOCK_SIZE, MAX_GAIN_DB};
use crate::error::{DvError, Result};
use bytes::{BufMut, BytesMut};

/// Product identification query
pub const REQ_PRODID: [u8; 5] = [START_BYTE, 0x00, 0x01, TYPE_CONTROL, CONTROL_PRODID];

/// Gain request, followed by the input and output gain bytes
pub const REQ_GAIN_HEADER: [u8; 5] = [START_BYTE, 0x00, 0x03, TYPE_CONTROL, CONTROL_GAIN];

/// Audio packet header: 322 payload bytes, SPEECHD field, 160 samples
pub const AUDIO_HEADER: [u8; DATA_HEADER_LEN] =
    [START_BYTE, 0x01, 0x42, TYPE_AUDIO, FIELD_SPEECHD, 0xA0];

/// Voice packet header template; length and bit count are patched per rate
pub const VOICE_HEADER: [u8; DATA_HEADER_LEN] =
    [START_BYTE, 0x00, 0x0B, TYPE_VOICE, FIELD_CHAND, 0x48];

/// Full audio packet length
pub const AUDIO_PACKET_LEN: usize = DATA_HEADER_LEN + AUDIO_BLOCK_BYTES;

/// Byte order of the machine running the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Probe the host byte order
    pub const fn host() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }
}

/// Clamp a gain to what the chip accepts, as a wire byte
pub fn clamp_gain(db: i32) -> i8 {
    db.clamp(-MAX_GAIN_DB, MAX_GAIN_DB) as i8
}

/// Gain request with both gains clamped to [-90, +90] dB
pub fn gain_request(in_db: i32, out_db: i32) -> [u8; 7] {
    let mut req = [0u8; 7];
    req[..5].copy_from_slice(&REQ_GAIN_HEADER);
    req[5] = clamp_gain(in_db) as u8;
    req[6] = clamp_gain(out_db) as u8;
    req
}

/// Audio packet carrying one block of samples
pub fn audio_packet(samples: &[i16; AUDIO_BLOCK_SIZE]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(AUDIO_PACKET_LEN);
    buf.put_slice(&AUDIO_HEADER);
    for &sample in samples {
        buf.put_i16(sample);
    }
    buf
}

/// Voice packet carrying one frame at `rate`
///
/// The length field is stored host-native. On little-endian hosts the value
/// is byte-swapped first, so the chip always sees it big-endian.
/// Fails with `BufferTooSmall` when `voice` is narrower than the rate's frame.
pub fn voice_packet(voice: &[u8], rate: RateProfile, order: ByteOrder) -> Result<BytesMut> {
    let nbytes = rate.voice_bytes();
    let frame = voice
        .get(..nbytes as usize)
        .ok_or(DvError::BufferTooSmall {
            needed: nbytes as usize,
            actual: voice.len(),
        })?;
    let length = 2 + nbytes;
    let field = match order {
        ByteOrder::Little => length.swap_bytes(),
        ByteOrder::Big => length,
    };

    let mut buf = BytesMut::with_capacity(DATA_HEADER_LEN + nbytes as usize);
    buf.put_slice(&VOICE_HEADER);
    buf[1..3].copy_from_slice(&field.to_ne_bytes());
    buf[5] = rate.voice_bits();
    buf.put_slice(frame);
    Ok(buf)
}

/// Unpack big-endian samples from an audio packet payload
///
/// `data` starts at the first sample and must hold a full block.
pub fn unpack_audio(data: &[u8], out: &mut [i16; AUDIO_BLOCK_SIZE]) {
    for (sample, word) in out.iter_mut().zip(data.chunks_exact(2)) {
        *sample = i16::from_be_bytes([word[0], word[1]]);
    }
}

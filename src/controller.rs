//! Vocoder session controller
//!
//! Owns one transport and one packet reader, and tracks what the chip is
//! currently configured for. Rate and gain are reconfigured lazily: a frame
//! requested at a different rate or gain first sends the matching request,
//! then the frame itself.
//!
//! The controller does NOT handle:
//! - Reconnection (callers `close()` and `open()` again after failures)
//! - Concurrent use (one controller per chip, `&mut self` everywhere)

use crate::config::{CachePolicy, SessionConfig};
use crate::constants::{AUDIO_BLOCK_BYTES, AUDIO_BLOCK_SIZE};
use crate::error::{DvError, Result};
use crate::protocol::catalog::{self, REQ_PRODID};
use crate::protocol::{
    ByteOrder, PacketReader, RateProfile, Response, DATA_HEADER_LEN, HEADER_LEN,
};
use crate::transport::{self, SerialSpeed, Transport};
use tracing::{debug, info, warn};

/// Offset of voice/audio data inside a response payload (field id + count)
const DATA_OFFSET: usize = DATA_HEADER_LEN - HEADER_LEN;

/// One 20 ms block of 8 kS/s audio
pub type AudioFrame = [i16; AUDIO_BLOCK_SIZE];

/// Counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_encoded: u64,
    pub frames_decoded: u64,
    pub rate_requests: u64,
    pub gain_requests: u64,
    pub failed_exchanges: u64,
}

/// What the controller believes the chip is configured for
#[derive(Debug, Clone)]
struct SessionState {
    open: bool,
    rate: RateProfile,
    gain_in: i32,
    gain_out: i32,
    product_name: Option<String>,
}

impl SessionState {
    fn closed() -> Self {
        Self {
            open: false,
            rate: RateProfile::None,
            gain_in: 0,
            gain_out: 0,
            product_name: None,
        }
    }
}

/// Session controller for one AMBE3000 chip
///
/// # Example
///
/// ```ignore
/// let mut dv = DvController::default();
/// dv.open("/dev/ttyUSB0", false)?;
///
/// let mut voice = [0u8; VOICE_FRAME_MAX_BYTES];
/// let n = dv.encode(&audio, &mut voice, RateProfile::Rate3600x2450, 0)?;
/// dv.decode(&voice[..n], &mut audio, RateProfile::Rate3600x2450, 0)?;
/// ```
pub struct DvController {
    transport: Option<Box<dyn Transport>>,
    reader: PacketReader,
    config: SessionConfig,
    state: SessionState,
    host_order: ByteOrder,
    stats: SessionStats,
}

impl Default for DvController {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl DvController {
    /// Create a closed controller
    pub fn new(config: SessionConfig) -> Self {
        Self {
            transport: None,
            reader: PacketReader::new(
                config.response_timeout(),
                config.poll_interval(),
                config.length_field,
            ),
            config,
            state: SessionState::closed(),
            host_order: ByteOrder::host(),
            stats: SessionStats::default(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open the device at `address` and wait for the chip to identify itself
    ///
    /// `ip:port` addresses select the UDP transport, anything else a serial
    /// device at 460800 baud (230400 with `half_speed`).
    ///
    /// Opening starts a new session: cached rate, gains and stats are reset,
    /// so the first frames after a reopen send rate and gain requests again.
    pub fn open(&mut self, address: &str, half_speed: bool) -> Result<()> {
        self.close();
        let transport = transport::open(address, SerialSpeed::for_half_speed(half_speed))?;
        self.attach(transport)
    }

    /// Run the identification handshake over an already open transport
    ///
    /// On failure the transport is closed and the session stays closed.
    /// On success the session starts from [`RateProfile::None`] and 0 dB gains.
    pub fn attach(&mut self, mut transport: Box<dyn Transport>) -> Result<()> {
        self.close();

        match self.identify(transport.as_mut()) {
            Ok(name) => {
                info!("Vocoder chip identified as: {}", name);
                self.transport = Some(transport);
                self.state = SessionState {
                    open: true,
                    product_name: Some(name),
                    ..SessionState::closed()
                };
                self.stats = SessionStats::default();
                Ok(())
            }
            Err(e) => {
                warn!("Vocoder identification failed: {}", e);
                transport.close();
                Err(e)
            }
        }
    }

    /// Release the transport; always leaves the session closed
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.state.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.state.open
    }

    fn identify(&mut self, transport: &mut dyn Transport) -> Result<String> {
        send(transport, &REQ_PRODID)?;

        for _ in 0..self.config.identify_attempts {
            match self.reader.receive(transport)? {
                Response::NameInfo => return Ok(self.reader.product_name().unwrap_or_default()),
                other => debug!("Ignoring {} response while identifying", other.name()),
            }
        }

        Err(DvError::NotIdentified)
    }

    // =========================================================================
    // Reconfiguration
    // =========================================================================

    /// Put the chip in `rate`; [`RateProfile::None`] is a no-op
    pub fn set_rate(&mut self, rate: RateProfile) -> Result<()> {
        self.ensure_open()?;
        self.request_rate(rate)?;
        self.state.rate = rate;
        Ok(())
    }

    /// Set input and output gains, each clamped to [-90, +90] dB
    pub fn set_gain(&mut self, in_db: i32, out_db: i32) -> Result<()> {
        self.ensure_open()?;
        self.request_gain(in_db, out_db)?;
        self.state.gain_in = in_db;
        self.state.gain_out = out_db;
        Ok(())
    }

    fn request_rate(&mut self, rate: RateProfile) -> Result<()> {
        let Some(request) = rate.request() else {
            return Ok(());
        };
        debug!("Requesting rate {:?}", rate);
        self.stats.rate_requests += 1;
        self.await_response(&request, Response::RateAck)
    }

    fn request_gain(&mut self, in_db: i32, out_db: i32) -> Result<()> {
        debug!("Requesting gain in={}dB out={}dB", in_db, out_db);
        self.stats.gain_requests += 1;
        self.await_response(&catalog::gain_request(in_db, out_db), Response::GainAck)
    }

    /// Bring the cached rate to `rate`, honouring the cache policy
    fn apply_rate(&mut self, rate: RateProfile) -> Result<()> {
        if rate == self.state.rate {
            return Ok(());
        }
        let result = self.request_rate(rate);
        if let Err(e) = &result {
            warn!("Rate change to {:?} failed: {}", rate, e);
        }
        self.commit(result, "rate", |state| state.rate = rate)
    }

    fn apply_gain_in(&mut self, gain: i32) -> Result<()> {
        if gain == self.state.gain_in {
            return Ok(());
        }
        let result = self.request_gain(gain, self.state.gain_out);
        if let Err(e) = &result {
            warn!("Input gain change to {}dB failed: {}", gain, e);
        }
        self.commit(result, "gain", |state| state.gain_in = gain)
    }

    fn apply_gain_out(&mut self, gain: i32) -> Result<()> {
        if gain == self.state.gain_out {
            return Ok(());
        }
        let result = self.request_gain(self.state.gain_in, gain);
        if let Err(e) = &result {
            warn!("Output gain change to {}dB failed: {}", gain, e);
        }
        self.commit(result, "gain", |state| state.gain_out = gain)
    }

    fn commit(
        &mut self,
        result: Result<()>,
        what: &'static str,
        update: impl FnOnce(&mut SessionState),
    ) -> Result<()> {
        match (self.config.cache_policy, result) {
            (CachePolicy::Always, _) | (CachePolicy::OnSuccess, Ok(())) => {
                update(&mut self.state);
                Ok(())
            }
            (CachePolicy::OnSuccess, Err(_)) => Err(DvError::ReconfigurationFailed { what }),
        }
    }

    // =========================================================================
    // Frames
    // =========================================================================

    /// Encode one audio block into a voice frame at `rate`
    ///
    /// Returns the number of bytes written to `voice` (the rate's frame width).
    pub fn encode(
        &mut self,
        audio: &AudioFrame,
        voice: &mut [u8],
        rate: RateProfile,
        gain_db: i32,
    ) -> Result<usize> {
        self.ensure_open()?;
        let nbytes = rate.voice_bytes() as usize;
        if voice.len() < nbytes {
            return Err(DvError::BufferTooSmall {
                needed: nbytes,
                actual: voice.len(),
            });
        }

        self.apply_rate(rate)?;
        self.apply_gain_in(gain_db)?;

        let packet = catalog::audio_packet(audio);
        let result = self.await_response(&packet, Response::Voice).and_then(|_| {
            let data = self.frame_data(nbytes)?;
            voice[..nbytes].copy_from_slice(data);
            Ok(nbytes)
        });

        match result {
            Ok(n) => {
                self.stats.frames_encoded += 1;
                Ok(n)
            }
            Err(e) => Err(self.exchange_failed("encode", e)),
        }
    }

    /// Decode one voice frame at `rate` into an audio block
    pub fn decode(
        &mut self,
        voice: &[u8],
        audio: &mut AudioFrame,
        rate: RateProfile,
        gain_db: i32,
    ) -> Result<()> {
        self.ensure_open()?;
        let nbytes = rate.voice_bytes() as usize;
        if voice.len() < nbytes {
            return Err(DvError::BufferTooSmall {
                needed: nbytes,
                actual: voice.len(),
            });
        }

        self.apply_rate(rate)?;
        self.apply_gain_out(gain_db)?;

        let packet = catalog::voice_packet(voice, rate, self.host_order)?;
        let result = self.await_response(&packet, Response::Audio).and_then(|_| {
            let data = self.frame_data(AUDIO_BLOCK_BYTES)?;
            catalog::unpack_audio(data, audio);
            Ok(())
        });

        match result {
            Ok(()) => {
                self.stats.frames_decoded += 1;
                Ok(())
            }
            Err(e) => Err(self.exchange_failed("decode", e)),
        }
    }

    fn exchange_failed(&mut self, what: &str, e: DvError) -> DvError {
        self.stats.failed_exchanges += 1;
        warn!("Vocoder {} failed: {}", what, e);
        e
    }

    /// `len` data bytes of the last response, after field id and count
    fn frame_data(&self, len: usize) -> Result<&[u8]> {
        let payload = self.reader.payload();
        payload
            .get(DATA_OFFSET..DATA_OFFSET + len)
            .ok_or(DvError::Truncated {
                expected: len,
                actual: payload.len().saturating_sub(DATA_OFFSET),
            })
    }

    // =========================================================================
    // Exchange
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.state.open && self.transport.is_some() {
            Ok(())
        } else {
            Err(DvError::NotOpen)
        }
    }

    /// Send `request` and require `expected` back
    fn await_response(&mut self, request: &[u8], expected: Response) -> Result<()> {
        let transport = self.transport.as_deref_mut().ok_or(DvError::NotOpen)?;
        send(transport, request)?;

        match self.reader.receive(transport)? {
            got if got == expected => Ok(()),
            Response::Unknown => Err(DvError::Unrecognized),
            got => Err(DvError::UnexpectedResponse {
                expected: expected.name(),
                received: got.name(),
            }),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Identification string reported by the chip when the session opened
    pub fn product_name(&self) -> Option<&str> {
        self.state.product_name.as_deref()
    }

    pub fn current_rate(&self) -> RateProfile {
        self.state.rate
    }

    /// Cached (input, output) gains in dB
    pub fn current_gains(&self) -> (i32, i32) {
        (self.state.gain_in, self.state.gain_out)
    }

    /// Voice frame width in bytes at the current rate
    pub fn voice_bytes(&self) -> u16 {
        self.state.rate.voice_bytes()
    }

    /// Voice frame width in bits at the current rate
    pub fn voice_bits(&self) -> u8 {
        self.state.rate.voice_bits()
    }

    pub fn host_byte_order(&self) -> ByteOrder {
        self.host_order
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Drop for DvController {
    fn drop(&mut self) {
        self.close();
    }
}

/// Write all of `data` or fail
fn send(transport: &mut dyn Transport, data: &[u8]) -> Result<()> {
    let written = transport.write(data)?;
    if written != data.len() {
        return Err(DvError::ShortWrite {
            written,
            expected: data.len(),
        });
    }
    Ok(())
}

//! Packet reader: one classified response per call
//!
//! The reader owns a fixed receive buffer sized to [`MAX_PACKET_LEN`] and
//! polls a blocking [`Transport`] until a full packet is in, the transport
//! fails, or the deadline passes. Bytes ahead of the start marker are
//! dropped, which resynchronizes the stream after noise or a lost packet.
//!
//! One deadline covers the whole packet (marker, header, payload).

use super::{
    Response, CONTROL_GAIN, CONTROL_PRODID, CONTROL_RATEP, HEADER_LEN, START_BYTE, TYPE_AUDIO,
    TYPE_CONTROL, TYPE_VOICE,
};
use crate::config::LengthField;
use crate::constants::MAX_PACKET_LEN;
use crate::error::{DvError, Result};
use crate::transport::Transport;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Offset of the identification string in a product id response
const PRODID_NAME_OFFSET: usize = HEADER_LEN + 1;

/// Packet reader with its receive buffer
pub struct PacketReader {
    buf: Box<[u8; MAX_PACKET_LEN]>,
    /// Bytes of the current packet held in `buf`
    len: usize,
    timeout: Duration,
    poll_interval: Duration,
    length_field: LengthField,
}

impl PacketReader {
    /// Create a reader with a per-packet `timeout`
    ///
    /// `poll_interval` is the pause after a read that returned nothing.
    pub fn new(timeout: Duration, poll_interval: Duration, length_field: LengthField) -> Self {
        Self {
            buf: Box::new([0u8; MAX_PACKET_LEN]),
            len: 0,
            timeout,
            poll_interval,
            length_field,
        }
    }

    /// Receive and classify one packet
    ///
    /// Transport failures and an exhausted deadline are errors; anything
    /// that frames correctly is classified, possibly as [`Response::Unknown`].
    pub fn receive(&mut self, transport: &mut dyn Transport) -> Result<Response> {
        self.len = 0;
        transport.prepare_next_message()?;

        let deadline = Instant::now() + self.timeout;

        self.sync(transport, deadline)?;
        self.fill(transport, HEADER_LEN, deadline, "packet header")?;

        let payload_len = self.length_field.decode(self.buf[1], self.buf[2]);
        let total = HEADER_LEN + payload_len;
        if total > MAX_PACKET_LEN {
            return Err(DvError::Oversized {
                length: total,
                max: MAX_PACKET_LEN,
            });
        }

        self.fill(transport, total, deadline, "packet payload")?;

        let response = self.classify();
        trace!("Received {} packet ({} bytes)", response.name(), total);
        Ok(response)
    }

    /// The last packet received, header included
    pub fn packet(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Payload of the last packet (everything after the 4-byte header)
    pub fn payload(&self) -> &[u8] {
        if self.len < HEADER_LEN {
            return &[];
        }
        &self.buf[HEADER_LEN..self.len]
    }

    /// Identification string of the last product id response
    ///
    /// The string is NUL terminated on the wire; anything after the
    /// terminator is ignored.
    pub fn product_name(&self) -> Option<String> {
        if self.len <= PRODID_NAME_OFFSET {
            return None;
        }
        let raw = &self.buf[PRODID_NAME_OFFSET..self.len];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Some(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    /// Drop bytes until the start marker
    fn sync(&mut self, transport: &mut dyn Transport, deadline: Instant) -> Result<()> {
        let mut skipped = 0usize;
        let mut byte = [0u8; 1];

        loop {
            if transport.read(&mut byte)? == 0 {
                self.wait(deadline, "start marker")?;
                continue;
            }

            if byte[0] == START_BYTE {
                if skipped > 0 {
                    debug!("Skipped {} bytes before start marker", skipped);
                }
                self.buf[0] = START_BYTE;
                self.len = 1;
                return Ok(());
            }

            skipped += 1;
            if Instant::now() >= deadline {
                debug!("No start marker after {} bytes", skipped);
                return Err(DvError::Timeout {
                    stage: "start marker",
                });
            }
        }
    }

    /// Accumulate reads until `target` bytes are buffered
    fn fill(
        &mut self,
        transport: &mut dyn Transport,
        target: usize,
        deadline: Instant,
        stage: &'static str,
    ) -> Result<()> {
        while self.len < target {
            let n = transport.read(&mut self.buf[self.len..target])?;
            if n == 0 {
                self.wait(deadline, stage)?;
            } else {
                self.len += n;
            }
        }
        Ok(())
    }

    /// Sleep one poll interval, or fail if the deadline has passed
    fn wait(&self, deadline: Instant, stage: &'static str) -> Result<()> {
        let now = Instant::now();
        if now >= deadline {
            return Err(DvError::Timeout { stage });
        }
        std::thread::sleep(self.poll_interval.min(deadline - now));
        Ok(())
    }

    fn classify(&self) -> Response {
        match self.buf[3] {
            TYPE_AUDIO => Response::Audio,
            TYPE_VOICE => Response::Voice,
            TYPE_CONTROL => match self.payload().first() {
                Some(&CONTROL_PRODID) => Response::NameInfo,
                Some(&CONTROL_RATEP) => Response::RateAck,
                Some(&CONTROL_GAIN) => Response::GainAck,
                Some(&other) => {
                    debug!("Control packet with subtype 0x{:02X}", other);
                    Response::Unknown
                }
                None => Response::Unknown,
            },
            other => {
                debug!("Packet with unknown type 0x{:02X}", other);
                Response::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CONTROL_READY;
    use crate::transport::MockTransport;

    fn reader() -> PacketReader {
        PacketReader::new(
            Duration::from_millis(20),
            Duration::from_micros(50),
            LengthField::Full,
        )
    }

    fn packet(ptype: u8, payload: &[u8]) -> Vec<u8> {
        let len = payload.len() as u16;
        let mut pkt = vec![START_BYTE, (len >> 8) as u8, len as u8, ptype];
        pkt.extend_from_slice(payload);
        pkt
    }

    fn receive(bytes: &[u8]) -> (PacketReader, Result<Response>) {
        let mock = MockTransport::new();
        mock.inject(bytes);
        let mut t = mock.clone();
        let mut r = reader();
        let res = r.receive(&mut t);
        (r, res)
    }

    #[test]
    fn test_classify_audio_and_voice() {
        let (_, res) = receive(&packet(TYPE_AUDIO, &[0x00, 0xA0, 1, 2]));
        assert_eq!(res.unwrap(), Response::Audio);

        let (r, res) = receive(&packet(TYPE_VOICE, &[0x01, 0x48, 7, 8, 9]));
        assert_eq!(res.unwrap(), Response::Voice);
        assert_eq!(r.payload(), &[0x01, 0x48, 7, 8, 9]);
    }

    #[test]
    fn test_classify_control() {
        let (_, res) = receive(&packet(TYPE_CONTROL, &[CONTROL_RATEP, 0x00]));
        assert_eq!(res.unwrap(), Response::RateAck);

        let (_, res) = receive(&packet(TYPE_CONTROL, &[CONTROL_GAIN, 0x00]));
        assert_eq!(res.unwrap(), Response::GainAck);

        let (_, res) = receive(&packet(TYPE_CONTROL, &[CONTROL_READY]));
        assert_eq!(res.unwrap(), Response::Unknown);

        let (_, res) = receive(&packet(TYPE_CONTROL, &[]));
        assert_eq!(res.unwrap(), Response::Unknown);

        let (_, res) = receive(&packet(0x07, &[1, 2]));
        assert_eq!(res.unwrap(), Response::Unknown);
    }

    #[test]
    fn test_product_name() {
        let mut payload = vec![CONTROL_PRODID];
        payload.extend_from_slice(b"AMBE3000R\0");
        let (r, res) = receive(&packet(TYPE_CONTROL, &payload));

        assert_eq!(res.unwrap(), Response::NameInfo);
        assert_eq!(r.product_name().as_deref(), Some("AMBE3000R"));
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut bytes = vec![0x00, 0xFF, 0x12, 0x60, 0x62];
        bytes.extend(packet(TYPE_VOICE, &[0x01, 0x48, 0xAB]));
        let (r, res) = receive(&bytes);

        assert_eq!(res.unwrap(), Response::Voice);
        assert_eq!(r.packet()[0], START_BYTE);
        assert_eq!(r.payload(), &[0x01, 0x48, 0xAB]);
    }

    #[test]
    fn test_partial_reads_accumulate() {
        let mock = MockTransport::new();
        mock.inject(&packet(TYPE_AUDIO, &[0u8; 322]));
        mock.set_read_chunk(3);
        let mut t = mock.clone();
        let mut r = reader();

        assert_eq!(r.receive(&mut t).unwrap(), Response::Audio);
        assert_eq!(r.packet().len(), 326);
    }

    #[test]
    fn test_empty_line_times_out() {
        let (_, res) = receive(&[]);
        assert!(matches!(
            res,
            Err(DvError::Timeout {
                stage: "start marker"
            })
        ));
    }

    #[test]
    fn test_truncated_payload_times_out() {
        let mut bytes = packet(TYPE_VOICE, &[0x01, 0x48, 1, 2, 3]);
        bytes.truncate(6);
        let (_, res) = receive(&bytes);
        assert!(matches!(
            res,
            Err(DvError::Timeout {
                stage: "packet payload"
            })
        ));
    }

    #[test]
    fn test_read_error_propagates() {
        let mock = MockTransport::new();
        mock.inject(&packet(TYPE_AUDIO, &[0, 0]));
        mock.fail_reads(true);
        let mut t = mock.clone();

        assert!(matches!(reader().receive(&mut t), Err(DvError::Read { .. })));
    }

    #[test]
    fn test_prepare_failure_is_immediate() {
        let mock = MockTransport::new();
        mock.inject(&packet(TYPE_AUDIO, &[0, 0]));
        mock.fail_prepare(true);
        let mut t = mock.clone();

        assert!(matches!(reader().receive(&mut t), Err(DvError::NoMessage)));
    }

    #[test]
    fn test_oversized_rejected() {
        let (_, res) = receive(&[START_BYTE, 0x10, 0x00, TYPE_AUDIO]);
        assert!(matches!(res, Err(DvError::Oversized { .. })));
    }

    #[test]
    fn test_masked_length_field() {
        // High nibble is noise under the legacy mask
        let mut bytes = vec![START_BYTE, 0xF0, 0x02, TYPE_CONTROL, CONTROL_RATEP, 0x00];
        bytes.extend_from_slice(&[0xEE; 4]);

        let mock = MockTransport::new();
        mock.inject(&bytes);
        let mut t = mock.clone();
        let mut r = PacketReader::new(
            Duration::from_millis(20),
            Duration::from_micros(50),
            LengthField::Masked,
        );

        assert_eq!(r.receive(&mut t).unwrap(), Response::RateAck);
        assert_eq!(r.packet().len(), 6);
    }
}

//! Mock transport for deterministic testing of the protocol engine.
//!
//! [`MockTransport`] stands in for a vocoder chip: replies are queued up
//! front and one reply is released into the read stream per `write()`.
//! Failures can be induced on any operation, and reads can be chopped into
//! small chunks to exercise partial-read handling.
//!
//! The handle is cheaply cloneable; clones share state, so a test can keep
//! one clone to inspect the write log after handing the other to a
//! controller.
//!
//! # Example
//!
//! ```
//! use serialdv::transport::{MockTransport, Transport};
//!
//! let mock = MockTransport::new();
//! mock.reply(&[0x61, 0x00, 0x01, 0x00, 0x39]);
//!
//! let mut transport = mock.clone();
//! transport.write(&[0x61, 0x00, 0x01, 0x00, 0x30]).unwrap();
//! let mut buf = [0u8; 8];
//! assert_eq!(transport.read(&mut buf).unwrap(), 5);
//! assert_eq!(mock.sent().len(), 1);
//! ```

use super::Transport;
use crate::error::{DvError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MockState {
    /// Replies released one per write, in order
    replies: VecDeque<Vec<u8>>,
    /// Bytes waiting to be read
    incoming: VecDeque<u8>,
    /// Log of every write
    sent: Vec<Vec<u8>>,
    /// Largest number of bytes returned by one read (0 = unlimited)
    read_chunk: usize,
    fail_reads: bool,
    fail_writes: bool,
    fail_prepare: bool,
    prepare_calls: usize,
    closed: bool,
}

/// A scripted [`Transport`] for testing without hardware.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create an idle mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply released by the next unanswered write
    pub fn reply(&self, bytes: &[u8]) {
        self.state.lock().replies.push_back(bytes.to_vec());
    }

    /// Make bytes readable immediately, ahead of any reply
    pub fn inject(&self, bytes: &[u8]) {
        self.state.lock().incoming.extend(bytes.iter().copied());
    }

    /// Limit every read to at most `chunk` bytes (0 = unlimited)
    pub fn set_read_chunk(&self, chunk: usize) {
        self.state.lock().read_chunk = chunk;
    }

    /// Make subsequent reads fail
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Make subsequent writes fail
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Make subsequent prepare hooks fail
    pub fn fail_prepare(&self, fail: bool) {
        self.state.lock().fail_prepare = fail;
    }

    /// Every write so far, one entry per call
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent.clone()
    }

    /// Forget the write log
    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    /// Replies not yet released
    pub fn pending_replies(&self) -> usize {
        self.state.lock().replies.len()
    }

    /// Number of prepare hook invocations
    pub fn prepare_calls(&self) -> usize {
        self.state.lock().prepare_calls
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Transport for MockTransport {
    fn prepare_next_message(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.prepare_calls += 1;
        if state.fail_prepare {
            return Err(DvError::NoMessage);
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(DvError::Closed);
        }
        if state.fail_reads {
            return Err(DvError::Read {
                source: std::io::Error::other("mock read failure"),
            });
        }

        let mut n = buf.len().min(state.incoming.len());
        if state.read_chunk > 0 {
            n = n.min(state.read_chunk);
        }
        for (slot, byte) in buf.iter_mut().zip(state.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(DvError::Closed);
        }
        if state.fail_writes {
            return Err(DvError::Write {
                source: std::io::Error::other("mock write failure"),
            });
        }

        state.sent.push(data.to_vec());
        if let Some(reply) = state.replies.pop_front() {
            state.incoming.extend(reply);
        }
        Ok(data.len())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.incoming.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_released_on_write() {
        let mock = MockTransport::new();
        mock.reply(&[1, 2, 3]);
        let mut t = mock.clone();

        let mut buf = [0u8; 8];
        assert_eq!(t.read(&mut buf).unwrap(), 0);

        t.write(&[9]).unwrap();
        assert_eq!(t.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(mock.sent(), vec![vec![9]]);
    }

    #[test]
    fn test_read_chunk() {
        let mock = MockTransport::new();
        mock.inject(&[1, 2, 3, 4, 5]);
        mock.set_read_chunk(2);
        let mut t = mock.clone();

        let mut buf = [0u8; 8];
        assert_eq!(t.read(&mut buf).unwrap(), 2);
        assert_eq!(t.read(&mut buf).unwrap(), 2);
        assert_eq!(t.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 5);
    }

    #[test]
    fn test_induced_failures() {
        let mock = MockTransport::new();
        let mut t = mock.clone();

        mock.fail_reads(true);
        assert!(t.read(&mut [0u8; 4]).is_err());
        mock.fail_writes(true);
        assert!(t.write(&[0]).is_err());
        mock.fail_prepare(true);
        assert!(t.prepare_next_message().is_err());
        assert_eq!(mock.prepare_calls(), 1);
    }

    #[test]
    fn test_closed_rejects_io() {
        let mock = MockTransport::new();
        let mut t = mock.clone();
        t.close();
        assert!(mock.is_closed());
        assert!(matches!(t.write(&[0]), Err(DvError::Closed)));
    }
}

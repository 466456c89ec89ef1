//! Test-only scripted transport.
//!
//! `mockall` covers single-call expectations well, but the protocol tests
//! need ordered multi-step conversations (ready marker, block, ack, ...),
//! which a simple scripted transport expresses more directly.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{ProgError, ProgResult};
use crate::transport::Transport;

/// In-memory transport that replays a fixed sequence of read deliveries
/// and records every write.
pub struct ScriptTransport {
    reads: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    /// When set, an exhausted read script errors like a closed port
    /// instead of reporting a timeout.
    fail_when_exhausted: bool,
}

impl ScriptTransport {
    pub fn with_reads(reads: Vec<Vec<u8>>) -> Self {
        Self {
            reads: reads.into(),
            writes: Vec::new(),
            fail_when_exhausted: false,
        }
    }

    pub fn failing_when_exhausted(mut self) -> Self {
        self.fail_when_exhausted = true;
        self
    }

    /// Every `write` call made against this transport, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// All written bytes, flattened.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

impl Transport for ScriptTransport {
    fn write(&mut self, data: &[u8]) -> ProgResult<()> {
        self.writes.push(data.to_vec());
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8], _timeout: Duration) -> ProgResult<usize> {
        let Some(mut chunk) = self.reads.pop_front() else {
            if self.fail_when_exhausted {
                return Err(ProgError::Io(std::io::Error::from(
                    std::io::ErrorKind::UnexpectedEof,
                )));
            }
            return Ok(0);
        };

        // A delivery larger than the caller's buffer is split; the rest
        // stays queued for the next read.
        let n = chunk.len().min(buffer.len());
        buffer[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            chunk.drain(..n);
            self.reads.push_front(chunk);
        }
        Ok(n)
    }

    fn flush(&mut self) -> ProgResult<()> {
        Ok(())
    }

    fn clear_input(&mut self) -> ProgResult<()> {
        // Scripted deliveries model future data, not pending bytes, so
        // there is nothing to drop here.
        Ok(())
    }
}

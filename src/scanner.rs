//! Marker scanning over the live device byte stream.
//!
//! The firmware interleaves human-readable log lines with the literal
//! control markers the protocol keys on (see `config.rs`). A marker can be
//! split across transport deliveries, so matching works on an accumulation
//! buffer rather than on single reads: append whatever arrives, search,
//! repeat until the marker shows up or a poll window passes with no data.

use std::time::Duration;

use crate::error::ProgResult;
use crate::transport::Transport;

/// Outcome of a marker wait.
#[derive(Debug, PartialEq, Eq)]
pub enum Scan {
    /// Marker located at this byte offset in the accumulation buffer.
    Found(usize),
    /// The poll window elapsed with no data and no match. Terminal for the
    /// operation; retry policy belongs to the protocol engine, not here.
    TimedOut,
}

/// Incremental scanner over the device output stream.
#[derive(Debug, Default)]
pub struct MarkerScanner {
    acc: Vec<u8>,
}

impl MarkerScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes delivered by the transport.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.acc.extend_from_slice(bytes);
    }

    /// Everything currently buffered.
    pub fn buffered(&self) -> &[u8] {
        &self.acc
    }

    /// Buffered bytes as text, for diagnostics in error reports.
    pub fn buffered_text(&self) -> String {
        String::from_utf8_lossy(&self.acc).into_owned()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.acc.clear();
    }

    /// Find the first occurrence of `marker` in the accumulation buffer.
    pub fn find(&self, marker: &str) -> Option<usize> {
        let needle = marker.as_bytes();
        if needle.is_empty() || self.acc.len() < needle.len() {
            return None;
        }
        self.acc.windows(needle.len()).position(|w| w == needle)
    }

    /// Block on the transport until `marker` appears or a poll window
    /// passes with no data at all.
    ///
    /// Each delivery restarts the window, so a chatty device can hold the
    /// wait open as long as it keeps sending; silence is what times out.
    pub fn wait_for<T: Transport>(
        &mut self,
        transport: &mut T,
        marker: &str,
        window: Duration,
    ) -> ProgResult<Scan> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(offset) = self.find(marker) {
                return Ok(Scan::Found(offset));
            }
            let n = transport.read(&mut chunk, window)?;
            if n == 0 {
                return Ok(Scan::TimedOut);
            }
            self.feed(&chunk[..n]);
        }
    }

    /// Discard the match and its trailing line so the next scan starts from
    /// clean text and cannot re-match stale output.
    ///
    /// `marker_end` is the offset one past the matched marker. Everything
    /// through the first newline at or after it is dropped; if no newline
    /// has arrived yet, everything through the marker itself is dropped.
    pub fn discard_through_line(&mut self, marker_end: usize) {
        let cut = match self.acc[marker_end.min(self.acc.len())..]
            .iter()
            .position(|&b| b == b'\n')
        {
            Some(nl) => marker_end + nl + 1,
            None => marker_end,
        };
        self.acc.drain(..cut.min(self.acc.len()));
    }
}

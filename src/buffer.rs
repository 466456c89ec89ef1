//! Buffer model for chip contents.
//!
//! Two equal-length buffers live for the whole session: *work* holds the
//! current/intended chip contents (editable, loadable, savable) and *check*
//! holds the snapshot a verification run compares against. A parallel
//! per-byte status overlay records the outcome of the last verification;
//! it exists purely for display.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::FILL_BYTE;
use crate::error::ProgResult;

/// Per-byte verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ByteStatus {
    /// No discrepancy recorded.
    #[default]
    None,
    /// Byte differs but every needed bit can still be programmed.
    Writable,
    /// Byte has a bit stuck in a state only a full erase can clear.
    NotWritable,
}

/// Aggregate outcome of a verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Bytes with stuck bits (NotWritable).
    pub errors: u32,
    /// Bytes that differ but remain programmable (Writable).
    pub warnings: u32,
}

impl VerifyReport {
    /// Verification passed with no discrepancy of either kind.
    pub fn is_success(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }
}

/// Result of loading a file into the work buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Bytes the file actually contained.
    pub loaded: usize,
    /// Bytes dropped because the file was longer than the selected chip.
    pub discarded: usize,
}

/// Work/check buffer pair plus the status overlay, all kept at the active
/// chip's size.
#[derive(Debug, Default)]
pub struct ChipBuffers {
    work: Vec<u8>,
    check: Vec<u8>,
    status: Vec<ByteStatus>,
    populated: bool,
}

impl ChipBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.work.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work.is_empty()
    }

    /// Whether the work buffer has never been populated (no read, no load).
    /// Callers gate write/verify/save on this.
    pub fn is_clear(&self) -> bool {
        !self.populated
    }

    pub fn work(&self) -> &[u8] {
        &self.work
    }

    pub fn work_mut(&mut self) -> &mut [u8] {
        &mut self.work
    }

    pub fn check(&self) -> &[u8] {
        &self.check
    }

    pub fn status(&self) -> &[ByteStatus] {
        &self.status
    }

    /// Resize both buffers and the overlay to a newly selected chip size.
    ///
    /// A shorter work buffer is padded with the erased-cell value; a longer
    /// one is truncated. Returns the number of bytes discarded by
    /// truncation so the caller can log it.
    pub fn resize(&mut self, size: u32) -> usize {
        let size = size as usize;
        let discarded = self.work.len().saturating_sub(size);

        self.work.resize(size, FILL_BYTE);
        self.check.clear();
        self.check.resize(size, 0);
        self.status.clear();
        self.status.resize(size, ByteStatus::None);

        if discarded > 0 {
            info!("resize dropped {} bytes from work buffer", discarded);
        }
        discarded
    }

    /// Load a raw binary file into the work buffer at the current size.
    ///
    /// Shorter files are padded with `0xFF`; longer files are truncated and
    /// the discard count reported. The buffer is unchanged if the read
    /// fails.
    pub fn load_from<P: AsRef<Path>>(&mut self, path: P) -> ProgResult<LoadReport> {
        let mut data = std::fs::read(path)?;
        let target = self.work.len();
        let loaded = data.len();
        let discarded = loaded.saturating_sub(target);

        data.resize(target, FILL_BYTE);
        self.work = data;
        self.check.iter_mut().for_each(|b| *b = 0);
        self.status.iter_mut().for_each(|s| *s = ByteStatus::None);
        self.populated = true;

        Ok(LoadReport { loaded, discarded })
    }

    /// Save the work buffer verbatim as a raw binary file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> ProgResult<()> {
        std::fs::write(path, &self.work)?;
        Ok(())
    }

    /// Prepare for a chip read: the overlay is stale once device bytes
    /// start landing in the work buffer.
    pub fn begin_read(&mut self) {
        self.status.iter_mut().for_each(|s| *s = ByteStatus::None);
        self.populated = true;
    }

    /// Zero the check snapshot (plain read, no verification baseline).
    pub fn reset_check(&mut self) {
        self.check.iter_mut().for_each(|b| *b = 0);
    }

    /// Snapshot the work buffer as the verification baseline.
    pub fn snapshot_check(&mut self) {
        self.check.clear();
        self.check.extend_from_slice(&self.work);
    }

    /// Copy a read delivery into the work buffer at `offset`.
    ///
    /// Never writes past the end: returns how many bytes were accepted, so
    /// the caller can hold back the rest for the next operation's stream.
    pub fn accept_read(&mut self, offset: usize, bytes: &[u8]) -> usize {
        let room = self.work.len().saturating_sub(offset);
        let n = bytes.len().min(room);
        self.work[offset..offset + n].copy_from_slice(&bytes[..n]);
        n
    }

    /// Scan for the first byte that is not the erased-cell value.
    ///
    /// Returns its index, or `None` when the whole buffer reads as erased.
    /// Stops at the first hit.
    pub fn first_unclear(&self) -> Option<usize> {
        self.work.iter().position(|&b| b != FILL_BYTE)
    }

    /// Classify every byte of the read-back against the snapshot.
    ///
    /// At entry `work` holds actual device bytes and `check` the intended
    /// ones. A bit that should read 0 but came back set cannot be cleared
    /// without an erase, so:
    ///
    /// - `(work ^ check) & check != 0` => NotWritable, counted as an error
    /// - otherwise any difference      => Writable, counted as a warning
    ///
    /// Either way the intended value is restored into `work` so the caller
    /// displays (and can retry) what was meant to be programmed.
    pub fn verify(&mut self) -> VerifyReport {
        let mut report = VerifyReport {
            errors: 0,
            warnings: 0,
        };

        for i in 0..self.work.len() {
            if (self.work[i] ^ self.check[i]) & self.check[i] != 0 {
                report.errors += 1;
                self.work[i] = self.check[i];
                self.status[i] = ByteStatus::NotWritable;
            } else if self.work[i] != self.check[i] {
                report.warnings += 1;
                self.work[i] = self.check[i];
                self.status[i] = ByteStatus::Writable;
            } else {
                self.status[i] = ByteStatus::None;
            }
        }

        report
    }
}

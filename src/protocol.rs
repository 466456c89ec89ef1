//! Protocol engine for the 27-series programmer.
//!
//! Orchestrates the half-duplex command exchange with the firmware:
//! 1. Probe - `'x'`, wait for the programmer banner
//! 2. Select - single chip-select byte, fire-and-forget
//! 3. Read   - `'r'`, then raw device bytes until the chip size is reached
//! 4. Write  - `'w'`, then 32-byte blocks bracketed by ready/ack markers
//! 5. Verify - snapshot, re-read, classify byte-by-byte
//! 6. Voltage - `'v'`, parse the report line when one arrives
//!
//! One operation runs at a time; long operations yield through the progress
//! callback after every block or read delivery so a hosting event loop
//! stays responsive.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::buffer::{ChipBuffers, VerifyReport};
use crate::chips::Chip;
use crate::config::{
    block_timeout, done_timeout, CMD_PROBE, CMD_READ, CMD_VOLTAGE, CMD_WRITE, BANNER,
    HANDSHAKE_TIMEOUT, MARKER_BLOCK_WRITTEN, MARKER_DONE, MARKER_READY, SERIAL_READ_TIMEOUT,
    VOLTAGE_POLL_TIMEOUT, VOLTAGE_PREFIX, WRITE_BLOCK_SIZE,
};
use crate::error::{ProgError, ProgResult};
use crate::scanner::{MarkerScanner, Scan};
use crate::transport::Transport;

/// Progress stages reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", content = "data")]
pub enum ProgStage {
    /// Probing for the programmer.
    Connecting,
    /// Banner received; session is usable.
    Connected { banner: String },
    /// Chip selected and buffers resized.
    ChipSelected { chip: Chip, size: u32 },
    /// Device bytes landing in the work buffer.
    Reading { received: u32, total: u32 },
    /// Full chip contents received.
    ReadComplete { bytes: u32 },
    /// Work buffer changed; dependent views should refresh.
    BufferUpdated,
    /// Blocks acknowledged so far.
    Writing { sent: u32, total: u32 },
    /// Whole chip programmed; trailing device text attached.
    WriteComplete { trailing: String },
    /// Read-back for verification in progress.
    Verifying,
    /// Classification finished.
    VerifyComplete { report: VerifyReport },
    /// Diagnostic line for the caller's log pane.
    Log { message: String },
}

impl ProgStage {
    /// Progress estimate in percent, or a negative value for stages that
    /// carry no progress.
    pub fn percent(&self) -> f32 {
        match self {
            ProgStage::Connecting => 0.0,
            ProgStage::Connected { .. } => 100.0,
            ProgStage::ChipSelected { .. } => 0.0,
            ProgStage::Reading { received, total } | ProgStage::Writing { sent: received, total } => {
                if *total == 0 {
                    0.0
                } else {
                    (*received as f32 / *total as f32) * 100.0
                }
            }
            ProgStage::ReadComplete { .. } => 100.0,
            ProgStage::WriteComplete { .. } => 100.0,
            ProgStage::Verifying => 0.0,
            ProgStage::VerifyComplete { .. } => 100.0,
            ProgStage::BufferUpdated | ProgStage::Log { .. } => -1.0,
        }
    }

    /// Human-readable message for this stage.
    pub fn message(&self) -> String {
        match self {
            ProgStage::Connecting => "Probing for programmer...".into(),
            ProgStage::Connected { banner } => format!("Connect successful. Received [{}]", banner),
            ProgStage::ChipSelected { chip, size } => {
                format!("Select {} chip ({} bytes)", chip.name(), size)
            }
            ProgStage::Reading { received, total } => {
                format!("Reading... {}/{} bytes", received, total)
            }
            ProgStage::ReadComplete { bytes } => format!("Read {} bytes.", bytes),
            ProgStage::BufferUpdated => "Buffer updated".into(),
            ProgStage::Writing { sent, total } => format!("Writing... {}/{} bytes", sent, total),
            ProgStage::WriteComplete { trailing } => format!("Programming done [{}]", trailing),
            ProgStage::Verifying => "Verifying chip against buffer...".into(),
            ProgStage::VerifyComplete { report } => {
                if report.is_success() {
                    "Verification successful.".into()
                } else {
                    format!(
                        "Verification failed. Errors: {}. Warnings: {}.",
                        report.errors, report.warnings
                    )
                }
            }
            ProgStage::Log { message } => message.clone(),
        }
    }
}

/// Completion report for a chip read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReport {
    /// Bytes accepted into the work buffer.
    pub bytes: u32,
    /// Bytes delivered past the chip size. They belong to the next
    /// operation's stream and stay queued for its marker scan; this copy
    /// is for the caller's diagnostics.
    pub leftover: Vec<u8>,
}

/// Protocol session: transport, scanner, active chip and the buffer pair.
///
/// Operations run to completion or to a terminal timeout; there is no
/// mid-operation cancellation and no automatic retry.
pub struct Programmer<T: Transport> {
    transport: T,
    scanner: MarkerScanner,
    chip: Option<Chip>,
    buffers: ChipBuffers,
}

impl<T: Transport> Programmer<T> {
    /// Wrap an already-opened transport. No handshake is performed yet.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            scanner: MarkerScanner::new(),
            chip: None,
            buffers: ChipBuffers::new(),
        }
    }

    /// Currently selected chip, if any.
    pub fn chip(&self) -> Option<Chip> {
        self.chip
    }

    pub fn buffers(&self) -> &ChipBuffers {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut ChipBuffers {
        &mut self.buffers
    }

    /// Probe the device and wait for its banner.
    ///
    /// The firmware answers `'x'` with a free-form greeting containing the
    /// literal banner string; anything else within the window means the
    /// port is not a 27-series programmer.
    pub fn connect<F: FnMut(ProgStage)>(&mut self, mut on_progress: F) -> ProgResult<()> {
        on_progress(ProgStage::Connecting);
        self.transport.clear_input()?;
        self.scanner.clear();
        self.transport.write(&[CMD_PROBE])?;

        match self.scanner.wait_for(&mut self.transport, BANNER, HANDSHAKE_TIMEOUT)? {
            Scan::Found(offset) => {
                let banner = self.scanner.buffered_text();
                self.scanner.discard_through_line(offset + BANNER.len());
                info!("programmer found: {}", banner.trim());
                on_progress(ProgStage::Connected { banner });
                Ok(())
            }
            Scan::TimedOut => {
                warn!("no banner within handshake window");
                Err(ProgError::DeviceNotFound)
            }
        }
    }

    /// Select a chip. Fire-and-forget: the firmware treats the select byte
    /// as a mode switch and sends no reply.
    ///
    /// Buffers are resized to the new part (pad `0xFF` / truncate); a
    /// truncation is reported as a log stage.
    pub fn select_chip<F: FnMut(ProgStage)>(
        &mut self,
        chip: Chip,
        mut on_progress: F,
    ) -> ProgResult<()> {
        let profile = chip.profile();
        self.transport.write(&[profile.select_command])?;
        self.chip = Some(chip);

        let discarded = self.buffers.resize(profile.size);
        if discarded > 0 {
            on_progress(ProgStage::Log {
                message: format!("Deleted {} bytes", discarded),
            });
        }

        info!("selected {} ({} bytes)", chip.name(), profile.size);
        on_progress(ProgStage::ChipSelected {
            chip,
            size: profile.size,
        });
        Ok(())
    }

    /// Read the whole chip into the work buffer.
    ///
    /// Completion is purely length-driven: the firmware streams exactly the
    /// chip size with no end marker. Bytes past the chip size are held back
    /// in the report, never silently dropped, so a following command's
    /// responses stay in sync.
    pub fn read_chip<F: FnMut(ProgStage)>(&mut self, mut on_progress: F) -> ProgResult<ReadReport> {
        if self.chip.is_none() {
            return Err(ProgError::NoChipSelected);
        }

        self.buffers.reset_check();
        self.buffers.begin_read();
        let report = self.run_read_phase(&mut on_progress)?;

        on_progress(ProgStage::ReadComplete { bytes: report.bytes });
        on_progress(ProgStage::BufferUpdated);
        Ok(report)
    }

    fn run_read_phase<F: FnMut(ProgStage)>(&mut self, on_progress: &mut F) -> ProgResult<ReadReport> {
        let total = self.buffers.len() as u32;
        info!("reading {} bytes from chip", total);

        // Stale bytes would land in the buffer as chip data
        self.transport.clear_input()?;
        self.scanner.clear();
        self.transport.write(&[CMD_READ])?;

        let mut received: usize = 0;
        let mut leftover = Vec::new();
        let mut chunk = [0u8; 1024];

        while (received as u32) < total {
            // Silence or a dead port mid-stream both end the operation as a
            // partial read carrying the count actually received.
            let n = match self.transport.read(&mut chunk, SERIAL_READ_TIMEOUT) {
                Ok(n) => n,
                Err(e) => {
                    warn!("transport failed mid-read: {}", e);
                    0
                }
            };
            if n == 0 {
                return Err(ProgError::ShortRead {
                    received: received as u32,
                    expected: total,
                });
            }

            let accepted = self.buffers.accept_read(received, &chunk[..n]);
            received += accepted;
            if accepted < n {
                leftover.extend_from_slice(&chunk[accepted..n]);
            }
            on_progress(ProgStage::Reading {
                received: received as u32,
                total,
            });
        }

        if !leftover.is_empty() {
            // These belong to the next command's stream; queue them for the
            // following marker scan so its responses stay in sync.
            warn!("{} bytes past chip size held back", leftover.len());
            self.scanner.feed(&leftover);
        }
        Ok(ReadReport {
            bytes: received as u32,
            leftover,
        })
    }

    /// Program the chip from the work buffer, 32 bytes at a time.
    ///
    /// Each block is bracketed by the firmware's ready and ack markers;
    /// a missing marker aborts the whole write with the buffered device
    /// text, leaving the remaining bytes unsent.
    pub fn write_chip<F: FnMut(ProgStage)>(&mut self, mut on_progress: F) -> ProgResult<()> {
        let Some(chip) = self.chip else {
            return Err(ProgError::NoChipSelected);
        };
        let size = chip.size();
        let timeout = block_timeout(size);

        info!("writing {} bytes to chip", size);
        // No drain here: bytes a preceding read held back may already hold
        // the first ready marker.
        self.transport.write(&[CMD_WRITE])?;

        let total = self.buffers.len();
        for start in (0..total).step_by(WRITE_BLOCK_SIZE) {
            let end = start + WRITE_BLOCK_SIZE;

            // The firmware asks for every block; silence means it is stuck
            // mid erase/program and the write cannot continue.
            match self.scanner.wait_for(&mut self.transport, MARKER_READY, timeout)? {
                Scan::Found(offset) => {
                    self.scanner.discard_through_line(offset + MARKER_READY.len())
                }
                Scan::TimedOut => {
                    return Err(ProgError::NotReady {
                        buffered: self.scanner.buffered_text(),
                    })
                }
            }

            let block = self.buffers.work()[start..end].to_vec();
            self.transport.write(&block)?;
            debug!("sent block 0x{:08X}-0x{:08X}", start, end - 1);

            match self
                .scanner
                .wait_for(&mut self.transport, MARKER_BLOCK_WRITTEN, timeout)?
            {
                Scan::Found(offset) => self
                    .scanner
                    .discard_through_line(offset + MARKER_BLOCK_WRITTEN.len()),
                Scan::TimedOut => {
                    return Err(ProgError::WriteAckMissing {
                        start: start as u32,
                        end: end as u32 - 1,
                        buffered: self.scanner.buffered_text(),
                    })
                }
            }

            on_progress(ProgStage::Writing {
                sent: end as u32,
                total: total as u32,
            });
        }

        // Only the tail of the last block's completion remains, hence the
        // shorter wait here.
        match self
            .scanner
            .wait_for(&mut self.transport, MARKER_DONE, done_timeout(size))?
        {
            Scan::Found(offset) => {
                let trailing = self.scanner.buffered_text();
                self.scanner.discard_through_line(offset + MARKER_DONE.len());
                info!("programming done");
                on_progress(ProgStage::WriteComplete { trailing });
                Ok(())
            }
            Scan::TimedOut => Err(ProgError::ProgrammingIncomplete {
                buffered: self.scanner.buffered_text(),
            }),
        }
    }

    /// Verify the chip against the work buffer.
    ///
    /// Snapshots the work buffer, reads the chip back over it, then
    /// classifies every byte (see [`ChipBuffers::verify`]). A mismatch is
    /// an outcome, not an error; only transport/timeout failures are.
    pub fn verify_chip<F: FnMut(ProgStage)>(
        &mut self,
        mut on_progress: F,
    ) -> ProgResult<VerifyReport> {
        if self.chip.is_none() {
            return Err(ProgError::NoChipSelected);
        }

        on_progress(ProgStage::Verifying);
        self.buffers.snapshot_check();
        self.buffers.begin_read();
        self.run_read_phase(&mut on_progress)?;

        let report = self.buffers.verify();
        if report.is_success() {
            info!("verification successful");
        } else {
            warn!(
                "verification failed: {} errors, {} warnings",
                report.errors, report.warnings
            );
        }
        on_progress(ProgStage::VerifyComplete { report });
        on_progress(ProgStage::BufferUpdated);
        Ok(report)
    }

    /// Check whether the chip read back as erased.
    ///
    /// Pure scan of the work buffer after a read; returns the index of the
    /// first non-`0xFF` byte, or `None` for a clear chip.
    pub fn check_clear(&self) -> Option<usize> {
        self.buffers.first_unclear()
    }

    /// Ask the firmware for the current programming voltage.
    ///
    /// Returns the value in tenths of a volt (12.6 V -> 126), or `None`
    /// when no report arrived inside the poll window; the caller re-invokes
    /// on its own cadence for a live readout.
    pub fn query_voltage(&mut self) -> ProgResult<Option<u16>> {
        self.transport.clear_input()?;
        self.scanner.clear();
        self.transport.write(&[CMD_VOLTAGE])?;

        match self
            .scanner
            .wait_for(&mut self.transport, VOLTAGE_PREFIX, VOLTAGE_POLL_TIMEOUT)?
        {
            Scan::Found(offset) => {
                // The number may still be in flight; keep polling until the
                // line completes or the stream goes quiet.
                let value_at = offset + VOLTAGE_PREFIX.len();
                let mut chunk = [0u8; 64];
                while !self.scanner.buffered()[value_at..].contains(&b'\n') {
                    let n = self.transport.read(&mut chunk, VOLTAGE_POLL_TIMEOUT)?;
                    if n == 0 {
                        break;
                    }
                    self.scanner.feed(&chunk[..n]);
                }

                let text = String::from_utf8_lossy(&self.scanner.buffered()[value_at..]).into_owned();
                self.scanner.discard_through_line(value_at);
                let tenths = parse_voltage_tenths(&text);
                if let Some(v) = tenths {
                    debug!("programming voltage: {}.{} V", v / 10, v % 10);
                }
                Ok(tenths)
            }
            Scan::TimedOut => Ok(None),
        }
    }
}

/// Parse the decimal value after the voltage prefix, scaled to tenths.
///
/// The firmware prints a value and a trailing unit, e.g. `"12.6 V"`.
fn parse_voltage_tenths(text: &str) -> Option<u16> {
    let token: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let volts: f32 = token.parse().ok()?;
    Some((volts * 10.0).round() as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FILL_BYTE;
    use crate::test_support::ScriptTransport;

    fn selected(transport: ScriptTransport, chip: Chip) -> Programmer<ScriptTransport> {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut prog = Programmer::new(transport);
        prog.select_chip(chip, |_| {}).unwrap();
        prog
    }

    /// Scripted handshake for a small write: ready + ack per block, then
    /// the completion marker.
    fn write_script(blocks: usize) -> Vec<Vec<u8>> {
        let mut reads = Vec::new();
        for i in 0..blocks {
            reads.push(b"Waiting for data\n".to_vec());
            reads.push(format!("Write block {}\n", i).into_bytes());
        }
        reads.push(b"Programming Done\n".to_vec());
        reads
    }

    #[test]
    fn test_connect_finds_banner() {
        let transport = ScriptTransport::with_reads(vec![
            b"booting...\n".to_vec(),
            b"Arduino 27 Series programmer V2\n".to_vec(),
        ]);
        let mut prog = Programmer::new(transport);

        let mut connected = false;
        prog.connect(|stage| {
            if matches!(stage, ProgStage::Connected { .. }) {
                connected = true;
            }
        })
        .unwrap();
        assert!(connected);
    }

    #[test]
    fn test_connect_times_out_without_banner() {
        let transport = ScriptTransport::with_reads(vec![b"some other device\n".to_vec()]);
        let mut prog = Programmer::new(transport);

        let result = prog.connect(|_| {});
        assert!(matches!(result, Err(ProgError::DeviceNotFound)));
    }

    #[test]
    fn test_select_chip_sends_byte_and_resizes() {
        let mut prog = Programmer::new(ScriptTransport::with_reads(vec![]));
        prog.select_chip(Chip::C64, |_| {}).unwrap();

        assert_eq!(prog.chip(), Some(Chip::C64));
        assert_eq!(prog.buffers().len(), 0x2000);
        // Fire-and-forget: exactly the select byte, nothing awaited
        assert_eq!(prog.transport.writes(), &[vec![b'c']]);
    }

    #[test]
    fn test_read_chip_accumulates_and_reports_progress() {
        let chip_size = Chip::C16.size() as usize; // 0x0800
        let mut reads = Vec::new();
        for i in 0..4 {
            reads.push(vec![i as u8; chip_size / 4]);
        }
        let mut prog = selected(ScriptTransport::with_reads(reads), Chip::C16);

        let mut progress = Vec::new();
        let report = prog
            .read_chip(|stage| {
                if let ProgStage::Reading { received, .. } = stage {
                    progress.push(received);
                }
            })
            .unwrap();

        assert_eq!(report.bytes, chip_size as u32);
        assert!(report.leftover.is_empty());
        assert_eq!(progress.last(), Some(&(chip_size as u32)));
        assert_eq!(prog.buffers().work()[0], 0);
        assert_eq!(prog.buffers().work()[chip_size - 1], 3);
        // select byte then 'r', nothing else
        assert_eq!(prog.transport.written_bytes(), vec![b'a', b'r']);
    }

    #[test]
    fn test_read_chip_holds_back_overshoot() {
        let chip_size = Chip::C16.size() as usize; // 2048
        // Final delivery carries the last 5 chip bytes plus 5 strays that
        // belong to the next command's stream
        let mut tail = vec![0x42u8; 5];
        tail.extend_from_slice(b"extra");
        let reads = vec![vec![0x42u8; 1024], vec![0x42u8; 1019], tail];
        let mut prog = selected(ScriptTransport::with_reads(reads), Chip::C16);

        let report = prog.read_chip(|_| {}).unwrap();

        assert_eq!(report.bytes, chip_size as u32);
        assert_eq!(report.leftover, b"extra");
        assert_eq!(prog.buffers().len(), chip_size);
        assert!(prog.buffers().work().iter().all(|&b| b == 0x42));
        // Held back in the stream, not just reported
        assert_eq!(prog.scanner.buffered(), b"extra");
    }

    #[test]
    fn test_verify_leftover_satisfies_next_ready_wait() {
        let blocks = Chip::C16.size() as usize / WRITE_BLOCK_SIZE;
        // The read-back tail rides in with the ready marker for the write
        // that follows
        let mut tail = vec![0xA5u8; 5];
        tail.extend_from_slice(b"Waiting for data\n");
        let mut reads = vec![vec![0xA5u8; 1024], vec![0xA5u8; 1019], tail];
        reads.push(b"Write block 0\n".to_vec());
        for i in 1..blocks {
            reads.push(b"Waiting for data\n".to_vec());
            reads.push(format!("Write block {}\n", i).into_bytes());
        }
        reads.push(b"Programming Done\n".to_vec());

        let mut prog = selected(ScriptTransport::with_reads(reads), Chip::C16);
        prog.buffers_mut().work_mut().fill(0xA5);

        let report = prog.verify_chip(|_| {}).unwrap();
        assert!(report.is_success());

        // The marker that arrived with the read tail must still count
        prog.write_chip(|_| {}).unwrap();
    }

    #[test]
    fn test_read_chip_partial_is_short_read() {
        let mut prog = selected(
            ScriptTransport::with_reads(vec![vec![0u8; 100]]),
            Chip::C16,
        );

        let result = prog.read_chip(|_| {});
        assert!(matches!(
            result,
            Err(ProgError::ShortRead {
                received: 100,
                expected: 0x0800
            })
        ));
    }

    #[test]
    fn test_read_chip_dead_port_is_short_read() {
        let transport =
            ScriptTransport::with_reads(vec![vec![0u8; 64]]).failing_when_exhausted();
        let mut prog = selected(transport, Chip::C16);

        let result = prog.read_chip(|_| {});
        assert!(matches!(
            result,
            Err(ProgError::ShortRead {
                received: 64,
                expected: 0x0800
            })
        ));
    }

    #[test]
    fn test_read_without_chip_fails() {
        let mut prog = Programmer::new(ScriptTransport::with_reads(vec![]));
        assert!(matches!(
            prog.read_chip(|_| {}),
            Err(ProgError::NoChipSelected)
        ));
    }

    #[test]
    fn test_write_chip_full_handshake() {
        let blocks = Chip::C16.size() as usize / WRITE_BLOCK_SIZE; // 64
        let mut prog = selected(ScriptTransport::with_reads(write_script(blocks)), Chip::C16);
        for (i, b) in prog.buffers_mut().work_mut().iter_mut().enumerate() {
            *b = i as u8;
        }

        let mut complete = false;
        prog.write_chip(|stage| {
            if matches!(stage, ProgStage::WriteComplete { .. }) {
                complete = true;
            }
        })
        .unwrap();
        assert!(complete);

        // select byte + 'w' + one write per block
        let writes = prog.transport.writes();
        assert_eq!(writes.len(), 2 + blocks);
        assert_eq!(writes[1], vec![b'w']);
        for (i, block) in writes[2..].iter().enumerate() {
            assert_eq!(block.len(), WRITE_BLOCK_SIZE);
            assert_eq!(block[0], (i * WRITE_BLOCK_SIZE) as u8);
        }
    }

    #[test]
    fn test_write_chip_aborts_when_never_ready() {
        // Device chatters but never signals readiness
        let mut prog = selected(
            ScriptTransport::with_reads(vec![b"stuck in erase\n".to_vec()]),
            Chip::C16,
        );

        let result = prog.write_chip(|_| {});
        match result {
            Err(ProgError::NotReady { buffered }) => {
                assert!(buffered.contains("stuck in erase"))
            }
            other => panic!("expected NotReady, got {:?}", other),
        }
        // No block left the host: only the select byte and 'w'
        assert_eq!(prog.transport.writes().len(), 2);
    }

    #[test]
    fn test_write_chip_missing_ack_names_block() {
        // Ready for the first block, then silence instead of an ack
        let mut prog = selected(
            ScriptTransport::with_reads(vec![b"Waiting for data\n".to_vec()]),
            Chip::C16,
        );

        let result = prog.write_chip(|_| {});
        match result {
            Err(ProgError::WriteAckMissing { start, end, .. }) => {
                assert_eq!(start, 0);
                assert_eq!(end, 31);
            }
            other => panic!("expected WriteAckMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_write_chip_missing_done_marker() {
        let blocks = Chip::C16.size() as usize / WRITE_BLOCK_SIZE;
        let mut script = write_script(blocks);
        script.pop(); // no "Programming Done"
        let mut prog = selected(ScriptTransport::with_reads(script), Chip::C16);

        let result = prog.write_chip(|_| {});
        assert!(matches!(
            result,
            Err(ProgError::ProgrammingIncomplete { .. })
        ));
    }

    #[test]
    fn test_verify_chip_classifies_read_back() {
        let chip_size = Chip::C16.size() as usize;
        // First byte reads back 0x00 where the buffer wants 0xFF: bits
        // that should read 1 came back 0, unreachable without an erase.
        let mut device = vec![FILL_BYTE; chip_size];
        device[0] = 0x00;
        let mut prog = selected(ScriptTransport::with_reads(vec![device]), Chip::C16);
        prog.buffers_mut().work_mut().fill(FILL_BYTE);

        let report = prog.verify_chip(|_| {}).unwrap();

        assert_eq!(report.errors, 1);
        assert_eq!(report.warnings, 0);
        // Intended value restored
        assert_eq!(prog.buffers().work()[0], FILL_BYTE);
    }

    #[test]
    fn test_verify_chip_flags_programmable_difference() {
        let chip_size = Chip::C16.size() as usize;
        // Read-back all-0xFF against an intended 0x00: every wanted bit
        // can still be programmed down, so it is a warning, not an error
        let mut prog = selected(
            ScriptTransport::with_reads(vec![vec![FILL_BYTE; chip_size]]),
            Chip::C16,
        );
        prog.buffers_mut().work_mut().fill(FILL_BYTE);
        prog.buffers_mut().work_mut()[0] = 0x00;

        let report = prog.verify_chip(|_| {}).unwrap();

        assert_eq!(report.errors, 0);
        assert_eq!(report.warnings, 1);
        assert_eq!(prog.buffers().work()[0], 0x00);
    }

    #[test]
    fn test_verify_chip_success() {
        let chip_size = Chip::C16.size() as usize;
        let mut prog = selected(
            ScriptTransport::with_reads(vec![vec![0xA5; chip_size]]),
            Chip::C16,
        );
        prog.buffers_mut().work_mut().fill(0xA5);

        let report = prog.verify_chip(|_| {}).unwrap();
        assert!(report.is_success());
    }

    #[test]
    fn test_check_clear() {
        let mut prog = selected(ScriptTransport::with_reads(vec![]), Chip::C16);
        assert_eq!(prog.check_clear(), None);

        prog.buffers_mut().work_mut()[123] = 0x7F;
        assert_eq!(prog.check_clear(), Some(123));
    }

    #[test]
    fn test_query_voltage_parses_report() {
        let transport = ScriptTransport::with_reads(vec![
            b"Programming volt".to_vec(),
            b"age: 12.6 V\n".to_vec(),
        ]);
        let mut prog = Programmer::new(transport);

        let value = prog.query_voltage().unwrap();
        assert_eq!(value, Some(126));
        assert_eq!(prog.transport.written_bytes(), vec![b'v']);
    }

    #[test]
    fn test_query_voltage_no_report_is_not_an_error() {
        let mut prog = Programmer::new(ScriptTransport::with_reads(vec![]));
        assert_eq!(prog.query_voltage().unwrap(), None);
    }

    #[test]
    fn test_stage_percent_and_message() {
        let stage = ProgStage::Reading {
            received: 0x0400,
            total: 0x0800,
        };
        assert_eq!(stage.percent(), 50.0);
        assert!(stage.message().contains("1024/2048"));

        let report = VerifyReport {
            errors: 2,
            warnings: 1,
        };
        let done = ProgStage::VerifyComplete { report };
        assert!(done.message().contains("Errors: 2"));
        assert_eq!(done.percent(), 100.0);
    }
}

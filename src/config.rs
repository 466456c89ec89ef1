//! Configuration constants for the 27-series programmer protocol.

use std::time::Duration;

// ============================================================================
// Serial Communication
// ============================================================================

/// Baud rate for the programmer link. The firmware runs at a fixed speed;
/// nothing is negotiated.
pub const SERIAL_BAUD_RATE: u32 = 115_200;

/// Default serial read timeout for individual read operations.
pub const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(1000);

// ============================================================================
// Command Bytes
// ============================================================================
// Single ASCII bytes, no framing. Chip-select bytes ('a'..='j') live with
// the chip table in `chips.rs`.

/// Start reading the selected chip.
pub const CMD_READ: u8 = b'r';

/// Start writing to the selected chip.
pub const CMD_WRITE: u8 = b'w';

/// Query the programming voltage.
pub const CMD_VOLTAGE: u8 = b'v';

/// Connection handshake probe.
pub const CMD_PROBE: u8 = b'x';

// ============================================================================
// Device Markers
// ============================================================================
// Literal substrings the firmware prints between free-form log lines. The
// driver scans for these; everything around them is human-readable noise.

/// Banner the firmware prints in response to the handshake probe.
pub const BANNER: &str = "Arduino 27 Series programmer V2";

/// Firmware is ready to receive the next 32-byte block.
pub const MARKER_READY: &str = "Waiting for data";

/// Firmware has programmed the block it just received.
pub const MARKER_BLOCK_WRITTEN: &str = "Write block ";

/// Firmware has finished programming the whole chip.
pub const MARKER_DONE: &str = "Programming Done";

/// Prefix of the voltage report line, followed by a decimal value and unit.
pub const VOLTAGE_PREFIX: &str = "Programming voltage: ";

// ============================================================================
// Write Pipeline Timing
// ============================================================================

/// Bytes per write block. Every supported chip size is a multiple of this.
pub const WRITE_BLOCK_SIZE: usize = 32;

/// Per-block wait (ready marker and ack marker) for most chips.
pub const BLOCK_TIMEOUT: Duration = Duration::from_millis(400);

/// Per-block wait for the 27C16, whose erase/program cycle is slower.
pub const BLOCK_TIMEOUT_27C16: Duration = Duration::from_millis(640);

/// Final "Programming Done" wait. Shorter than the per-block waits: it only
/// has to catch the tail of the last block's completion.
pub const DONE_TIMEOUT: Duration = Duration::from_millis(200);

/// Final wait for the 27C16.
pub const DONE_TIMEOUT_27C16: Duration = Duration::from_millis(320);

/// Chip size that triggers the slow-part timeouts above.
pub const SLOW_CHIP_SIZE: u32 = 0x0800;

// ============================================================================
// Other Timing
// ============================================================================

/// Window for the handshake banner after sending the probe byte.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Per-poll window for a voltage report. No marker inside the window just
/// means no new reading this tick.
pub const VOLTAGE_POLL_TIMEOUT: Duration = Duration::from_millis(80);

// ============================================================================
// Buffer Conventions
// ============================================================================

/// Value of an erased EPROM cell; also the pad byte for short files.
pub const FILL_BYTE: u8 = 0xFF;

/// Per-block wait for a chip of the given size.
pub fn block_timeout(chip_size: u32) -> Duration {
    if chip_size == SLOW_CHIP_SIZE {
        BLOCK_TIMEOUT_27C16
    } else {
        BLOCK_TIMEOUT
    }
}

/// Final completion wait for a chip of the given size.
pub fn done_timeout(chip_size: u32) -> Duration {
    if chip_size == SLOW_CHIP_SIZE {
        DONE_TIMEOUT_27C16
    } else {
        DONE_TIMEOUT
    }
}

//! Protocol driver for the Arduino 27-series EPROM programmer.
//!
//! Drives the programmer over a serial byte stream: chip selection, full
//! reads, 32-byte-block writes with a per-block handshake, read-back
//! verification and programming-voltage monitoring. The firmware mixes
//! free-form log lines with the literal markers the protocol keys on, so
//! the driver scans the stream for markers rather than parsing frames.
//!
//! # Protocol Overview
//!
//! 1. **Handshake** - probe with `'x'`, expect the programmer banner
//! 2. **Chip Select** - one ASCII byte per part, no reply
//! 3. **Read** - `'r'`, then exactly the chip size in raw bytes
//! 4. **Write** - `'w'`, then 32-byte blocks, each bracketed by
//!    "Waiting for data" and "Write block " markers, closed by
//!    "Programming Done"
//! 5. **Verify** - snapshot the buffer, re-read the chip, classify each
//!    byte as unchanged, still-writable or stuck
//!
//! # Example
//!
//! ```ignore
//! use eprom27::{Chip, Programmer, SerialTransport};
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0")?;
//! let mut prog = Programmer::new(transport);
//! prog.connect(|stage| println!("{}", stage.message()))?;
//! prog.select_chip(Chip::C256, |_| {})?;
//! let report = prog.read_chip(|stage| println!("{}", stage.message()))?;
//! println!("read {} bytes", report.bytes);
//! ```

mod buffer;
mod chips;
mod config;
mod error;
mod protocol;
mod scanner;
mod transport;

#[cfg(test)]
mod test_support;

// Re-export public types and functions

// Chip registry
pub use chips::{Chip, ChipProfile};

// Buffer model
pub use buffer::{ByteStatus, ChipBuffers, LoadReport, VerifyReport};

// Protocol engine
pub use protocol::{ProgStage, Programmer, ReadReport};

// Transport
pub use transport::{SerialTransport, Transport};

// Errors
pub use error::{ProgError, ProgResult};

// Protocol constants callers may need (baud rate, fill byte)
pub use config::{FILL_BYTE, SERIAL_BAUD_RATE};

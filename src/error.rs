//! Error types for the programmer protocol driver.

use thiserror::Error;

/// Result type alias for programmer operations.
pub type ProgResult<T> = Result<T, ProgError>;

/// Errors that can occur while driving the programmer.
#[derive(Debug, Error)]
pub enum ProgError {
    /// Serial port error from the serialport crate.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Standard I/O error (transport reads/writes, buffer files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port is busy (in use by another process).
    #[error("Port '{port}' is busy or in use by another application")]
    PortBusy { port: String },

    /// Permission denied accessing the serial port.
    #[error("Permission denied for port '{port}'")]
    PortPermissionDenied { port: String },

    /// Handshake probe was not answered with the programmer banner.
    #[error("Programmer not found (no banner within handshake window)")]
    DeviceNotFound,

    /// The device never signalled readiness for the next write block.
    /// Carries whatever text the device had sent, for diagnosis.
    #[error("Programmer not ready for data [{buffered}]")]
    NotReady { buffered: String },

    /// A block was sent but the device never acknowledged writing it.
    #[error("No write acknowledgment for block 0x{start:08X}-0x{end:08X} [{buffered}]")]
    WriteAckMissing {
        start: u32,
        end: u32,
        buffered: String,
    },

    /// All blocks were sent but the final completion marker never arrived.
    #[error("Programming did not complete [{buffered}]")]
    ProgrammingIncomplete { buffered: String },

    /// The transport closed or errored before a chip read finished.
    #[error("Short read: got {received} of {expected} bytes")]
    ShortRead { received: u32, expected: u32 },

    /// An operation that needs an active chip was invoked before selection.
    #[error("No chip selected")]
    NoChipSelected,
}

impl ProgError {
    /// Whether this error is a protocol timeout (an expected marker never
    /// arrived). Timeouts are terminal for their operation; the caller must
    /// reissue from a clean state.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ProgError::DeviceNotFound
                | ProgError::NotReady { .. }
                | ProgError::WriteAckMissing { .. }
                | ProgError::ProgrammingIncomplete { .. }
        )
    }

    /// Stable error code for logs and support purposes.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProgError::Serial(_) => "EPR-001",
            ProgError::Io(_) => "EPR-002",
            ProgError::PortBusy { .. } => "EPR-003",
            ProgError::PortPermissionDenied { .. } => "EPR-004",
            ProgError::DeviceNotFound => "EPR-010",
            ProgError::NotReady { .. } => "EPR-020",
            ProgError::WriteAckMissing { .. } => "EPR-021",
            ProgError::ProgrammingIncomplete { .. } => "EPR-022",
            ProgError::ShortRead { .. } => "EPR-030",
            ProgError::NoChipSelected => "EPR-040",
        }
    }
}

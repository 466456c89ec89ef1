//! Serial transport layer for the programmer link.
//!
//! Provides a trait-based abstraction over serial communication,
//! enabling both real hardware and mock testing.

use std::io::Read;
use std::time::Duration;

use serialport::SerialPort;

#[cfg(test)]
use mockall::automock;

use crate::config::{SERIAL_BAUD_RATE, SERIAL_READ_TIMEOUT};
use crate::error::{ProgError, ProgResult};

/// Trait for transport operations against the programmer.
///
/// This abstraction allows for mocking in tests and potential
/// alternative transport mechanisms.
#[cfg_attr(test, automock)]
pub trait Transport: Send {
    /// Write data to the transport.
    fn write(&mut self, data: &[u8]) -> ProgResult<()>;

    /// Read data from the transport, blocking up to `timeout`.
    ///
    /// Returns the number of bytes read; 0 means the timeout elapsed with
    /// nothing delivered.
    fn read(&mut self, buffer: &mut [u8], timeout: Duration) -> ProgResult<usize>;

    /// Flush any buffered output.
    fn flush(&mut self) -> ProgResult<()>;

    /// Clear any pending input data from the receive buffer.
    fn clear_input(&mut self) -> ProgResult<()>;
}

/// Serial port transport implementation.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a serial port for programmer communication.
    ///
    /// Uses the fixed programmer baud rate (115200) and 8N1 framing.
    pub fn open(port_name: &str) -> ProgResult<Self> {
        Self::open_with_baud(port_name, SERIAL_BAUD_RATE)
    }

    /// Open a serial port with a specific baud rate.
    pub fn open_with_baud(port_name: &str, baud_rate: u32) -> ProgResult<Self> {
        // Normalize port name for cross-platform compatibility
        let normalized_name = normalize_port_name(port_name);

        match serialport::new(&normalized_name, baud_rate)
            .timeout(SERIAL_READ_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
        {
            Ok(port) => Ok(Self { port }),
            Err(e) => {
                let err_str = e.to_string().to_lowercase();

                Err(match e.kind() {
                    serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                        ProgError::PortPermissionDenied {
                            port: port_name.to_string(),
                        }
                    }
                    serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                        ProgError::DeviceNotFound
                    }
                    _ if err_str.contains("busy") || err_str.contains("in use") => {
                        ProgError::PortBusy {
                            port: port_name.to_string(),
                        }
                    }
                    _ => ProgError::Serial(e),
                })
            }
        }
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> ProgResult<()> {
        use std::io::Write;

        // Single write call - the OS handles packetization.
        self.port.write_all(data).map_err(ProgError::Io)?;

        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8], timeout: Duration) -> ProgResult<usize> {
        self.port.set_timeout(timeout).map_err(ProgError::Serial)?;

        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(ProgError::Io(e)),
        }
    }

    fn flush(&mut self) -> ProgResult<()> {
        self.port.flush().map_err(ProgError::Io)
    }

    fn clear_input(&mut self) -> ProgResult<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(ProgError::Serial)
    }
}

/// Normalize a port name for cross-platform compatibility.
fn normalize_port_name(name: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        // Prefer cu. over tty. for better compatibility
        if name.starts_with("/dev/tty.") {
            return name.replace("/dev/tty.", "/dev/cu.");
        }
    }

    #[cfg(target_os = "windows")]
    {
        // COM ports > 9 need \\.\\ prefix
        if name.starts_with("COM") {
            if let Ok(n) = name[3..].parse::<u32>() {
                if n > 9 {
                    return format!("\\\\.\\{}", name);
                }
            }
        }
    }

    name.to_string()
}

//! # Serial Transport
//!
//! This module talks to Niimbot printers over a USB CDC or Bluetooth SPP
//! serial device (e.g. `/dev/ttyACM0`, `/dev/rfcomm0`, `COM3`) through the
//! `serialport` crate.
//!
//! ## Line Settings
//!
//! - **8N1**: eight data bits, no parity, one stop bit
//! - **No flow control**: 0x11/0x13 occur inside frames
//! - **Baud**: 9600 by default
//!
//! ## Read Timeout
//!
//! Every `read` returns after at most the configured timeout (200ms by
//! default). A silent printer surfaces as `ErrorKind::TimedOut`, which the
//! reassembler treats as an empty read, so the transceiver's retry loop
//! counts rounds instead of blocking forever.

use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::error::ProtocolError;

/// Default serial device path
pub const DEFAULT_DEVICE: &str = "/dev/ttyACM0";

/// Baud rate Niimbot printers use
pub const DEFAULT_BAUD: u32 = 9600;

/// Longest a read waits for data before returning empty
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Serial line settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud: u32,
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SerialConfig {
    /// Port builder carrying these settings.
    pub fn builder(&self, device: &str) -> serialport::SerialPortBuilder {
        serialport::new(device, self.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
    }
}

/// # Serial Printer Transport
///
/// An open serial port. Implements `Read + Write`, so it is a
/// [`PrinterLink`](super::PrinterLink) as-is.
///
/// ```no_run
/// use niimbot::transport::{SerialTransport, Transceiver};
///
/// let port = SerialTransport::open("/dev/ttyACM0")?;
/// let mut transceiver = Transceiver::new(port);
/// let ack = transceiver.send_and_wait(35, &[1], 16)?;
/// # Ok::<(), niimbot::ProtocolError>(())
/// ```
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    config: SerialConfig,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .field("config", &self.config)
            .finish()
    }
}

impl SerialTransport {
    /// Open a serial device with the default 9600 8N1 settings.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The device doesn't exist
    /// - Permission denied (may need the dialout group)
    /// - The line settings are rejected
    /// - Stale input cannot be discarded
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, ProtocolError> {
        Self::open_with(device, SerialConfig::default())
    }

    /// Open a serial device with explicit line settings.
    pub fn open_with<P: AsRef<Path>>(
        device: P,
        config: SerialConfig,
    ) -> Result<Self, ProtocolError> {
        let path = device.as_ref().to_string_lossy();

        let port = config.builder(&path).open().map_err(|e| {
            ProtocolError::Transport(format!("Failed to open {}: {}", path, e))
        })?;

        // Stale bytes from a previous session would confuse the first exchange.
        discard_result(&path, port.clear(ClearBuffer::Input))?;
        debug!(device = %path, baud = config.baud, "serial port open");

        Ok(Self { port, config })
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

/// Map the outcome of discarding buffered input.
fn discard_result(device: &str, result: serialport::Result<()>) -> Result<(), ProtocolError> {
    result.map_err(|e| {
        ProtocolError::Transport(format!("Failed to discard input on {}: {}", device, e))
    })
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SerialConfig::default();
        assert_eq!(config.baud, 9600);
        assert_eq!(config.read_timeout, Duration::from_millis(200));
    }

    #[test]
    fn test_builder_carries_line_settings() {
        let config = SerialConfig {
            baud: 115200,
            read_timeout: Duration::from_millis(50),
        };
        let builder = config.builder("/dev/ttyACM0");
        let debug = format!("{:?}", builder);
        assert!(debug.contains("115200"));
        assert!(debug.contains("Eight"));
        assert!(debug.contains("None"));
        assert!(debug.contains("50ms"));
    }

    #[test]
    fn test_discard_failure_is_reported() {
        assert!(discard_result("/dev/ttyACM0", Ok(())).is_ok());

        let failure = serialport::Error::new(
            serialport::ErrorKind::Io(io::ErrorKind::Other),
            "tcflush failed",
        );
        let err = discard_result("/dev/ttyACM0", Err(failure)).unwrap_err();
        assert!(matches!(err, ProtocolError::Transport(_)));
        assert!(err.to_string().contains("Failed to discard input"));
        assert!(err.to_string().contains("tcflush failed"));
    }

    #[test]
    fn test_open_missing_device() {
        let err = SerialTransport::open("/dev/does-not-exist-niimbot").unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }

    // Note: Most transport tests require actual hardware.
}

//! # Printer Transport Layer
//!
//! This module provides the byte link to the printer and the
//! request/response machinery built on top of it.
//!
//! ## Available Pieces
//!
//! - [`serial`]: serial port at 9600 8N1 with a short read timeout
//! - [`mock`]: scripted link for tests and dry runs
//! - [`transceiver`]: command/response correlation with bounded retry
//!
//! ## The Link Capability
//!
//! The protocol core never opens a port itself. It is handed something
//! implementing [`PrinterLink`]: a [`ByteSource`] that can also send bytes.
//! Any `Read + Write` qualifies, so a serial port, a socket or an in-memory
//! buffer all work unchanged.

pub mod mock;
pub mod serial;
pub mod transceiver;

use std::io::Write;

use crate::error::ProtocolError;
use crate::protocol::stream::ByteSource;

pub use mock::ScriptedLink;
pub use serial::SerialTransport;
pub use transceiver::{Clock, RetryPolicy, SystemClock, Transceiver};

/// Bidirectional byte link to a printer.
pub trait PrinterLink: ByteSource {
    /// Write all of `bytes` and flush.
    fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError>;
}

impl<T: std::io::Read + Write> PrinterLink for T {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.write_all(bytes)?;
        self.flush()?;
        Ok(())
    }
}

//! # Niimbot - Label Printer Protocol Library
//!
//! A Rust library for printing on Niimbot thermal label printers (D11, B21)
//! over a serial link. It provides:
//!
//! - **Framing**: packet encoding, checksum validation and stream reassembly
//! - **Transceiver**: command/response correlation with bounded retry
//! - **Encoding**: binarization and run-merged image-line packets
//! - **Session**: the full print-job command sequence per printer model
//!
//! ## Quick Start
//!
//! ```no_run
//! use niimbot::{
//!     printer::{LabelPrinter, PrinterModel},
//!     render::binarize::load_bitmap,
//!     transport::SerialTransport,
//! };
//!
//! // Open connection to printer
//! let port = SerialTransport::open("/dev/ttyACM0")?;
//!
//! // Load and binarize the label art
//! let bitmap = load_bitmap("label.png")?;
//!
//! // Label type 1 (gap), density 2, one copy
//! let mut printer = LabelPrinter::new(port, PrinterModel::D11);
//! printer.print_label(&bitmap, 1, 2, 1)?;
//!
//! # Ok::<(), niimbot::ProtocolError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Frames, command codes, reassembly |
//! | [`transport`] | Serial link and transceiver |
//! | [`render`] | Binarization and line encoding |
//! | [`printer`] | Printer models and print sessions |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! - Niimbot D11 (96 dots wide, page-done notifications)
//! - Niimbot B21 (384 dots wide, status polling)

pub mod error;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod transport;

// Re-exports for convenience
pub use error::ProtocolError;
pub use printer::{LabelPrinter, PrinterModel};
pub use protocol::packet::Packet;
pub use transport::{SerialTransport, Transceiver};

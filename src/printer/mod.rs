//! # Printer Module
//!
//! Model definitions and the print-job session built on the transceiver.
//!
//! ## Modules
//!
//! - [`config`]: Per-model hardware limits and protocol profile
//! - [`session`]: Command sequencing for a complete print job

pub mod config;
pub mod session;

pub use config::PrinterModel;
pub use session::{LabelPrinter, PrintStatus};

//! # Error Types
//!
//! This module defines the error type shared by the codec, the stream
//! reassembler, the transceiver and the printer session.
//!
//! ## Taxonomy
//!
//! | Variant | Raised by | Meaning |
//! |---------|-----------|---------|
//! | `MalformedFrame` | codec | Start/end markers missing or frame too short |
//! | `ChecksumMismatch` | codec | XOR checksum disagrees with embedded byte |
//! | `LengthMismatch` | codec | Declared length byte disagrees with payload |
//! | `PayloadTooLarge` | codec, encoder | Payload longer than 255 bytes |
//! | `DeviceRejected` | transceiver | Printer answered with an error code |
//! | `Timeout` | transceiver | No matching response within the retry budget |
//! | `SourceExhausted` | reassembler | Byte source ran dry mid-read |

use thiserror::Error;

/// Command-level failure reported by the printer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Device error code 219: the command's argument was not accepted.
    IllegalArgument,
    /// Device error code 0: the command is not implemented by this firmware.
    NotImplemented,
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalArgument => write!(f, "illegal argument"),
            Self::NotImplemented => write!(f, "not implemented"),
        }
    }
}

/// Main error type for niimbot operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame markers missing, or frame shorter than the fixed overhead
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Computed checksum differs from the one carried by the frame
    #[error("Checksum mismatch: frame carries {actual:#04x}, computed {expected:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Length byte does not describe the payload actually framed
    #[error("Length mismatch: header declares {declared} bytes, frame holds {actual}")]
    LengthMismatch { declared: u8, actual: usize },

    /// Payload cannot be described by a single length byte
    #[error("Payload too large: {0} bytes (max 255)")]
    PayloadTooLarge(usize),

    /// The printer answered with one of its error codes
    #[error("Device rejected command: {0}")]
    DeviceRejected(RejectionKind),

    /// No response with the expected type arrived in time
    #[error("Timed out waiting for response code {code} after {rounds} rounds")]
    Timeout { code: u8, rounds: u32 },

    /// The byte source had nothing more to give
    #[error("Byte source exhausted")]
    SourceExhausted,

    /// A response arrived but its payload is too short to interpret
    #[error("Response {code} too short: need {needed} bytes, got {got}")]
    ShortResponse { code: u8, needed: usize, got: usize },

    /// Caller supplied a value outside what the printer accepts
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport-level errors (opening, configuring the port)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Image loading or conversion error
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether this error came from a corrupt or unparsable frame.
    ///
    /// The transceiver counts these against its retry budget instead of
    /// aborting the exchange.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame(_) | Self::ChecksumMismatch { .. } | Self::LengthMismatch { .. }
        )
    }
}

//! # Packet Codec
//!
//! Encodes and decodes a single Niimbot packet to and from its wire frame.
//!
//! ## Frame Layout
//!
//! | Offset | Bytes | Meaning |
//! |--------|-------|---------|
//! | 0-1 | `55 55` | Start marker |
//! | 2 | u8 | Packet type / command code |
//! | 3 | u8 | Payload length (0-255) |
//! | 4.. | N bytes | Payload |
//! | N+4 | u8 | Checksum |
//! | N+5-6 | `AA AA` | End marker |
//!
//! ## Checksum
//!
//! ```text
//! checksum = type ^ len ^ payload[0] ^ payload[1] ^ ... ^ payload[len-1]
//! ```
//!
//! The XOR checksum catches any single corrupted byte between the markers
//! but has no collision resistance: two corrupted bytes can cancel out.
//!
//! ## Example
//!
//! ```
//! use niimbot::protocol::packet::Packet;
//!
//! let packet = Packet::new(0x23, vec![0x01])?;
//! let frame = packet.encode();
//! assert_eq!(frame, vec![0x55, 0x55, 0x23, 0x01, 0x01, 0x23, 0xAA, 0xAA]);
//! assert_eq!(Packet::decode(&frame)?, packet);
//! # Ok::<(), niimbot::ProtocolError>(())
//! ```

use crate::error::ProtocolError;

/// Two-byte start-of-frame marker
pub const START_MARKER: [u8; 2] = [0x55, 0x55];

/// Two-byte end-of-frame marker
pub const END_MARKER: [u8; 2] = [0xAA, 0xAA];

/// Bytes a frame carries besides its payload (markers, type, length, checksum)
pub const FRAME_OVERHEAD: usize = 7;

/// Largest payload a length byte can describe
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// A single protocol packet: a type code plus up to 255 payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    kind: u8,
    payload: Vec<u8>,
}

impl Packet {
    /// Create a packet, rejecting payloads longer than 255 bytes.
    pub fn new(kind: u8, payload: Vec<u8>) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }
        Ok(Self { kind, payload })
    }

    /// Packet type / command code
    #[inline]
    pub fn kind(&self) -> u8 {
        self.kind
    }

    /// Payload bytes
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the packet, returning its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Build the wire frame for this packet.
    pub fn encode(&self) -> Vec<u8> {
        // Packet::new guarantees the length fits in one byte.
        let len = self.payload.len() as u8;

        let mut frame = Vec::with_capacity(FRAME_OVERHEAD + self.payload.len());
        frame.extend_from_slice(&START_MARKER);
        frame.push(self.kind);
        frame.push(len);
        frame.extend_from_slice(&self.payload);
        frame.push(checksum(self.kind, len, &self.payload));
        frame.extend_from_slice(&END_MARKER);
        frame
    }

    /// Parse exactly one frame.
    ///
    /// The slice must start with the start marker and end with the end
    /// marker; leading garbage is not skipped. Decoding never partially
    /// succeeds.
    ///
    /// ## Errors
    ///
    /// - `MalformedFrame` if the frame is shorter than 7 bytes or a marker is missing
    /// - `ChecksumMismatch` if the checksum disagrees, including a corrupted
    ///   length byte
    /// - `LengthMismatch` if the checksum holds but the length byte still
    ///   disagrees with the framed payload
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < FRAME_OVERHEAD {
            return Err(ProtocolError::MalformedFrame(format!(
                "frame is {} bytes, minimum is {}",
                frame.len(),
                FRAME_OVERHEAD
            )));
        }
        if frame[..2] != START_MARKER {
            return Err(ProtocolError::MalformedFrame(format!(
                "missing start marker, found {:02X} {:02X}",
                frame[0], frame[1]
            )));
        }
        let tail = frame.len() - 2;
        if frame[tail..] != END_MARKER {
            return Err(ProtocolError::MalformedFrame(format!(
                "missing end marker, found {:02X} {:02X}",
                frame[tail],
                frame[tail + 1]
            )));
        }

        let kind = frame[2];
        let declared = frame[3];
        let payload = &frame[4..frame.len() - 3];

        let expected = checksum(kind, declared, payload);
        let actual = frame[frame.len() - 3];
        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        if payload.len() != declared as usize {
            return Err(ProtocolError::LengthMismatch {
                declared,
                actual: payload.len(),
            });
        }

        Ok(Self {
            kind,
            payload: payload.to_vec(),
        })
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Packet type={} payload={:02X?}>", self.kind, self.payload)
    }
}

/// XOR of the type byte, the length byte and every payload byte.
#[inline]
pub fn checksum(kind: u8, len: u8, payload: &[u8]) -> u8 {
    payload.iter().fold(kind ^ len, |acc, b| acc ^ b)
}

/// Split a `u16` into its high and low bytes.
///
/// All multi-byte integers in this protocol are **big-endian**.
#[inline]
pub fn u16_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

// ============================================================================
// TESTS
// ============================================================================

//! # Niimbot Wire Protocol
//!
//! Framing, command codes and stream reassembly for Niimbot label printers.
//!
//! ## Module Structure
//!
//! - [`packet`]: Frame encoding, decoding and checksum
//! - [`codes`]: Command codes, response offsets and model profiles
//! - [`stream`]: Reassembly of frames from a chunked byte stream
//!
//! ## Usage Example
//!
//! ```
//! use niimbot::protocol::packet::Packet;
//!
//! // SET_LABEL_TYPE with label type 1
//! let packet = Packet::new(35, vec![1])?;
//! let frame = packet.encode();
//! assert_eq!(frame, [0x55, 0x55, 35, 1, 1, 35, 0xAA, 0xAA]);
//!
//! assert_eq!(Packet::decode(&frame)?, packet);
//! # Ok::<(), niimbot::ProtocolError>(())
//! ```

pub mod codes;
pub mod packet;
pub mod stream;

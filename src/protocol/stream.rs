//! # Stream Reassembler
//!
//! Turns an arbitrarily chunked, possibly noisy byte stream into discrete
//! [`Packet`]s.
//!
//! ## Why Reassembly?
//!
//! A single physical read from the serial port may hold several packets,
//! part of a packet, or line noise. The reassembler keeps a fixed-size
//! window over the most recent read (the [`StreamCursor`]) and pulls a new
//! chunk from the [`ByteSource`] whenever the window is used up.
//!
//! ```text
//! read #1: ┌──────────────────────────────┐
//!          │ 00 17 55 55 24 01 01 24 AA AA│ 55 55 33 ...
//!          └──────────────────────────────┘
//!            └noise┘ └──── frame 1 ──────┘ └ frame 2 continues in read #2
//! ```
//!
//! ## Resynchronization
//!
//! Before every frame the reassembler slides a two-byte window across the
//! stream until it sees `55 55`. Everything before the marker (garbage,
//! the tail of a frame lost to an earlier exhaustion, a stray `0x55`) is
//! discarded.
//!
//! ## Exhaustion
//!
//! A source that returns zero bytes means "nothing more right now". The
//! reassembler never blocks waiting for more; a frame cut short by
//! exhaustion is dropped and the next cycle starts with a fresh marker scan.
//!
//! A read that comes back shorter than the window also marks the end of
//! what the device has sent so far. [`Reassembler::drain`] stops at the
//! first packet boundary after such a read is used up, so a device that
//! never goes quiet cannot keep one read cycle running forever.

use std::io::{ErrorKind, Read};

use tracing::{debug, trace};

use super::packet::{END_MARKER, FRAME_OVERHEAD, MAX_PAYLOAD, Packet, START_MARKER};
use crate::error::ProtocolError;

/// Default size of the read window (bytes)
pub const DEFAULT_CAPACITY: usize = 1024;

/// Longest frame the reassembler will accumulate before giving up on it
const MAX_FRAME_LEN: usize = FRAME_OVERHEAD + MAX_PAYLOAD;

/// Anything that can hand out raw bytes in chunks.
///
/// `Ok(0)` means no data is available this cycle. Every [`Read`] is a byte
/// source; read timeouts are reported as `Ok(0)` rather than as errors, so a
/// serial port opened with a read timeout behaves like a polled source.
pub trait ByteSource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError>;
}

impl<R: Read> ByteSource for R {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        loop {
            match self.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(0);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Read window over the most recent chunk.
///
/// Invariant: `pos <= filled <= buffer.len()`.
#[derive(Debug)]
pub struct StreamCursor {
    buffer: Box<[u8]>,
    filled: usize,
    pos: usize,
    short_read: bool,
}

impl StreamCursor {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            filled: 0,
            pos: 0,
            short_read: false,
        }
    }

    /// Bytes read from the source but not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.filled - self.pos
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the last refill came back with less than a full window.
    #[inline]
    pub fn last_read_short(&self) -> bool {
        self.short_read
    }

    /// Forget everything buffered.
    pub fn reset(&mut self) {
        self.filled = 0;
        self.pos = 0;
    }

    #[inline]
    fn take(&mut self) -> Option<u8> {
        if self.pos < self.filled {
            let byte = self.buffer[self.pos];
            self.pos += 1;
            Some(byte)
        } else {
            None
        }
    }

    fn refill<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Result<usize, ProtocolError> {
        self.reset();
        let n = source.read_chunk(&mut self.buffer)?;
        // A misbehaving source must not break the cursor invariant.
        self.filled = n.min(self.buffer.len());
        self.short_read = self.filled < self.buffer.len();
        if n > 0 {
            trace!(bytes = n, data = ?&self.buffer[..self.filled], "read chunk");
        }
        Ok(self.filled)
    }
}

impl Default for StreamCursor {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

/// # Stream Reassembler
///
/// Owns the [`StreamCursor`] for one session and extracts packets from a
/// [`ByteSource`].
///
/// ## Example
///
/// ```
/// use niimbot::protocol::packet::Packet;
/// use niimbot::protocol::stream::Reassembler;
///
/// let p1 = Packet::new(51, vec![1])?;
/// let p2 = Packet::new(2, vec![1])?;
///
/// let mut bytes = vec![0x00, 0x55, 0x13]; // noise, including a lone 0x55
/// bytes.extend(p1.encode());
/// bytes.extend(p2.encode());
///
/// let mut source = std::io::Cursor::new(bytes);
/// let mut reassembler = Reassembler::new();
/// assert_eq!(reassembler.drain(&mut source)?, vec![p1, p2]);
/// # Ok::<(), niimbot::ProtocolError>(())
/// ```
#[derive(Debug, Default)]
pub struct Reassembler {
    cursor: StreamCursor,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cursor: StreamCursor::with_capacity(capacity),
        }
    }

    /// Bytes buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.cursor.remaining()
    }

    /// Drop buffered bytes (session teardown).
    pub fn reset(&mut self) {
        self.cursor.reset();
    }

    /// Next byte of the stream, refilling from `source` when the window is
    /// used up. `Ok(None)` means the source has nothing more this cycle.
    pub fn next_byte<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<u8>, ProtocolError> {
        if let Some(byte) = self.cursor.take() {
            return Ok(Some(byte));
        }
        if self.cursor.refill(source)? == 0 {
            return Ok(None);
        }
        Ok(self.cursor.take())
    }

    /// Slide a `marker.len()`-byte window over the stream until it equals
    /// `marker`. Returns `false` if the stream runs dry first.
    pub fn scan_for_marker<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
        marker: &[u8],
    ) -> Result<bool, ProtocolError> {
        if marker.is_empty() {
            return Ok(true);
        }

        let mut window = vec![0u8; marker.len()];
        let mut seen = 0usize;
        let mut skipped = 0usize;

        while let Some(byte) = self.next_byte(source)? {
            window.rotate_left(1);
            if let Some(last) = window.last_mut() {
                *last = byte;
            }
            seen += 1;

            if seen >= marker.len() && window == marker {
                if skipped > 0 {
                    trace!(skipped, "resynchronized on marker");
                }
                return Ok(true);
            }
            if seen >= marker.len() {
                skipped += 1;
            }
        }
        Ok(false)
    }

    /// Having just consumed a start marker, collect bytes up to and
    /// including the end marker.
    ///
    /// Returns `Ok(None)` when the stream runs dry before the end marker;
    /// the partial frame is lost. A frame growing past the longest legal
    /// frame is reported as `MalformedFrame`.
    pub fn extract_frame<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<Vec<u8>>, ProtocolError> {
        let mut frame = START_MARKER.to_vec();

        loop {
            let Some(byte) = self.next_byte(source)? else {
                debug!(partial = frame.len(), "stream exhausted mid-frame, discarding");
                return Ok(None);
            };
            frame.push(byte);

            if frame.len() >= 4 && frame.ends_with(&END_MARKER) {
                return Ok(Some(frame));
            }
            if frame.len() > MAX_FRAME_LEN {
                return Err(ProtocolError::MalformedFrame(format!(
                    "no end marker within {} bytes",
                    MAX_FRAME_LEN
                )));
            }
        }
    }

    /// Scan for, extract and decode the next packet.
    ///
    /// Fails with `SourceExhausted` when the stream runs dry before a whole
    /// frame is available; codec errors on a complete frame propagate.
    pub fn next_packet<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Packet, ProtocolError> {
        if !self.scan_for_marker(source, &START_MARKER)? {
            return Err(ProtocolError::SourceExhausted);
        }
        let frame = self
            .extract_frame(source)?
            .ok_or(ProtocolError::SourceExhausted)?;
        let packet = Packet::decode(&frame)?;
        trace!(%packet, "received");
        Ok(packet)
    }

    /// Every packet currently reassemblable from `source`.
    ///
    /// Stops when the stream is exhausted, or at the first packet boundary
    /// once a short read has been used up. A frame that fails to decode
    /// aborts the whole cycle, since frame boundaries are ambiguous after a
    /// checksum failure.
    pub fn drain<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Vec<Packet>, ProtocolError> {
        let mut packets = Vec::new();
        loop {
            match self.next_packet(source) {
                Ok(packet) => {
                    packets.push(packet);
                    if self.cursor.remaining() == 0 && self.cursor.last_read_short() {
                        break;
                    }
                }
                Err(ProtocolError::SourceExhausted) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(packets)
    }
}

// ============================================================================
// TESTS
// ============================================================================

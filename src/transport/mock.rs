//! # Scripted Link
//!
//! An in-memory [`PrinterLink`](super::PrinterLink) whose reads follow a
//! script, for exercising the reassembler and transceiver without hardware.
//!
//! Each scripted entry is what one `read` call returns. An empty entry is a
//! read that times out with no data. A non-empty entry shorter than the
//! reader's window is a short read, which also ends a poll once its packets
//! are consumed. Once the script runs out every read returns zero bytes.
//!
//! ```
//! use niimbot::protocol::packet::Packet;
//! use niimbot::transport::ScriptedLink;
//!
//! let ack = Packet::new(51, vec![1])?;
//! let link = ScriptedLink::new()
//!     .silence()        // poll 1: nothing
//!     .respond(&ack);   // poll 2: the acknowledgement
//! assert_eq!(link.pending_reads(), 2);
//! # Ok::<(), niimbot::ProtocolError>(())
//! ```

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use crate::error::ProtocolError;
use crate::protocol::packet::Packet;
use crate::protocol::stream::Reassembler;

#[derive(Debug, Default, Clone)]
pub struct ScriptedLink {
    reads: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    read_calls: usize,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one read returning `bytes`.
    pub fn reply(mut self, bytes: &[u8]) -> Self {
        self.reads.push_back(bytes.to_vec());
        self
    }

    /// Queue one read returning nothing.
    pub fn silence(mut self) -> Self {
        self.reads.push_back(Vec::new());
        self
    }

    /// Queue `n` empty reads.
    pub fn silent_polls(mut self, n: usize) -> Self {
        for _ in 0..n {
            self.reads.push_back(Vec::new());
        }
        self
    }

    /// Queue a whole poll: one read carrying `packet`.
    pub fn respond(self, packet: &Packet) -> Self {
        self.reply(&packet.encode())
    }

    /// Queue a poll carrying several packets in one read.
    pub fn respond_all(self, packets: &[Packet]) -> Self {
        let bytes: Vec<u8> = packets.iter().flat_map(Packet::encode).collect();
        self.reply(&bytes)
    }

    /// Scripted reads not yet consumed.
    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }

    /// Number of `read` calls made so far.
    pub fn read_calls(&self) -> usize {
        self.read_calls
    }

    /// Every byte written to the link.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Decode everything written to the link back into packets.
    pub fn sent_packets(&self) -> Result<Vec<Packet>, ProtocolError> {
        let mut source = io::Cursor::new(self.written.as_slice());
        Reassembler::new().drain(&mut source)
    }
}

impl Read for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_calls += 1;
        let Some(mut chunk) = self.reads.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            // Larger than the caller's window: keep the rest for the next read.
            self.reads.push_front(chunk.split_off(n));
        }
        Ok(n)
    }
}

impl Write for ScriptedLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::PrinterLink;

    #[test]
    fn test_reads_follow_script() {
        let mut link = ScriptedLink::new().reply(&[1, 2, 3]).silence();
        let mut buf = [0u8; 8];
        assert_eq!(link.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(link.read(&mut buf).unwrap(), 0);
        assert_eq!(link.read(&mut buf).unwrap(), 0);
        assert_eq!(link.read_calls(), 3);
    }

    #[test]
    fn test_oversized_chunk_is_split() {
        let mut link = ScriptedLink::new().reply(&[1, 2, 3, 4, 5]);
        let mut buf = [0u8; 2];
        assert_eq!(link.read(&mut buf).unwrap(), 2);
        assert_eq!(link.read(&mut buf).unwrap(), 2);
        assert_eq!(link.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 5);
    }

    #[test]
    fn test_sent_packets_decodes_writes() {
        let mut link = ScriptedLink::new();
        let p = Packet::new(35, vec![1]).unwrap();
        link.send(&p.encode()).unwrap();
        link.send(&p.encode()).unwrap();
        assert_eq!(link.sent_packets().unwrap(), vec![p.clone(), p]);
    }
}

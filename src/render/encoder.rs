//! # Line Encoder
//!
//! Converts a binarized [`Bitmap`] into the sequence of image-line packets
//! the printer consumes.
//!
//! ## Run Merging
//!
//! Consecutive scanlines that are pixel-for-pixel identical collapse into a
//! single **run**. The packet for a run carries a repeat count, so the
//! printer replays the line instead of receiving it again.
//!
//! ```text
//! row 0  ░░░░░░░░   → run(start=0, repeat=1)
//! row 1  █░░░░░░░   ┐
//! row 2  █░░░░░░░   ├ run(start=1, repeat=3)
//! row 3  █░░░░░░░   ┘
//! row 4  ░░░░░░░█   → run(start=4, repeat=1)
//! ```
//!
//! Runs never cross a 200-row slice boundary, which also keeps the repeat
//! count within its single byte.
//!
//! ## Packet Layouts
//!
//! All multi-byte values are big-endian.
//!
//! | Packet | Code | Payload |
//! |--------|------|---------|
//! | `IMAGE_CLEAR` | 132 | row(2) repeat(1) |
//! | `SET_IMAGE` | 131 | row(2) histogram(⌈w/32⌉) repeat(1) column(2)... |
//! | `SET_IMAGE_DATA` | 133 | row(2) histogram(⌈w/32⌉) repeat(1) bitmask(⌈w/8⌉) |
//!
//! The **histogram** holds one byte per 32-pixel block: the number of black
//! pixels in that block. Firmware uses it to skip empty regions.
//!
//! ## Choosing an Encoding
//!
//! | Condition | Packet |
//! |-----------|--------|
//! | no black pixels | `IMAGE_CLEAR` |
//! | 2 × black < width / 8 | `SET_IMAGE` (list of black columns) |
//! | otherwise | `SET_IMAGE_DATA` (one bit per pixel, MSB = leftmost) |
//!
//! ## Example
//!
//! ```
//! use niimbot::render::bitmap::Bitmap;
//! use niimbot::render::encoder::encode_line_packets;
//! use niimbot::protocol::codes::{IMAGE_CLEAR, SET_IMAGE_DATA};
//!
//! let bitmap = Bitmap::from_rows(&[
//!     [0u8, 0, 0, 0, 0, 0, 0, 0],
//!     [1, 0, 0, 0, 0, 0, 0, 0],
//!     [1, 0, 0, 0, 0, 0, 0, 0],
//! ])?;
//! let packets = encode_line_packets(&bitmap)?;
//!
//! assert_eq!(packets.len(), 2);
//! assert_eq!(packets[0].kind(), IMAGE_CLEAR);
//! assert_eq!(packets[1].kind(), SET_IMAGE_DATA);
//! assert_eq!(packets[1].payload(), &[0, 1, 1, 2, 0x80]);
//! # Ok::<(), niimbot::ProtocolError>(())
//! ```

use tracing::debug;

use super::bitmap::Bitmap;
use crate::error::ProtocolError;
use crate::protocol::codes::{IMAGE_CLEAR, SET_IMAGE, SET_IMAGE_DATA};
use crate::protocol::packet::{Packet, u16_be};

/// Pixels summarized by one histogram byte
pub const BLOCK_PIXELS: usize = 32;

/// Rows encoded per slice; runs do not cross slice boundaries
pub const SLICE_ROWS: usize = 200;

/// A maximal group of consecutive identical scanlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanlineRun<'a> {
    pub start_row: usize,
    pub bits: &'a [bool],
    pub repeat_count: usize,
}

impl ScanlineRun<'_> {
    /// Number of black pixels in the scanline.
    pub fn black_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }
}

/// Wire representation chosen for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEncoding {
    /// Blank line(s)
    Clear,
    /// Column index of every black pixel
    Indexed,
    /// One bit per pixel
    Bitmask,
}

impl LineEncoding {
    /// Packet type used for this encoding.
    pub fn code(self) -> u8 {
        match self {
            Self::Clear => IMAGE_CLEAR,
            Self::Indexed => SET_IMAGE,
            Self::Bitmask => SET_IMAGE_DATA,
        }
    }
}

/// Pick the smaller representation for a scanline with `black` dots.
///
/// ```
/// use niimbot::render::encoder::{choose_encoding, LineEncoding};
///
/// assert_eq!(choose_encoding(0, 96), LineEncoding::Clear);
/// assert_eq!(choose_encoding(5, 96), LineEncoding::Indexed);   // 10 < 12
/// assert_eq!(choose_encoding(6, 96), LineEncoding::Bitmask);   // 12 == 12
/// ```
pub fn choose_encoding(black: usize, width: usize) -> LineEncoding {
    if black == 0 {
        LineEncoding::Clear
    } else if black * 2 < width / 8 {
        LineEncoding::Indexed
    } else {
        LineEncoding::Bitmask
    }
}

/// Group the bitmap's scanlines into runs of identical rows, top to bottom.
pub fn scanline_runs(bitmap: &Bitmap) -> Vec<ScanlineRun<'_>> {
    let mut runs: Vec<ScanlineRun<'_>> = Vec::new();

    for (y, row) in bitmap.rows().enumerate() {
        if let Some(last) = runs.last_mut() {
            let same_slice = last.start_row / SLICE_ROWS == y / SLICE_ROWS;
            if same_slice && last.bits == row {
                last.repeat_count += 1;
                continue;
            }
        }
        runs.push(ScanlineRun {
            start_row: y,
            bits: row,
            repeat_count: 1,
        });
    }

    runs
}

/// Black-pixel count of each 32-pixel block. The final block may be short.
pub fn block_histogram(bits: &[bool]) -> Vec<u8> {
    bits.chunks(BLOCK_PIXELS)
        .map(|block| block.iter().filter(|&&b| b).count() as u8)
        .collect()
}

/// Pack pixels MSB-first, 8 per byte, zero-padding the last byte.
///
/// ```
/// use niimbot::render::encoder::pack_bits;
///
/// let row = [true, true, true, true, false, false, false, false, true, false];
/// assert_eq!(pack_bits(&row), vec![0xF0, 0x80]);
/// ```
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|group| {
            group
                .iter()
                .enumerate()
                .filter(|(_, b)| **b)
                .fold(0u8, |acc, (i, _)| acc | (0x80 >> i))
        })
        .collect()
}

/// Column index of every black pixel, big-endian, two bytes each.
fn black_columns(bits: &[bool]) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::new();
    for (x, _) in bits.iter().enumerate().filter(|(_, b)| **b) {
        let column = u16::try_from(x).map_err(|_| {
            ProtocolError::InvalidArgument(format!("column {} does not fit in 16 bits", x))
        })?;
        out.extend_from_slice(&u16_be(column));
    }
    Ok(out)
}

/// Build the packet for one run.
pub fn encode_run(run: &ScanlineRun<'_>) -> Result<Packet, ProtocolError> {
    let row = u16::try_from(run.start_row).map_err(|_| {
        ProtocolError::InvalidArgument(format!("row {} does not fit in 16 bits", run.start_row))
    })?;
    let repeat = u8::try_from(run.repeat_count).map_err(|_| {
        ProtocolError::InvalidArgument(format!(
            "repeat count {} does not fit in one byte",
            run.repeat_count
        ))
    })?;

    let encoding = choose_encoding(run.black_count(), run.bits.len());
    let [row_hi, row_lo] = u16_be(row);

    if encoding == LineEncoding::Clear {
        return Packet::new(IMAGE_CLEAR, vec![row_hi, row_lo, repeat]);
    }

    let histogram = block_histogram(run.bits);
    let mut payload = Vec::with_capacity(3 + histogram.len() + run.bits.len().div_ceil(8));
    payload.push(row_hi);
    payload.push(row_lo);
    payload.extend_from_slice(&histogram);
    payload.push(repeat);

    match encoding {
        LineEncoding::Indexed => payload.extend(black_columns(run.bits)?),
        _ => payload.extend(pack_bits(run.bits)),
    }

    Packet::new(encoding.code(), payload)
}

/// Encode a whole bitmap into image-line packets, one per run, in row order.
///
/// ## Errors
///
/// - `PayloadTooLarge` if a dense line does not fit in one packet
///   (a mostly black line wider than 1608 pixels)
/// - `InvalidArgument` if a row index exceeds 16 bits
pub fn encode_line_packets(bitmap: &Bitmap) -> Result<Vec<Packet>, ProtocolError> {
    let runs = scanline_runs(bitmap);
    let packets = runs.iter().map(encode_run).collect::<Result<Vec<_>, _>>()?;
    debug!(
        width = bitmap.width(),
        height = bitmap.height(),
        packets = packets.len(),
        "encoded image lines"
    );
    Ok(packets)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(width: usize, black: &[usize]) -> Vec<u8> {
        let mut r = vec![0u8; width];
        for &x in black {
            r[x] = 1;
        }
        r
    }

    #[test]
    fn test_concrete_scenario() {
        let bitmap = Bitmap::from_rows(&[
            [0u8, 0, 0, 0, 0, 0, 0, 0],
            [1, 0, 0, 0, 0, 0, 0, 0],
            [1, 0, 0, 0, 0, 0, 0, 0],
            [1, 0, 0, 0, 0, 0, 0, 0],
            [0, 1, 0, 0, 0, 0, 0, 0],
        ])
        .unwrap();

        let packets = encode_line_packets(&bitmap).unwrap();
        assert_eq!(
            packets,
            vec![
                Packet::new(IMAGE_CLEAR, vec![0, 0, 1]).unwrap(),
                Packet::new(SET_IMAGE_DATA, vec![0, 1, 1, 3, 0x80]).unwrap(),
                Packet::new(SET_IMAGE_DATA, vec![0, 4, 1, 1, 0x40]).unwrap(),
            ]
        );
    }

    #[test]
    fn test_all_white_is_clear() {
        let run = ScanlineRun {
            start_row: 7,
            bits: &[false; 96],
            repeat_count: 2,
        };
        let packet = encode_run(&run).unwrap();
        assert_eq!(packet.kind(), IMAGE_CLEAR);
        assert_eq!(packet.payload(), &[0, 7, 2]);
    }

    #[test]
    fn test_all_black_is_bitmask() {
        let run = ScanlineRun {
            start_row: 0,
            bits: &[true; 96],
            repeat_count: 1,
        };
        let packet = encode_run(&run).unwrap();
        assert_eq!(packet.kind(), SET_IMAGE_DATA);
        // row(2) + histogram(3) + repeat(1) + bitmask(12)
        assert_eq!(packet.payload().len(), 18);
        assert_eq!(&packet.payload()[2..5], &[32, 32, 32]);
        assert!(packet.payload()[6..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_sparse_row_uses_indices() {
        // 96 px: bitmask is 12 bytes, 3 dots cost 6 bytes.
        let bits: Vec<bool> = row(96, &[0, 40, 95]).iter().map(|&v| v != 0).collect();
        let run = ScanlineRun {
            start_row: 300,
            bits: &bits,
            repeat_count: 4,
        };
        let packet = encode_run(&run).unwrap();
        assert_eq!(packet.kind(), SET_IMAGE);
        assert_eq!(
            packet.payload(),
            &[0x01, 0x2C, 1, 1, 1, 4, 0, 0, 0, 40, 0, 95]
        );
    }

    #[test]
    fn test_histogram_partial_block() {
        let mut bits = vec![true; 40];
        bits[35] = false;
        assert_eq!(block_histogram(&bits), vec![32, 7]);
    }

    #[test]
    fn test_width_not_multiple_of_eight() {
        let bitmap = Bitmap::from_rows(&[[1u8; 12]]).unwrap();
        let packets = encode_line_packets(&bitmap).unwrap();
        // 12 px: one short histogram block, two bitmask bytes, padded.
        assert_eq!(packets[0].payload(), &[0, 0, 12, 1, 0xFF, 0xF0]);
    }

    #[test]
    fn test_run_then_differing_row() {
        let rows: Vec<Vec<u8>> = (0..6)
            .map(|y| if y < 5 { row(16, &[3]) } else { row(16, &[4]) })
            .collect();
        let bitmap = Bitmap::from_rows(&rows).unwrap();
        let runs = scanline_runs(&bitmap);

        assert_eq!(runs.len(), 2);
        assert_eq!((runs[0].start_row, runs[0].repeat_count), (0, 5));
        assert_eq!((runs[1].start_row, runs[1].repeat_count), (5, 1));
    }

    #[test]
    fn test_identical_rows_not_adjacent_stay_separate() {
        let bitmap = Bitmap::from_rows(&[[1u8, 0], [0, 1], [1, 0]]).unwrap();
        assert_eq!(scanline_runs(&bitmap).len(), 3);
    }

    #[test]
    fn test_runs_split_at_slice_boundary() {
        let bitmap = Bitmap::new(8, 450);
        let runs = scanline_runs(&bitmap);
        let spans: Vec<(usize, usize)> = runs.iter().map(|r| (r.start_row, r.repeat_count)).collect();
        assert_eq!(spans, vec![(0, 200), (200, 200), (400, 50)]);

        let packets = encode_line_packets(&bitmap).unwrap();
        assert_eq!(packets[1].payload(), &[0, 200, 200]);
    }

    #[test]
    fn test_rows_monotonic() {
        let mut bitmap = Bitmap::new(32, 20);
        for y in (0..20).step_by(3) {
            bitmap.set(y, y, true);
        }
        let packets = encode_line_packets(&bitmap).unwrap();
        let rows: Vec<u16> = packets
            .iter()
            .map(|p| u16::from_be_bytes([p.payload()[0], p.payload()[1]]))
            .collect();
        assert!(rows.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_widest_dense_line() {
        // 2 row bytes + 51 histogram bytes + repeat + 201 bitmask bytes
        let bitmap = Bitmap::from_pixels(1608, 1, vec![true; 1608]).unwrap();
        let packets = encode_line_packets(&bitmap).unwrap();
        assert_eq!(packets[0].payload().len(), 255);

        let bitmap = Bitmap::from_pixels(1609, 1, vec![true; 1609]).unwrap();
        assert!(matches!(
            encode_line_packets(&bitmap),
            Err(ProtocolError::PayloadTooLarge(256))
        ));
    }

    #[test]
    fn test_too_wide_for_one_packet() {
        let bitmap = Bitmap::from_pixels(2048, 1, vec![true; 2048]).unwrap();
        assert!(matches!(
            encode_line_packets(&bitmap),
            Err(ProtocolError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn test_empty_bitmap() {
        assert!(encode_line_packets(&Bitmap::new(96, 0)).unwrap().is_empty());
    }
}

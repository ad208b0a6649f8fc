//! # Rendering Module
//!
//! Turns images into the line packets the printer consumes.
//!
//! ## Modules
//!
//! - [`binarize`]: Threshold decoded images to black and white
//! - [`bitmap`]: Binarized raster
//! - [`encoder`]: Run merging and image-line packet encoding
//!
//! ## Usage Example
//!
//! ```no_run
//! use niimbot::render::{binarize, encoder};
//!
//! let bitmap = binarize::load_bitmap("label.png")?;
//! let packets = encoder::encode_line_packets(&bitmap)?;
//! println!("{} line packets", packets.len());
//! # Ok::<(), niimbot::ProtocolError>(())
//! ```

pub mod binarize;
pub mod bitmap;
pub mod encoder;

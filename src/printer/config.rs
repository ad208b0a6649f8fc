//! # Printer Models
//!
//! Hardware limits and protocol profile for each supported label printer.
//!
//! ## Supported Printers
//!
//! | Model | Max width | Max height | Portrait only | Density | Pause | Profile |
//! |-------|-----------|------------|---------------|---------|-------|---------|
//! | D11 | 96 dots | 330 dots | yes | 1-3 | none | `d11` |
//! | B21 | 384 dots | unlimited | no | 0-3 | 50ms | `b-series` |
//!
//! ## Usage
//!
//! ```
//! use niimbot::printer::PrinterModel;
//!
//! let model = PrinterModel::parse("d11").unwrap();
//! println!("Print width: up to {} dots", model.max_width);
//! assert!(model.validate_image(96, 200).is_ok());
//! assert!(model.validate_image(120, 200).is_err());
//! ```

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::Serialize;

use crate::error::ProtocolError;
use crate::protocol::codes::ProtocolProfile;

/// Label types every model accepts (1 = gap, 2 = black mark, 3 = continuous)
pub const LABEL_TYPES: RangeInclusive<u8> = 1..=3;

/// # Printer Model
///
/// Describes one printer model: how large an image it accepts, which
/// parameter ranges it takes, and which [`ProtocolProfile`] it speaks.
///
/// ## Image Limits
///
/// - **max_width**: widest accepted image in dots
/// - **max_height**: tallest accepted image, `None` for continuous media
/// - **portrait_only**: reject images whose width is at least twice their
///   height (integer width / height > 1)
///
/// ## Pacing
///
/// - **command_pause_ms**: pause inserted between the setup commands of a
///   print job; some firmware drops commands that arrive back to back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrinterModel {
    /// Model name as accepted on the command line
    pub name: &'static str,

    /// Maximum image width in dots
    pub max_width: usize,

    /// Maximum image height in dots
    pub max_height: Option<usize>,

    pub portrait_only: bool,

    /// Lowest accepted print density
    pub density_min: u8,

    /// Highest accepted print density
    pub density_max: u8,

    /// Density used when none is given
    pub default_density: u8,

    pub command_pause_ms: u64,

    pub profile: ProtocolProfile,
}

impl PrinterModel {
    /// # Niimbot D11
    ///
    /// 12-15mm labels at 203 DPI, 96-dot print head.
    ///
    /// ```text
    /// ┌── 96 dots ──┐
    /// │             │ ▲
    /// │   label     │ │ up to 330 dots
    /// │             │ ▼
    /// └─────────────┘
    /// ```
    pub const D11: Self = Self {
        name: "d11",
        max_width: 96,
        max_height: Some(330),
        portrait_only: true,
        density_min: 1,
        density_max: 3,
        default_density: 2,
        command_pause_ms: 0,
        profile: ProtocolProfile::D11,
    };

    /// # Niimbot B21
    ///
    /// Up to 50mm labels, 384-dot print head, polled for completion.
    pub const B21: Self = Self {
        name: "b21",
        max_width: 384,
        max_height: None,
        portrait_only: false,
        density_min: 0,
        density_max: 3,
        default_density: 2,
        command_pause_ms: 50,
        profile: ProtocolProfile::B_SERIES,
    };

    /// Pause between setup commands.
    #[inline]
    pub fn command_pause(&self) -> Duration {
        Duration::from_millis(self.command_pause_ms)
    }

    /// Accepted density range.
    #[inline]
    pub fn densities(&self) -> RangeInclusive<u8> {
        self.density_min..=self.density_max
    }

    /// Check an image's dimensions against this model.
    pub fn validate_image(&self, width: usize, height: usize) -> Result<(), ProtocolError> {
        if width == 0 || height == 0 {
            return Err(ProtocolError::InvalidArgument(format!(
                "Image is empty ({}x{})",
                width, height
            )));
        }
        if width > self.max_width {
            return Err(ProtocolError::InvalidArgument(format!(
                "Image is {} dots wide, {} accepts at most {}",
                width, self.name, self.max_width
            )));
        }
        if let Some(max_height) = self.max_height {
            if height > max_height {
                return Err(ProtocolError::InvalidArgument(format!(
                    "Image is {} dots tall, {} accepts at most {}",
                    height, self.name, max_height
                )));
            }
        }
        if self.portrait_only && width / height > 1 {
            return Err(ProtocolError::InvalidArgument(format!(
                "{} requires portrait orientation, got {}x{}",
                self.name, width, height
            )));
        }
        Ok(())
    }

    pub fn validate_density(&self, density: u8) -> Result<(), ProtocolError> {
        if !self.densities().contains(&density) {
            return Err(ProtocolError::InvalidArgument(format!(
                "Density {} outside {}..={} for {}",
                density, self.density_min, self.density_max, self.name
            )));
        }
        Ok(())
    }

    pub fn validate_label_type(&self, label_type: u8) -> Result<(), ProtocolError> {
        if !LABEL_TYPES.contains(&label_type) {
            return Err(ProtocolError::InvalidArgument(format!(
                "Label type {} outside {}..={}",
                label_type,
                LABEL_TYPES.start(),
                LABEL_TYPES.end()
            )));
        }
        Ok(())
    }

    /// Parse a model name (case-insensitive).
    ///
    /// Formats:
    /// - `"d11"`
    /// - `"b21"`
    pub fn parse(s: &str) -> Result<Self, String> {
        let wanted = s.trim().to_lowercase();
        Self::built_in()
            .into_iter()
            .find(|m| m.name == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = Self::built_in().iter().map(|m| m.name).collect();
                format!("Unknown model '{}'. Use one of: {}", s, names.join(", "))
            })
    }

    /// List all built-in models.
    pub fn built_in() -> Vec<Self> {
        vec![Self::D11, Self::B21]
    }
}

impl Default for PrinterModel {
    fn default() -> Self {
        Self::D11
    }
}

// ============================================================================
// TESTS
// ============================================================================

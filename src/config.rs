//! Strategy and option types for a compression run.
//!
//! A [`Strategy`] is a closed tagged union: each variant owns the option
//! struct its command builder consumes, so one strategy's options can never
//! leak into another strategy's argument list. Display metadata and the
//! preset → quality-tier mapping are pure lookup tables on the tags rather
//! than behaviour attached to the variants.
//!
//! All option structs are plain values with `Default` impls; range checks
//! happen once, in [`Strategy::validate`], at the orchestration boundary.

use crate::error::SqueezeError;
use serde::{Deserialize, Serialize};

/// The three ways pdf-squeeze can shrink a document.
///
/// Immutable for the duration of one compression run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Restructure internal storage without altering rendered appearance (qpdf).
    Cleanup(CleanupOptions),
    /// Down-sample embedded images while keeping text selectable (Ghostscript).
    Lossy(LossyOptions),
    /// Flatten every page to a JPEG and rebuild the document (Ghostscript).
    Rasterize(RasterizeOptions),
}

impl Strategy {
    /// Human-readable strategy name for reports and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Cleanup(_) => "lossless cleanup",
            Strategy::Lossy(_) => "lossy recompression",
            Strategy::Rasterize(_) => "rasterize",
        }
    }

    /// Check option ranges before any tool is located or launched.
    pub fn validate(&self) -> Result<(), SqueezeError> {
        match self {
            Strategy::Cleanup(o) => {
                if !(1..=9).contains(&o.compression_level) {
                    return Err(SqueezeError::InvalidConfig(format!(
                        "compression level must be 1–9, got {}",
                        o.compression_level
                    )));
                }
            }
            Strategy::Lossy(o) => validate_raster_fields(o.dpi, o.quality)?,
            Strategy::Rasterize(o) => validate_raster_fields(o.dpi, o.quality)?,
        }
        Ok(())
    }
}

fn validate_raster_fields(dpi: u32, quality: u8) -> Result<(), SqueezeError> {
    if !(18..=1200).contains(&dpi) {
        return Err(SqueezeError::InvalidConfig(format!(
            "DPI must be 18–1200, got {dpi}"
        )));
    }
    if quality > 100 {
        return Err(SqueezeError::InvalidConfig(format!(
            "JPEG quality must be 0–100, got {quality}"
        )));
    }
    Ok(())
}

/// Options for the lossless cleanup strategy (qpdf).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOptions {
    /// Stream compression strength, 1–9.
    pub compression_level: u8,
    /// Pack objects into object streams.
    pub object_streams: bool,
    /// Decompress and recompress every flate stream (deep clean).
    pub recompress_flate: bool,
    /// Re-encode images where qpdf can do so losslessly.
    pub optimize_images: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            compression_level: 9,
            object_streams: false,
            recompress_flate: false,
            optimize_images: false,
        }
    }
}

/// Options for the lossy recompression strategy (Ghostscript `pdfwrite`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossyOptions {
    /// Preset selector. [`LossyPreset::Aggressive`] asserts a fixed quality
    /// tier and ignores the numeric fields below.
    pub preset: LossyPreset,
    /// Target resolution for down-sampled images.
    pub dpi: u32,
    /// Shared JPEG quality across colour channels, 0–100.
    pub quality: u8,
}

impl Default for LossyOptions {
    fn default() -> Self {
        LossyOptions::for_preset(LossyPreset::Balanced)
    }
}

impl LossyOptions {
    /// Options pre-filled with a preset's default numeric values.
    pub fn for_preset(preset: LossyPreset) -> Self {
        let (dpi, quality) = preset.defaults();
        Self {
            preset,
            dpi,
            quality,
        }
    }
}

/// Lossy recompression preset.
///
/// Each tag maps, via pure lookup tables, to a display title, default
/// numeric values, and an optional Ghostscript quality-tier token. Only the
/// tier token changes command-builder behaviour: when present it replaces
/// the per-channel down-sampling flags entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LossyPreset {
    /// Smallest output: Ghostscript's fixed `/screen` tier.
    Aggressive,
    /// Down-sample to a sensible default resolution. (default)
    #[default]
    Balanced,
    /// Caller supplies resolution and quality explicitly.
    Custom,
}

impl LossyPreset {
    /// Display title for pickers and reports.
    pub fn label(self) -> &'static str {
        match self {
            LossyPreset::Aggressive => "aggressive",
            LossyPreset::Balanced => "balanced",
            LossyPreset::Custom => "custom",
        }
    }

    /// Default `(dpi, quality)` values for this preset. The Aggressive
    /// numbers are never read by the command builder.
    pub fn defaults(self) -> (u32, u8) {
        match self {
            LossyPreset::Aggressive => (72, 40),
            LossyPreset::Balanced => (150, 60),
            LossyPreset::Custom => (150, 60),
        }
    }

    /// The Ghostscript `-dPDFSETTINGS` tier token, for presets that assert
    /// a fixed quality tier instead of explicit down-sampling flags.
    pub fn tier_token(self) -> Option<&'static str> {
        match self {
            LossyPreset::Aggressive => Some("/screen"),
            LossyPreset::Balanced | LossyPreset::Custom => None,
        }
    }
}

/// Options for the rasterize strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterizeOptions {
    /// Render resolution; also stamped on every reassembled page.
    pub dpi: u32,
    /// JPEG quality for rendered pages, 0–100.
    pub quality: u8,
}

impl Default for RasterizeOptions {
    fn default() -> Self {
        Self {
            dpi: 150,
            quality: 80,
        }
    }
}

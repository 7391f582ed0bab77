//! Shared constants for strip pagination
//!
//! This module centralizes the default tuning values used throughout
//! the merge, scan, repack and assembly stages.

// =============================================================================
// Canvas
// =============================================================================

/// Default normalized strip width in pixels
pub const DEFAULT_TARGET_WIDTH: u32 = 1500;

// =============================================================================
// Homogeneity Scanning
// =============================================================================

/// Channel values are integer-divided by this before colors are compared
pub const DEFAULT_QUANTIZATION_FACTOR: u8 = 32;

/// A row region with at most this many distinct quantized colors is "simple"
pub const DEFAULT_MAX_DISTINCT_COLORS: usize = 5;

/// Minimum height of a background band before it is used as a cut point
pub const DEFAULT_MIN_BAND_HEIGHT: u32 = 30;

/// Fraction of the width treated as the left/right margin
pub const DEFAULT_EDGE_MARGIN: f32 = 0.10;

/// Strips shorter than this many minimum band heights are never scanned
pub const MIN_SCAN_HEIGHT_FACTOR: u32 = 3;

// =============================================================================
// Ceilings
// =============================================================================

/// Largest page dimension, in pixels, the document format accepts
pub const DEFAULT_HARD_HEIGHT_CEILING: u32 = 65_500;

/// One mebibyte
pub const MIB: u64 = 1024 * 1024;

/// Byte ceiling for one repacked chunk
pub const DEFAULT_REPACK_MAX_BYTES: u64 = 8 * MIB;

/// Pixel-height ceiling for one repacked chunk
pub const DEFAULT_REPACK_MAX_HEIGHT: u32 = 30_000;

// =============================================================================
// Document Output
// =============================================================================

/// Output resolution in dots per inch
pub const DEFAULT_DPI: f32 = 300.0;

/// Lossy quality for images embedded in the document (1-100)
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Works processed at the same time by a batch
pub const DEFAULT_MAX_PARALLEL_WORKS: usize = 2;

/// Millimeters per inch
pub const MM_PER_INCH: f32 = 25.4;

/// Convert a pixel length at the given resolution to millimeters
#[inline]
pub fn px_to_mm(px: u32, dpi: f32) -> f32 {
    px as f32 / dpi * MM_PER_INCH
}

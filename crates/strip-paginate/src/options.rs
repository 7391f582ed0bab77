use crate::constants::*;
use crate::types::*;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Encoding used for repacked chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChunkFormat {
    /// Lossless PNG
    #[default]
    Png,
    /// Lossy JPEG at the given quality (1-100)
    Jpeg { quality: u8 },
}

impl ChunkFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ChunkFormat::Png => "png",
            ChunkFormat::Jpeg { .. } => "jpg",
        }
    }
}

/// Complete pipeline configuration, passed by reference to every stage
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineOptions {
    // Canvas
    pub target_width: u32,

    // Homogeneity scanning
    pub quantization_factor: u8,
    pub max_distinct_colors: usize,
    pub min_band_height: u32,
    pub edge_margin: f32,

    // Ceilings
    pub hard_height_ceiling: u32,
    pub repack_max_bytes: u64,
    pub repack_max_height: u32,
    pub chunk_format: ChunkFormat,

    // Document
    pub dpi: f32,
    pub jpeg_quality: Option<u8>,

    // Resources
    /// Threads used to encode chunks, 0 picks one per core
    pub encode_threads: usize,
    pub max_parallel_works: usize,

    // Locations
    pub output_dir: PathBuf,
    /// When set, the strip and every chunk are also written here
    pub intermediate_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            quantization_factor: DEFAULT_QUANTIZATION_FACTOR,
            max_distinct_colors: DEFAULT_MAX_DISTINCT_COLORS,
            min_band_height: DEFAULT_MIN_BAND_HEIGHT,
            edge_margin: DEFAULT_EDGE_MARGIN,
            hard_height_ceiling: DEFAULT_HARD_HEIGHT_CEILING,
            repack_max_bytes: DEFAULT_REPACK_MAX_BYTES,
            repack_max_height: DEFAULT_REPACK_MAX_HEIGHT,
            chunk_format: ChunkFormat::Png,
            dpi: DEFAULT_DPI,
            jpeg_quality: Some(DEFAULT_JPEG_QUALITY),
            encode_threads: 0,
            max_parallel_works: DEFAULT_MAX_PARALLEL_WORKS,
            output_dir: PathBuf::from("."),
            intermediate_dir: None,
        }
    }
}

/// Parameters of the homogeneity scanner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOptions {
    pub quantization_factor: u8,
    pub max_distinct_colors: usize,
    pub min_band_height: u32,
    pub edge_margin: f32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            quantization_factor: DEFAULT_QUANTIZATION_FACTOR,
            max_distinct_colors: DEFAULT_MAX_DISTINCT_COLORS,
            min_band_height: DEFAULT_MIN_BAND_HEIGHT,
            edge_margin: DEFAULT_EDGE_MARGIN,
        }
    }
}

/// Dual ceilings applied by the repacker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepackLimits {
    pub max_bytes: u64,
    pub max_height: u32,
}

/// Parameters of the document assembler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentOptions {
    pub page_width: u32,
    pub dpi: f32,
    pub jpeg_quality: Option<u8>,
    /// Pages wider or taller than this many pixels are dropped
    pub max_page_dimension: u32,
}

impl PipelineOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| PaginateError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PaginateError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            quantization_factor: self.quantization_factor,
            max_distinct_colors: self.max_distinct_colors,
            min_band_height: self.min_band_height,
            edge_margin: self.edge_margin,
        }
    }

    pub fn repack_limits(&self) -> RepackLimits {
        RepackLimits {
            max_bytes: self.repack_max_bytes,
            max_height: self.repack_max_height,
        }
    }

    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            page_width: self.target_width,
            dpi: self.dpi,
            jpeg_quality: self.jpeg_quality,
            max_page_dimension: self.hard_height_ceiling,
        }
    }

    /// Height the safety splitter enforces so that every chunk fits both ceilings
    pub fn split_ceiling(&self) -> u32 {
        self.hard_height_ceiling.min(self.repack_max_height)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 {
            return Err(PaginateError::Config(
                "Target width must be greater than zero".to_string(),
            ));
        }
        if self.quantization_factor == 0 {
            return Err(PaginateError::Config(
                "Quantization factor must be at least 1".to_string(),
            ));
        }
        if self.max_distinct_colors == 0 {
            return Err(PaginateError::Config(
                "Maximum distinct colors must be at least 1".to_string(),
            ));
        }
        if self.min_band_height == 0 {
            return Err(PaginateError::Config(
                "Minimum band height must be at least 1".to_string(),
            ));
        }
        if !(self.edge_margin > 0.0 && self.edge_margin < 0.5) {
            return Err(PaginateError::Config(format!(
                "Edge margin must be between 0 and 0.5, got {}",
                self.edge_margin
            )));
        }
        if self.hard_height_ceiling == 0 || self.repack_max_height == 0 {
            return Err(PaginateError::Config(
                "Height ceilings must be greater than zero".to_string(),
            ));
        }
        if self.repack_max_bytes == 0 {
            return Err(PaginateError::Config(
                "Repack size ceiling must be greater than zero".to_string(),
            ));
        }
        if self.repack_max_height > self.hard_height_ceiling {
            return Err(PaginateError::Config(format!(
                "Repack height ceiling ({}) must not exceed the hard height ceiling ({})",
                self.repack_max_height, self.hard_height_ceiling
            )));
        }
        if !(self.dpi > 0.0) {
            return Err(PaginateError::Config(
                "Resolution must be greater than zero".to_string(),
            ));
        }
        let quality_in_range = |q: u8| (1..=100).contains(&q);
        if let Some(q) = self.jpeg_quality {
            if !quality_in_range(q) {
                return Err(PaginateError::Config(format!(
                    "JPEG quality must be between 1 and 100, got {}",
                    q
                )));
            }
        }
        if let ChunkFormat::Jpeg { quality } = self.chunk_format {
            if !quality_in_range(quality) {
                return Err(PaginateError::Config(format!(
                    "Chunk JPEG quality must be between 1 and 100, got {}",
                    quality
                )));
            }
        }
        if self.max_parallel_works == 0 {
            return Err(PaginateError::Config(
                "At least one work must be allowed to run".to_string(),
            ));
        }

        Ok(())
    }
}

use image::RgbImage;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaginateError {
    /// A source image could not be read or decoded
    #[error("Decode error: {0}")]
    Decode(String),
    /// An image has zero width or height after normalization
    #[error("Geometry error: {0}")]
    Geometry(String),
    /// A chunk or page could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),
    /// A single chunk is still larger than the byte ceiling
    #[error("Chunk {index} encodes to {size} bytes, over the {limit} byte ceiling")]
    CeilingViolation { index: usize, size: u64, limit: u64 },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, PaginateError>;

/// Classification of one strip row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowClass {
    /// Simple, near-uniform row that is safe to cut through
    Background,
    /// Anything else
    Content,
}

/// Maximal run of equally classified rows, `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub start: u32,
    pub end: u32,
    pub class: RowClass,
}

impl Band {
    pub fn height(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_background(&self) -> bool {
        self.class == RowClass::Background
    }
}

/// Crop of the strip between two cut coordinates
#[derive(Debug, Clone)]
pub struct Segment {
    /// Row of the strip this segment starts at
    pub top: u32,
    pub image: RgbImage,
}

impl Segment {
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.height()
    }
}

/// Consecutive segments concatenated and encoded
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position of this chunk in reading order
    pub index: usize,
    /// Row of the strip this chunk starts at
    pub top: u32,
    /// Number of segments folded into this chunk
    pub segment_count: usize,
    pub image: RgbImage,
    /// Final encoding of `image`
    pub encoded: Vec<u8>,
    /// Set when `encoded` is over the byte ceiling
    pub oversized: bool,
}

impl Chunk {
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn encoded_len(&self) -> u64 {
        self.encoded.len() as u64
    }
}

/// Why a source image was left out of the strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkipKind {
    Decode,
    Geometry,
}

/// Source image excluded from the strip
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkippedSource {
    pub path: PathBuf,
    pub kind: SkipKind,
    pub reason: String,
}

/// Chunk that was emitted even though it breaks the byte ceiling
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OversizedChunk {
    pub index: usize,
    pub height: u32,
    pub encoded_bytes: u64,
    pub limit: u64,
}

/// One work: an identifier and its page images in reading order
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkUnit {
    pub id: String,
    pub sources: Vec<PathBuf>,
}

impl WorkUnit {
    pub fn new(id: impl Into<String>, sources: Vec<PathBuf>) -> Self {
        Self {
            id: id.into(),
            sources,
        }
    }

    /// File name of the generated document, derived only from the id
    pub fn document_file_name(&self) -> String {
        let mut name: String = self
            .id
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        if name.trim().is_empty() {
            name = "untitled".to_string();
        }
        format!("{}.pdf", name)
    }
}

/// Outcome class of one work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WorkStatus {
    /// Document written, nothing skipped or dropped
    Success,
    /// Document written, but some sources were skipped or pages dropped
    PartialFailure,
    /// No document could be produced
    Failure,
}

/// Structured result reported back for every work
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkResult {
    pub work_id: String,
    pub status: WorkStatus,
    pub output_path: Option<PathBuf>,
    pub page_count: usize,
    pub dropped_pages: usize,
    pub skipped_sources: Vec<SkippedSource>,
    pub oversized_chunks: Vec<OversizedChunk>,
    /// Reason for a `Failure`
    pub error: Option<String>,
}

impl WorkResult {
    pub fn failure(work_id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            work_id: work_id.into(),
            status: WorkStatus::Failure,
            output_path: None,
            page_count: 0,
            dropped_pages: 0,
            skipped_sources: Vec::new(),
            oversized_chunks: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Statistics about how a strip would be segmented
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationStatistics {
    pub strip_width: u32,
    pub strip_height: u32,
    /// True when the strip was too short to be worth scanning
    pub scan_skipped: bool,
    pub bands: usize,
    pub background_bands: usize,
    /// Cut coordinates the planner accepted
    pub cuts: Vec<u32>,
    /// Segments after planning
    pub segments: usize,
    /// Extra segments created by the height ceiling
    pub forced_slices: usize,
}

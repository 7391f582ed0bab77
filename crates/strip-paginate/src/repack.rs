//! Repacker: regroups ordered segments into chunks under byte and height ceilings
//!
//! Grouping is a run-length problem, not general bin packing: segments keep
//! their reading order and a chunk is closed as soon as the next segment
//! would push it over either ceiling.

use crate::options::{ChunkFormat, RepackLimits};
use crate::types::*;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, imageops};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::ops::Range;

/// Serializes a chunk raster to bytes
pub trait ChunkEncoder: Send + Sync {
    fn encode(&self, image: &RgbImage) -> Result<Vec<u8>>;

    /// File extension matching the encoded bytes
    fn extension(&self) -> &'static str;
}

/// Encoder backed by the `image` codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RasterEncoder {
    pub format: ChunkFormat,
}

impl RasterEncoder {
    pub fn new(format: ChunkFormat) -> Self {
        Self { format }
    }
}

impl ChunkEncoder for RasterEncoder {
    fn encode(&self, image: &RgbImage) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        let mut bytes = Vec::new();
        let written = match self.format {
            ChunkFormat::Png => PngEncoder::new(&mut bytes).write_image(
                image.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            ),
            ChunkFormat::Jpeg { quality } => JpegEncoder::new_with_quality(&mut bytes, quality)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8),
        };
        written.map_err(|e| PaginateError::Encode(format!("{}x{}: {}", width, height, e)))?;
        Ok(bytes)
    }

    fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Chunks in reading order plus what went wrong producing them
#[derive(Debug)]
pub struct RepackOutcome {
    pub chunks: Vec<Chunk>,
    pub oversized: Vec<OversizedChunk>,
    /// Chunks that could not be encoded and were left out
    pub dropped: usize,
}

/// Build the bounded pool used for encoding; `0` threads picks one per core
pub fn encoding_pool(threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("chunk-encode-{}", i))
        .build()
        .map_err(|e| PaginateError::Encode(format!("Failed to start encoder pool: {}", e)))
}

/// Group consecutive segments, given their heights and encoded sizes.
///
/// A segment that is over a ceiling on its own still gets a group of its own.
pub fn group_segments(heights: &[u32], sizes: &[u64], limits: &RepackLimits) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut open_bytes: u64 = 0;
    let mut open_height: u64 = 0;

    for (i, (&height, &size)) in heights.iter().zip(sizes).enumerate() {
        let open = i > start;
        let over_bytes = open_bytes + size > limits.max_bytes;
        let over_height = open_height + height as u64 > limits.max_height as u64;
        if open && (over_bytes || over_height) {
            groups.push(start..i);
            start = i;
            open_bytes = 0;
            open_height = 0;
        }
        open_bytes += size;
        open_height += height as u64;
    }
    if start < heights.len().min(sizes.len()) {
        groups.push(start..heights.len().min(sizes.len()));
    }
    groups
}

/// Stack images top to bottom; all must share one width
fn stack(images: Vec<RgbImage>) -> RgbImage {
    if images.len() == 1 {
        return images.into_iter().next().unwrap_or_default();
    }
    let width = images.first().map(|image| image.width()).unwrap_or(0);
    let height = images.iter().map(|image| image.height()).sum();
    let mut canvas = RgbImage::new(width, height);
    let mut offset = 0i64;
    for image in images {
        imageops::replace(&mut canvas, &image, 0, offset);
        offset += image.height() as i64;
    }
    canvas
}

struct PendingChunk {
    index: usize,
    top: u32,
    segment_count: usize,
    image: RgbImage,
    /// Encoding carried over from measurement for single-segment chunks
    encoded: Option<Vec<u8>>,
}

/// Repack `segments` into chunks under `limits`, consuming them.
///
/// Every segment is encoded once to learn its size; the projected size of a
/// chunk is the sum of its members. Final chunk encoding runs on a pool of
/// `threads` workers. Chunk boundaries depend only on the segment sequence,
/// the encoder and the limits.
pub fn repack(
    segments: Vec<Segment>,
    limits: &RepackLimits,
    encoder: &dyn ChunkEncoder,
    threads: usize,
) -> Result<RepackOutcome> {
    if segments.is_empty() {
        return Ok(RepackOutcome {
            chunks: Vec::new(),
            oversized: Vec::new(),
            dropped: 0,
        });
    }

    let pool = encoding_pool(threads)?;

    let measured: Vec<Option<Vec<u8>>> = pool.install(|| {
        segments
            .par_iter()
            .map(|segment| match encoder.encode(&segment.image) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("Could not measure segment at y={}: {}", segment.top, e);
                    None
                }
            })
            .collect()
    });
    let sizes: Vec<u64> = measured
        .iter()
        .zip(&segments)
        .map(|(bytes, segment)| match bytes {
            Some(bytes) => bytes.len() as u64,
            // Raw RGB size as a pessimistic stand-in
            None => segment.image.as_raw().len() as u64,
        })
        .collect();
    let heights: Vec<u32> = segments.iter().map(Segment::height).collect();

    let groups = group_segments(&heights, &sizes, limits);
    debug!(
        "Grouped {} segments into {} chunks",
        segments.len(),
        groups.len()
    );

    let mut segments = segments.into_iter();
    let mut measured = measured.into_iter();
    let mut pending = Vec::with_capacity(groups.len());
    for (index, group) in groups.into_iter().enumerate() {
        let count = group.len();
        let members: Vec<Segment> = segments.by_ref().take(count).collect();
        let encodings: Vec<Option<Vec<u8>>> = measured.by_ref().take(count).collect();
        let top = members.first().map(|s| s.top).unwrap_or(0);
        let encoded = if count == 1 {
            encodings.into_iter().next().flatten()
        } else {
            None
        };
        pending.push(PendingChunk {
            index,
            top,
            segment_count: count,
            image: stack(members.into_iter().map(|s| s.image).collect()),
            encoded,
        });
    }

    let encoded: Vec<Result<Chunk>> = pool.install(|| {
        pending
            .into_par_iter()
            .map(|p| {
                let bytes = match p.encoded {
                    Some(bytes) => bytes,
                    None => encoder.encode(&p.image)?,
                };
                let oversized = bytes.len() as u64 > limits.max_bytes;
                Ok(Chunk {
                    index: p.index,
                    top: p.top,
                    segment_count: p.segment_count,
                    image: p.image,
                    encoded: bytes,
                    oversized,
                })
            })
            .collect()
    });

    let mut chunks = Vec::with_capacity(encoded.len());
    let mut oversized = Vec::new();
    let mut dropped = 0;
    for result in encoded {
        match result {
            Ok(chunk) => {
                if chunk.oversized {
                    let violation = PaginateError::CeilingViolation {
                        index: chunk.index,
                        size: chunk.encoded_len(),
                        limit: limits.max_bytes,
                    };
                    warn!("{}", violation);
                    oversized.push(OversizedChunk {
                        index: chunk.index,
                        height: chunk.height(),
                        encoded_bytes: chunk.encoded_len(),
                        limit: limits.max_bytes,
                    });
                }
                chunks.push(chunk);
            }
            Err(e) => {
                warn!("Dropping chunk: {}", e);
                dropped += 1;
            }
        }
    }

    info!(
        "Repacked into {} chunks ({} oversized, {} dropped)",
        chunks.len(),
        oversized.len(),
        dropped
    );

    Ok(RepackOutcome {
        chunks,
        oversized,
        dropped,
    })
}

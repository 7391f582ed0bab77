//! Per-work pipeline: merge, scan, plan, split, repack, assemble
//!
//! Each stage consumes the rasters of the previous one, so at most one
//! generation of pixel buffers is alive at a time.

use crate::assemble::assemble_document;
use crate::merge::merge_strip;
use crate::options::PipelineOptions;
use crate::plan::{cut_segments, plan_cuts};
use crate::repack::{ChunkEncoder, RasterEncoder, repack};
use crate::scan::scan_bands;
use crate::split::enforce_height_ceiling;
use crate::types::*;
use image::RgbImage;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

/// Scan, plan and split `strip` into height-bounded segments, consuming it
pub fn segment_strip(strip: RgbImage, options: &PipelineOptions) -> Vec<Segment> {
    let scan_options = options.scan_options();
    let bands = scan_bands(&strip, &scan_options);
    let cuts = plan_cuts(&bands, scan_options.min_band_height);
    if cuts.is_empty() {
        info!("No usable background band, keeping the strip whole");
    }
    let segments = cut_segments(strip, &cuts);
    enforce_height_ceiling(segments, options.split_ceiling())
}

fn cache_intermediates(dir: &Path, work: &WorkUnit, strip: &RgbImage) {
    let path = dir.join(format!("{}_strip.png", file_stem(work)));
    let saved = std::fs::create_dir_all(dir)
        .map_err(PaginateError::from)
        .and_then(|_| strip.save(&path).map_err(PaginateError::from));
    if let Err(e) = saved {
        warn!("Could not cache strip to {}: {}", path.display(), e);
    }
}

fn cache_chunks(dir: &Path, work: &WorkUnit, chunks: &[Chunk], extension: &str) {
    for chunk in chunks {
        let path = dir.join(format!(
            "{}_chunk_{}.{}",
            file_stem(work),
            chunk.index + 1,
            extension
        ));
        if let Err(e) = std::fs::write(&path, &chunk.encoded) {
            warn!("Could not cache chunk to {}: {}", path.display(), e);
        }
    }
}

fn file_stem(work: &WorkUnit) -> String {
    let name = work.document_file_name();
    name.trim_end_matches(".pdf").to_string()
}

/// Path the document for `work` is written to
pub fn output_path(work: &WorkUnit, options: &PipelineOptions) -> PathBuf {
    options.output_dir.join(work.document_file_name())
}

/// What a work has lost or flagged so far, kept even when a later stage fails
#[derive(Debug, Default)]
struct WorkTally {
    skipped: Vec<SkippedSource>,
    oversized: Vec<OversizedChunk>,
    dropped_pages: usize,
}

/// Run one work start to finish.
///
/// Per-image and per-page problems are recorded in the result; the work only
/// fails when no document can be produced.
pub fn run_work(work: &WorkUnit, options: &PipelineOptions) -> WorkResult {
    let mut tally = WorkTally::default();
    match try_run_work(work, options, &mut tally) {
        Ok(result) => result,
        Err(e) => {
            error!("Work '{}' failed: {}", work.id, e);
            let mut result = WorkResult::failure(&work.id, e);
            result.skipped_sources = tally.skipped;
            result.oversized_chunks = tally.oversized;
            result.dropped_pages = tally.dropped_pages;
            result
        }
    }
}

fn try_run_work(
    work: &WorkUnit,
    options: &PipelineOptions,
    tally: &mut WorkTally,
) -> Result<WorkResult> {
    options.validate()?;
    info!(
        "Processing work '{}' ({} sources)",
        work.id,
        work.sources.len()
    );

    let merged = merge_strip(&work.sources, options.target_width)?;
    tally.skipped.extend(merged.skipped);
    if let Some(dir) = &options.intermediate_dir {
        cache_intermediates(dir, work, &merged.strip);
    }

    let segments = segment_strip(merged.strip, options);

    let encoder = RasterEncoder::new(options.chunk_format);
    let repacked = repack(
        segments,
        &options.repack_limits(),
        &encoder,
        options.encode_threads,
    )?;
    tally.oversized = repacked.oversized;
    tally.dropped_pages = repacked.dropped;
    if let Some(dir) = &options.intermediate_dir {
        cache_chunks(dir, work, &repacked.chunks, encoder.extension());
    }

    // A failed assembly loses every page it was handed
    let handed = repacked.chunks.len();
    let document = assemble_document(&work.id, repacked.chunks, &options.document_options())
        .inspect_err(|_| tally.dropped_pages += handed)?;
    tally.dropped_pages += document.dropped_pages;

    let path = output_path(work, options);
    std::fs::create_dir_all(&options.output_dir)?;
    std::fs::write(&path, &document.bytes)?;

    let status = if tally.skipped.is_empty() && tally.dropped_pages == 0 {
        WorkStatus::Success
    } else {
        WorkStatus::PartialFailure
    };
    info!(
        "Wrote {} ({} pages) for work '{}'",
        path.display(),
        document.page_count,
        work.id
    );

    Ok(WorkResult {
        work_id: work.id.clone(),
        status,
        output_path: Some(path),
        page_count: document.page_count,
        dropped_pages: tally.dropped_pages,
        skipped_sources: std::mem::take(&mut tally.skipped),
        oversized_chunks: std::mem::take(&mut tally.oversized),
        error: None,
    })
}

/// Run one work on the blocking pool
pub async fn process_work(work: WorkUnit, options: PipelineOptions) -> WorkResult {
    let id = work.id.clone();
    match tokio::task::spawn_blocking(move || run_work(&work, &options)).await {
        Ok(result) => result,
        Err(e) => WorkResult::failure(id, PaginateError::from(e)),
    }
}

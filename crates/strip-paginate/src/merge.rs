//! Canvas merger: stitches the page images of one work into a single strip

use crate::types::*;
use image::imageops::{self, FilterType};
use image::{ImageReader, Rgb, RgbImage};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Decoded source page, dropped as soon as it has been pasted
#[derive(Debug)]
pub struct PageImage {
    /// Position in the caller's reading order
    pub index: usize,
    pub path: PathBuf,
    pub image: RgbImage,
}

/// Stitched strip plus what was left out of it
#[derive(Debug)]
pub struct MergeOutcome {
    pub strip: RgbImage,
    /// Height each included page contributed, in paste order
    pub page_heights: Vec<u32>,
    pub skipped: Vec<SkippedSource>,
}

struct PlannedPage {
    index: usize,
    path: PathBuf,
}

/// Height of a `width` x `height` image once scaled to `target_width`.
///
/// Fails with a geometry error when the image has no area, collapses to zero
/// rows, or grows past what a raster height can hold.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> Result<u32> {
    if width == 0 || height == 0 {
        return Err(PaginateError::Geometry(format!(
            "image is {}x{}",
            width, height
        )));
    }
    if width == target_width {
        return Ok(height);
    }
    let scaled = height as u64 * target_width as u64 / width as u64;
    if scaled == 0 {
        return Err(PaginateError::Geometry(format!(
            "{}x{} collapses to zero height at width {}",
            width, height, target_width
        )));
    }
    u32::try_from(scaled).map_err(|_| {
        PaginateError::Geometry(format!(
            "{}x{} grows to {} rows at width {}",
            width, height, scaled, target_width
        ))
    })
}

/// Resize to `target_width`, keeping the aspect ratio
pub fn normalize_width(image: RgbImage, target_width: u32) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    let new_height = scaled_height(width, height, target_width)?;
    if width == target_width {
        return Ok(image);
    }
    Ok(imageops::resize(
        &image,
        target_width,
        new_height,
        FilterType::Lanczos3,
    ))
}

/// Decode one source image as RGB
pub fn load_page(index: usize, path: impl AsRef<Path>) -> Result<PageImage> {
    let path = path.as_ref();
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| PaginateError::Decode(format!("{}: {}", path.display(), e)))?
        .into_rgb8();
    Ok(PageImage {
        index,
        path: path.to_owned(),
        image,
    })
}

fn skip(skipped: &mut Vec<SkippedSource>, path: &Path, error: &PaginateError) {
    let kind = match error {
        PaginateError::Geometry(_) => SkipKind::Geometry,
        _ => SkipKind::Decode,
    };
    warn!("Skipping {}: {}", path.display(), error);
    skipped.push(SkippedSource {
        path: path.to_owned(),
        kind,
        reason: error.to_string(),
    });
}

/// Stitch `paths` top to bottom into one strip of width `target_width`.
///
/// Headers are read first so the canvas can be allocated once; each page is
/// then decoded, normalized, pasted and freed before the next one is loaded.
/// Unreadable pages are skipped and excluded from the strip height.
pub fn merge_strip(paths: &[impl AsRef<Path>], target_width: u32) -> Result<MergeOutcome> {
    if target_width == 0 {
        return Err(PaginateError::Geometry("target width is zero".to_string()));
    }
    if paths.is_empty() {
        return Err(PaginateError::Decode("no source images given".to_string()));
    }

    let mut skipped = Vec::new();
    let mut planned = Vec::with_capacity(paths.len());
    let mut total_height: u64 = 0;

    for (index, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let (width, height) = match image::image_dimensions(path) {
            Ok(dims) => dims,
            Err(e) => {
                skip(&mut skipped, path, &PaginateError::Decode(e.to_string()));
                continue;
            }
        };
        let scaled = match scaled_height(width, height, target_width) {
            Ok(scaled) => scaled,
            Err(e) => {
                skip(&mut skipped, path, &e);
                continue;
            }
        };
        total_height += scaled as u64;
        planned.push(PlannedPage {
            index,
            path: path.to_owned(),
        });
    }

    if planned.is_empty() {
        return Err(PaginateError::Decode(format!(
            "none of the {} source images could be read",
            paths.len()
        )));
    }
    let total_height = u32::try_from(total_height).map_err(|_| {
        PaginateError::Geometry(format!("strip height {} is too large", total_height))
    })?;

    info!(
        "Merging {} images into a {}x{} strip",
        planned.len(),
        target_width,
        total_height
    );

    let mut canvas = RgbImage::from_pixel(target_width, total_height, Rgb([255, 255, 255]));
    let mut page_heights = Vec::with_capacity(planned.len());
    let mut offset: u32 = 0;

    for page in planned {
        let result = load_page(page.index, &page.path)
            .and_then(|loaded| normalize_width(loaded.image, target_width));
        let image = match result {
            Ok(image) => image,
            Err(e) => {
                skip(&mut skipped, &page.path, &e);
                continue;
            }
        };
        if offset as u64 + image.height() as u64 > total_height as u64 {
            let error = PaginateError::Geometry(format!(
                "decoded size differs from header ({} rows do not fit)",
                image.height()
            ));
            skip(&mut skipped, &page.path, &error);
            continue;
        }
        imageops::replace(&mut canvas, &image, 0, offset as i64);
        debug!(
            "Pasted page {} ({} rows) at y={}",
            page.index,
            image.height(),
            offset
        );
        offset += image.height();
        page_heights.push(image.height());
    }

    if offset == 0 {
        return Err(PaginateError::Decode(
            "no source image could be decoded".to_string(),
        ));
    }
    if offset < total_height {
        canvas = imageops::crop_imm(&canvas, 0, 0, target_width, offset).to_image();
    }

    Ok(MergeOutcome {
        strip: canvas,
        page_heights,
        skipped,
    })
}

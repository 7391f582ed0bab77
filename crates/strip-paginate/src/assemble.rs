//! Document assembler: one PDF page per chunk, in reading order

use crate::constants::px_to_mm;
use crate::merge::normalize_width;
use crate::options::DocumentOptions;
use crate::types::*;
use image::RgbImage;
use log::{info, warn};
use printpdf::{
    ImageCompression, ImageOptimizationOptions, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions,
    RawImage, RawImageData, RawImageFormat, XObjectTransform,
};

/// Serialized document and how many chunks made it in
#[derive(Debug)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Chunks that could not be turned into a page
    pub dropped_pages: usize,
}

/// Page size in millimeters for `image` printed at `dpi`
pub fn page_size_mm(image: &RgbImage, dpi: f32) -> (f32, f32) {
    (px_to_mm(image.width(), dpi), px_to_mm(image.height(), dpi))
}

fn prepare_page(chunk: Chunk, options: &DocumentOptions) -> Result<RgbImage> {
    let (width, height) = chunk.image.dimensions();
    if width > options.max_page_dimension || height > options.max_page_dimension {
        return Err(PaginateError::Encode(format!(
            "chunk {} is {}x{}, over the {}px page limit",
            chunk.index, width, height, options.max_page_dimension
        )));
    }
    let image = normalize_width(chunk.image, options.page_width)?;
    if image.height() > options.max_page_dimension {
        return Err(PaginateError::Encode(format!(
            "chunk {} grows to {} rows at page width {}",
            chunk.index,
            image.height(),
            options.page_width
        )));
    }
    Ok(image)
}

/// JPEG page compression that keeps every pixel of the chunk.
///
/// All fields are set so printpdf never downsamples or recolors a page.
pub fn page_compression(quality: u8) -> ImageOptimizationOptions {
    ImageOptimizationOptions {
        quality: Some(quality as f32 / 100.0),
        max_image_size: None,
        dither_greyscale: Some(false),
        convert_to_greyscale: Some(false),
        auto_optimize: Some(false),
        format: Some(ImageCompression::Jpeg),
    }
}

fn page_for(doc: &mut PdfDocument, image: RgbImage, dpi: f32) -> PdfPage {
    let (width_mm, height_mm) = page_size_mm(&image, dpi);
    let (width, height) = image.dimensions();
    let raw = RawImage {
        pixels: RawImageData::U8(image.into_raw()),
        width: width as usize,
        height: height as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };
    let image_id = doc.add_image(&raw);

    let ops = vec![Op::UseXobject {
        id: image_id,
        transform: XObjectTransform {
            dpi: Some(dpi),
            ..Default::default()
        },
    }];
    PdfPage::new(Mm(width_mm), Mm(height_mm), ops)
}

/// Render `chunks` as a paginated PDF titled `title`.
///
/// Each chunk is width-normalized and becomes exactly one page sized to its
/// pixels at `options.dpi`. Chunks that cannot be rendered are dropped and
/// counted; the document fails only when no page survives.
pub fn assemble_document(
    title: &str,
    chunks: Vec<Chunk>,
    options: &DocumentOptions,
) -> Result<AssembledDocument> {
    if chunks.is_empty() {
        return Err(PaginateError::Encode(format!("'{}' has no chunks", title)));
    }

    let mut doc = PdfDocument::new(title);
    let mut pages = Vec::with_capacity(chunks.len());
    let mut dropped_pages = 0;

    for chunk in chunks {
        let index = chunk.index;
        match prepare_page(chunk, options) {
            Ok(image) => pages.push(page_for(&mut doc, image, options.dpi)),
            Err(e) => {
                warn!("Dropping page for chunk {}: {}", index, e);
                dropped_pages += 1;
            }
        }
    }

    if pages.is_empty() {
        return Err(PaginateError::Encode(format!(
            "all {} pages of '{}' were dropped",
            dropped_pages, title
        )));
    }

    let page_count = pages.len();
    doc.pages = pages;

    let save_options = PdfSaveOptions {
        image_optimization: options.jpeg_quality.map(page_compression),
        ..Default::default()
    };
    let mut warnings = Vec::new();
    let bytes = doc.save(&save_options, &mut warnings);
    for warning in &warnings {
        warn!("PDF warning: {:?}", warning);
    }

    info!(
        "Assembled '{}' with {} pages ({} dropped)",
        title, page_count, dropped_pages
    );

    Ok(AssembledDocument {
        bytes,
        page_count,
        dropped_pages,
    })
}

use image::{Rgb, RgbImage};
use strip_paginate::assemble::{page_compression, page_size_mm};
use strip_paginate::*;

fn chunk(index: usize, width: u32, height: u32) -> Chunk {
    Chunk {
        index,
        top: 0,
        segment_count: 1,
        image: RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        }),
        encoded: Vec::new(),
        oversized: false,
    }
}

fn document_options() -> DocumentOptions {
    DocumentOptions {
        page_width: 120,
        dpi: 300.0,
        jpeg_quality: Some(85),
        max_page_dimension: 2_000,
    }
}

fn pdf_page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
}

/// Width and height of every image XObject in the document, sorted
fn embedded_image_sizes(bytes: &[u8]) -> Vec<(i64, i64)> {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    let mut sizes: Vec<(i64, i64)> = doc
        .objects
        .values()
        .filter_map(|object| object.as_stream().ok())
        .filter(|stream| {
            stream
                .dict
                .get(b"Subtype")
                .and_then(|subtype| subtype.as_name())
                .map(|name| name == b"Image")
                .unwrap_or(false)
        })
        .map(|stream| {
            let width = stream.dict.get(b"Width").unwrap().as_i64().unwrap();
            let height = stream.dict.get(b"Height").unwrap().as_i64().unwrap();
            (width, height)
        })
        .collect();
    sizes.sort();
    sizes
}

/// MediaBox width and height in points, in page order
fn media_boxes(bytes: &[u8]) -> Vec<(f32, f32)> {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            let coords: Vec<f32> = media_box.iter().map(|v| v.as_float().unwrap()).collect();
            (coords[2] - coords[0], coords[3] - coords[1])
        })
        .collect()
}

fn points(px: u32, dpi: f32) -> f32 {
    px as f32 / dpi * 72.0
}

fn assert_pages_match(bytes: &[u8], expected: &[(u32, u32)], dpi: f32) {
    let mut expected_sizes: Vec<(i64, i64)> = expected
        .iter()
        .map(|&(w, h)| (w as i64, h as i64))
        .collect();
    expected_sizes.sort();
    assert_eq!(embedded_image_sizes(bytes), expected_sizes);

    let boxes = media_boxes(bytes);
    assert_eq!(boxes.len(), expected.len());
    for (&(width, height), &(w, h)) in boxes.iter().zip(expected) {
        assert!((width - points(w, dpi)).abs() < 0.5, "{} vs {}", width, w);
        assert!((height - points(h, dpi)).abs() < 0.5, "{} vs {}", height, h);
    }
}

#[test]
fn test_one_page_per_chunk() {
    let chunks = vec![chunk(0, 120, 400), chunk(1, 240, 300), chunk(2, 60, 900)];
    let document = assemble_document("work", chunks, &document_options()).unwrap();

    assert_eq!(document.page_count, 3);
    assert_eq!(document.dropped_pages, 0);
    assert_eq!(&document.bytes[..5], b"%PDF-");
    assert_eq!(pdf_page_count(&document.bytes), 3);
}

#[test]
fn test_oversized_page_is_dropped() {
    let options = document_options();
    // 120 x 2_400 exceeds the page limit, 60 x 1_200 doubles to 2_400 when normalized
    let chunks = vec![chunk(0, 120, 400), chunk(1, 120, 2_400), chunk(2, 60, 1_200)];
    let document = assemble_document("work", chunks, &options).unwrap();

    assert_eq!(document.page_count, 1);
    assert_eq!(document.dropped_pages, 2);
    assert_eq!(pdf_page_count(&document.bytes), 1);
}

#[test]
fn test_all_pages_dropped_is_an_encode_error() {
    let chunks = vec![chunk(0, 120, 5_000)];
    assert!(matches!(
        assemble_document("work", chunks, &document_options()),
        Err(PaginateError::Encode(_))
    ));
}

#[test]
fn test_no_chunks_is_an_encode_error() {
    assert!(matches!(
        assemble_document("work", Vec::new(), &document_options()),
        Err(PaginateError::Encode(_))
    ));
}

#[test]
fn test_lossless_output_without_quality() {
    let options = DocumentOptions {
        jpeg_quality: None,
        ..document_options()
    };
    let document = assemble_document("work", vec![chunk(0, 120, 100)], &options).unwrap();
    assert_eq!(pdf_page_count(&document.bytes), 1);
    assert_pages_match(&document.bytes, &[(120, 100)], options.dpi);
}

#[test]
fn test_pages_keep_normalized_pixels_with_jpeg() {
    let options = document_options();
    let chunks = vec![chunk(0, 120, 400), chunk(1, 240, 300), chunk(2, 60, 900)];
    let document = assemble_document("work", chunks, &options).unwrap();

    // 240 x 300 halves to 120 x 150, 60 x 900 doubles to 120 x 1_800
    assert_pages_match(
        &document.bytes,
        &[(120, 400), (120, 150), (120, 1_800)],
        options.dpi,
    );
}

#[test]
fn test_large_jpeg_page_is_not_downsampled() {
    // 1500 x 3000 RGB is 13.5 MB of raw pixels
    let options = DocumentOptions {
        page_width: 1_500,
        dpi: 150.0,
        jpeg_quality: Some(85),
        max_page_dimension: 65_500,
    };
    let document = assemble_document("work", vec![chunk(0, 1_500, 3_000)], &options).unwrap();
    assert_pages_match(&document.bytes, &[(1_500, 3_000)], options.dpi);
}

#[test]
fn test_page_compression_disables_resampling() {
    let compression = page_compression(70);
    assert_eq!(compression.max_image_size, None);
    assert_eq!(compression.auto_optimize, Some(false));
    assert_eq!(compression.convert_to_greyscale, Some(false));
    assert!((compression.quality.unwrap() - 0.7).abs() < 1e-6);
}

#[test]
fn test_page_size_follows_resolution() {
    let image = RgbImage::new(300, 600);
    let (width, height) = page_size_mm(&image, 300.0);
    assert!((width - 25.4).abs() < 1e-3);
    assert!((height - 50.8).abs() < 1e-3);
}

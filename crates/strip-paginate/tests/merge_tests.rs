use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use strip_paginate::merge::{normalize_width, scaled_height};
use strip_paginate::*;
use tempfile::TempDir;

fn write_png(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn test_strip_height_is_sum_of_scaled_heights() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write_png(dir.path(), "001.png", 100, 250, [255, 0, 0]),
        write_png(dir.path(), "002.png", 200, 333, [0, 255, 0]),
        write_png(dir.path(), "003.png", 50, 80, [0, 0, 255]),
    ];

    let outcome = merge_strip(&paths, 100).unwrap();
    let expected = [
        250,
        scaled_height(200, 333, 100).unwrap(),
        scaled_height(50, 80, 100).unwrap(),
    ];
    assert_eq!(expected, [250, 166, 160]);
    assert_eq!(outcome.page_heights, expected.to_vec());
    assert_eq!(outcome.strip.dimensions(), (100, 576));
    assert!(outcome.skipped.is_empty());
}

#[test]
fn test_pages_are_pasted_top_aligned_in_order() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write_png(dir.path(), "a.png", 40, 10, [255, 0, 0]),
        write_png(dir.path(), "b.png", 40, 20, [0, 0, 255]),
    ];

    let strip = merge_strip(&paths, 40).unwrap().strip;
    assert_eq!(*strip.get_pixel(0, 0), Rgb([255, 0, 0]));
    assert_eq!(*strip.get_pixel(39, 9), Rgb([255, 0, 0]));
    assert_eq!(*strip.get_pixel(0, 10), Rgb([0, 0, 255]));
    assert_eq!(*strip.get_pixel(39, 29), Rgb([0, 0, 255]));
}

#[test]
fn test_corrupt_image_is_skipped_and_excluded() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("002.png");
    std::fs::write(&broken, b"definitely not a png").unwrap();
    let missing = dir.path().join("missing.png");
    let paths = vec![
        write_png(dir.path(), "001.png", 60, 100, [10, 10, 10]),
        broken.clone(),
        missing.clone(),
        write_png(dir.path(), "003.png", 60, 50, [20, 20, 20]),
    ];

    let outcome = merge_strip(&paths, 60).unwrap();
    assert_eq!(outcome.strip.height(), 150);
    assert_eq!(outcome.page_heights, vec![100, 50]);
    let skipped: Vec<&PathBuf> = outcome.skipped.iter().map(|s| &s.path).collect();
    assert_eq!(skipped, vec![&broken, &missing]);
    assert!(outcome.skipped.iter().all(|s| s.kind == SkipKind::Decode));
}

#[test]
fn test_image_collapsing_to_zero_height_is_a_geometry_skip() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write_png(dir.path(), "wide.png", 1000, 1, [0, 0, 0]),
        write_png(dir.path(), "ok.png", 10, 10, [0, 0, 0]),
    ];

    let outcome = merge_strip(&paths, 10).unwrap();
    assert_eq!(outcome.strip.height(), 10);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].kind, SkipKind::Geometry);
}

#[test]
fn test_scaled_height_rejects_overflow() {
    assert_eq!(scaled_height(200, 333, 100).unwrap(), 166);
    assert_eq!(scaled_height(100, 7, 100).unwrap(), 7);
    // 30_000 rows at 200_000x magnification do not fit in a u32
    assert!(matches!(
        scaled_height(1, 30_000, 200_000),
        Err(PaginateError::Geometry(_))
    ));
    assert!(matches!(
        scaled_height(1_000, 1, 10),
        Err(PaginateError::Geometry(_))
    ));
}

#[test]
fn test_sliver_that_overflows_when_upscaled_is_skipped() {
    let dir = TempDir::new().unwrap();
    let sliver = write_png(dir.path(), "sliver.png", 1, 30_000, [0, 0, 0]);

    // Header check skips it before anything is decoded or allocated
    let result = merge_strip(&[sliver], 200_000);
    assert!(matches!(result, Err(PaginateError::Decode(_))));
}

#[test]
fn test_empty_list_is_a_decode_error() {
    let paths: Vec<PathBuf> = Vec::new();
    assert!(matches!(
        merge_strip(&paths, 100),
        Err(PaginateError::Decode(_))
    ));
}

#[test]
fn test_nothing_decodable_is_a_decode_error() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("broken.jpg");
    std::fs::write(&broken, [0u8; 16]).unwrap();
    assert!(matches!(
        merge_strip(&[broken], 100),
        Err(PaginateError::Decode(_))
    ));
}

#[test]
fn test_normalize_width_keeps_aspect_ratio() {
    let image = RgbImage::from_pixel(300, 900, Rgb([1, 2, 3]));
    let resized = normalize_width(image, 100).unwrap();
    assert_eq!(resized.dimensions(), (100, 300));

    let unchanged = normalize_width(RgbImage::new(100, 7), 100).unwrap();
    assert_eq!(unchanged.dimensions(), (100, 7));

    assert!(matches!(
        normalize_width(RgbImage::new(0, 0), 100),
        Err(PaginateError::Geometry(_))
    ));
}

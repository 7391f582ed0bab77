use image::{Rgb, RgbImage};
use strip_paginate::split::slice_heights;
use strip_paginate::*;

fn band(start: u32, end: u32, class: RowClass) -> Band {
    Band { start, end, class }
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(y % 256) as u8, (x % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn concatenated(segments: &[Segment]) -> Vec<u8> {
    segments
        .iter()
        .flat_map(|s| s.image.as_raw().iter().copied())
        .collect()
}

#[test]
fn test_cut_at_band_midpoints() {
    use RowClass::*;
    let bands = vec![
        band(0, 100, Content),
        band(100, 140, Background),
        band(140, 300, Content),
        band(300, 310, Background), // too thin
        band(310, 500, Content),
        band(500, 561, Background),
        band(561, 600, Content),
    ];
    assert_eq!(plan_cuts(&bands, 30), vec![120, 530]);
}

#[test]
fn test_edge_bands_are_never_cut() {
    use RowClass::*;
    let bands = vec![
        band(0, 200, Background),
        band(200, 400, Content),
        band(400, 600, Background),
    ];
    assert!(plan_cuts(&bands, 30).is_empty());

    let single = vec![band(0, 600, Background)];
    assert!(plan_cuts(&single, 30).is_empty());
}

#[test]
fn test_no_cuts_keeps_whole_strip() {
    let strip = gradient(10, 50);
    let raw = strip.as_raw().clone();
    let segments = cut_segments(strip, &[]);
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].top, 0);
    assert_eq!(segments[0].image.as_raw(), &raw);
}

#[test]
fn test_segments_reconstruct_strip() {
    let strip = gradient(17, 300);
    let raw = strip.as_raw().clone();

    let segments = cut_segments(strip, &[1, 40, 41, 299]);
    assert_eq!(segments.len(), 5);
    let tops: Vec<u32> = segments.iter().map(|s| s.top).collect();
    assert_eq!(tops, vec![0, 1, 40, 41, 299]);
    for pair in segments.windows(2) {
        assert_eq!(pair[0].bottom(), pair[1].top);
    }
    assert_eq!(concatenated(&segments), raw);
}

#[test]
fn test_degenerate_cuts_are_ignored() {
    let strip = gradient(5, 100);
    let raw = strip.as_raw().clone();

    // Zero, repeated, decreasing and out-of-range cuts never make empty segments
    let segments = cut_segments(strip, &[0, 50, 50, 30, 100, 150]);
    assert_eq!(segments.len(), 2);
    assert!(segments.iter().all(|s| s.height() > 0));
    assert_eq!(concatenated(&segments), raw);
}

#[test]
fn test_slice_heights() {
    assert_eq!(slice_heights(100, 100), vec![(0, 100)]);
    assert_eq!(slice_heights(101, 100), vec![(0, 51), (51, 50)]);
    assert_eq!(
        slice_heights(50_000, 16_384),
        vec![(0, 12_500), (12_500, 12_500), (25_000, 12_500), (37_500, 12_500)]
    );
}

#[test]
fn test_tall_strip_is_forced_into_four_slices() {
    let strip = gradient(3, 50_000);
    let raw = strip.as_raw().clone();
    let segments = enforce_height_ceiling(cut_segments(strip, &[]), 16_384);

    assert_eq!(segments.len(), 4);
    assert!(segments.iter().all(|s| s.height() <= 16_384));
    assert_eq!(segments.iter().map(Segment::height).sum::<u32>(), 50_000);
    assert_eq!(concatenated(&segments), raw);
}

#[test]
fn test_short_segments_pass_through_in_order() {
    let strip = gradient(4, 1_000);
    let segments = cut_segments(strip, &[200, 900]);
    let split = enforce_height_ceiling(segments, 500);

    let layout: Vec<(u32, u32)> = split.iter().map(|s| (s.top, s.height())).collect();
    assert_eq!(layout, vec![(0, 200), (200, 350), (550, 350), (900, 100)]);
}

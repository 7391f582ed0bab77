//! Cut planner: turns qualifying background bands into segments

use crate::types::*;
use image::{RgbImage, imageops};
use log::{debug, info};

/// Cut rows at the middle of every usable background band.
///
/// A band is usable when it is background, at least `min_band_height` rows
/// tall, and neither the first nor the last band of the strip. The result is
/// strictly increasing.
pub fn plan_cuts(bands: &[Band], min_band_height: u32) -> Vec<u32> {
    let mut cuts: Vec<u32> = Vec::new();
    if bands.len() < 3 {
        return cuts;
    }

    for band in &bands[1..bands.len() - 1] {
        if !band.is_background() || band.height() < min_band_height {
            continue;
        }
        let cut = band.start + band.height() / 2;
        if cuts.last().is_some_and(|&last| cut <= last) {
            continue;
        }
        debug!(
            "Cut at y={} inside background band {}..{}",
            cut, band.start, band.end
        );
        cuts.push(cut);
    }

    cuts
}

/// Crop `strip` at `cuts`, consuming it.
///
/// Cuts outside `1..height` and non-increasing cuts are ignored, so the
/// segments always tile the strip exactly. No cuts yields the whole strip as
/// one segment.
pub fn cut_segments(strip: RgbImage, cuts: &[u32]) -> Vec<Segment> {
    let (width, height) = strip.dimensions();
    if height == 0 {
        return Vec::new();
    }

    let mut bounds = Vec::with_capacity(cuts.len() + 2);
    bounds.push(0);
    for &cut in cuts {
        if cut > *bounds.last().unwrap_or(&0) && cut < height {
            bounds.push(cut);
        }
    }
    if bounds.len() == 1 {
        return vec![Segment {
            top: 0,
            image: strip,
        }];
    }
    bounds.push(height);

    let segments: Vec<Segment> = bounds
        .windows(2)
        .map(|pair| Segment {
            top: pair[0],
            image: imageops::crop_imm(&strip, 0, pair[0], width, pair[1] - pair[0]).to_image(),
        })
        .collect();

    info!("Cut strip into {} segments", segments.len());
    segments
}

//! Homogeneity scanner: classifies strip rows as background or content
//!
//! Two phases keep the cost proportional to the number of plausible rows:
//! 1. Every row's center region is quantized and its distinct colors counted;
//!    rows with at most `max_distinct_colors` become candidates.
//! 2. Only candidates have their left and right margins checked. A candidate
//!    is background when both margins are equally simple and share the
//!    center's dominant color.

use crate::constants::MIN_SCAN_HEIGHT_FACTOR;
use crate::options::ScanOptions;
use crate::types::*;
use image::RgbImage;
use log::{debug, info};
use rayon::prelude::*;

/// Largest quantized palette that is counted with a dense table
const DENSE_TABLE_LIMIT: usize = 1 << 15;

/// Distinct-color summary of one row region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    /// No pixels in the region
    Empty,
    /// More distinct colors than allowed
    Complex,
    /// Few enough colors; carries the most frequent quantized color
    Simple { dominant: u32, distinct: usize },
}

/// Reusable counter of quantized colors.
///
/// Small palettes use a dense table that is cleared through the list of
/// touched entries; large palettes (small quantization factors) fall back
/// to sorting.
#[derive(Debug, Clone)]
pub struct ColorCounter {
    factor: u8,
    levels: u32,
    table: Vec<u32>,
    touched: Vec<u32>,
    scratch: Vec<u32>,
}

impl ColorCounter {
    pub fn new(factor: u8) -> Self {
        let factor = factor.max(1);
        let levels = 255 / factor as u32 + 1;
        let palette = (levels * levels * levels) as usize;
        let table = if palette <= DENSE_TABLE_LIMIT {
            vec![0; palette]
        } else {
            Vec::new()
        };
        Self {
            factor,
            levels,
            table,
            touched: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Quantized color key; ordering of keys matches (r, g, b) ordering
    #[inline]
    pub fn key(&self, pixel: &[u8]) -> u32 {
        let q = self.factor;
        let (r, g, b) = ((pixel[0] / q) as u32, (pixel[1] / q) as u32, (pixel[2] / q) as u32);
        (r * self.levels + g) * self.levels + b
    }

    /// Count the distinct quantized colors of packed RGB `pixels`.
    /// Ties for the dominant color resolve to the smallest key.
    pub fn tally(&mut self, pixels: &[u8], max_distinct: usize) -> Tally {
        if pixels.len() < 3 {
            return Tally::Empty;
        }
        if self.table.is_empty() {
            return self.tally_sorted(pixels, max_distinct);
        }

        let mut complex = false;
        for pixel in pixels.chunks_exact(3) {
            let key = self.key(pixel);
            let slot = &mut self.table[key as usize];
            if *slot == 0 {
                self.touched.push(key);
                if self.touched.len() > max_distinct {
                    complex = true;
                    break;
                }
            }
            *slot += 1;
        }

        let mut best: Option<(u32, u32)> = None;
        for &key in &self.touched {
            let count = std::mem::take(&mut self.table[key as usize]);
            best = match best {
                Some((k, c)) if c > count || (c == count && k < key) => Some((k, c)),
                _ => Some((key, count)),
            };
        }
        let distinct = self.touched.len();
        self.touched.clear();

        match best {
            _ if complex => Tally::Complex,
            Some((dominant, _)) => Tally::Simple { dominant, distinct },
            None => Tally::Empty,
        }
    }

    fn tally_sorted(&mut self, pixels: &[u8], max_distinct: usize) -> Tally {
        self.scratch.clear();
        for pixel in pixels.chunks_exact(3) {
            let key = self.key(pixel);
            self.scratch.push(key);
        }
        self.scratch.sort_unstable();

        let mut distinct = 0;
        let mut best: Option<(u32, usize)> = None;
        for run in self.scratch.chunk_by(|a, b| a == b) {
            distinct += 1;
            if distinct > max_distinct {
                return Tally::Complex;
            }
            if best.is_none_or(|(_, count)| run.len() > count) {
                best = Some((run[0], run.len()));
            }
        }
        match best {
            Some((dominant, _)) => Tally::Simple { dominant, distinct },
            None => Tally::Empty,
        }
    }
}

/// True when a strip of `height` rows is too short to be worth splitting
pub fn is_too_short(height: u32, min_band_height: u32) -> bool {
    (height as u64) < MIN_SCAN_HEIGHT_FACTOR as u64 * min_band_height as u64
}

/// Column range `start..end` of the center region; the margins lie outside it
fn regions(width: u32, edge_margin: f32) -> (u32, u32) {
    let margin = ((width as f64) * edge_margin as f64).floor() as u32;
    let margin = margin.min(width.saturating_sub(1) / 2);
    (margin, width - margin)
}

#[inline]
fn row(raw: &[u8], stride: usize, y: u32) -> &[u8] {
    &raw[y as usize * stride..(y as usize + 1) * stride]
}

/// Classify every row of `strip`
pub fn classify_rows(strip: &RgbImage, options: &ScanOptions) -> Vec<RowClass> {
    let (width, height) = strip.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let (center_start, center_end) = regions(width, options.edge_margin);
    let raw: &[u8] = strip.as_raw();
    let stride = width as usize * 3;
    let max_distinct = options.max_distinct_colors;
    let factor = options.quantization_factor;

    // Phase A: center region of every row
    let center_dominant: Vec<Option<u32>> = (0..height)
        .into_par_iter()
        .map_init(
            || ColorCounter::new(factor),
            |counter, y| {
                let pixels = &row(raw, stride, y)[center_start as usize * 3..center_end as usize * 3];
                match counter.tally(pixels, max_distinct) {
                    Tally::Simple { dominant, .. } => Some(dominant),
                    _ => None,
                }
            },
        )
        .collect();

    let candidates = center_dominant.iter().filter(|d| d.is_some()).count();
    debug!("{} of {} rows are background candidates", candidates, height);

    // Phase B: margins of candidate rows only
    let mut counter = ColorCounter::new(factor);
    let mut classes = vec![RowClass::Content; height as usize];
    for (y, dominant) in center_dominant.iter().enumerate() {
        let Some(center) = *dominant else {
            continue;
        };
        let pixels = row(raw, stride, y as u32);
        let left = &pixels[..center_start as usize * 3];
        let right = &pixels[center_end as usize * 3..];

        let edges_agree = [left, right].iter().all(|edge| {
            match counter.tally(edge, max_distinct) {
                Tally::Empty => true,
                Tally::Simple { dominant, .. } => dominant == center,
                Tally::Complex => false,
            }
        });
        if edges_agree {
            classes[y] = RowClass::Background;
        }
    }

    classes
}

/// Collapse per-row classes into maximal runs
pub fn bands_from_classes(classes: &[RowClass]) -> Vec<Band> {
    let mut bands = Vec::new();
    let mut start = 0usize;
    for run in classes.chunk_by(|a, b| a == b) {
        let end = start + run.len();
        bands.push(Band {
            start: start as u32,
            end: end as u32,
            class: run[0],
        });
        start = end;
    }
    bands
}

/// Scan `strip` into bands.
///
/// Strips shorter than three minimum band heights are not analysed at all
/// and come back as one content band covering every row.
pub fn scan_bands(strip: &RgbImage, options: &ScanOptions) -> Vec<Band> {
    let height = strip.height();
    if height == 0 {
        return Vec::new();
    }
    if is_too_short(height, options.min_band_height) {
        info!(
            "Strip is only {} rows tall, skipping homogeneity scan",
            height
        );
        return vec![Band {
            start: 0,
            end: height,
            class: RowClass::Content,
        }];
    }

    let classes = classify_rows(strip, options);
    let bands = bands_from_classes(&classes);
    info!(
        "Scanned {} rows into {} bands ({} background)",
        height,
        bands.len(),
        bands.iter().filter(|b| b.is_background()).count()
    );
    bands
}

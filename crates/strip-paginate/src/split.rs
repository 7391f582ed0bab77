//! Safety splitter: slices any segment taller than a hard ceiling

use crate::types::*;
use image::imageops;
use log::warn;

/// Row ranges `(offset, height)` slicing `height` rows into
/// `ceil(height / ceiling)` near-equal parts.
pub fn slice_heights(height: u32, ceiling: u32) -> Vec<(u32, u32)> {
    if height == 0 || ceiling == 0 || height <= ceiling {
        return vec![(0, height)];
    }
    let parts = height.div_ceil(ceiling);
    let base = height / parts;
    let extra = height % parts;

    let mut offset = 0;
    (0..parts)
        .map(|i| {
            let part = base + u32::from(i < extra);
            let range = (offset, part);
            offset += part;
            range
        })
        .collect()
}

/// Force every segment under `ceiling` rows, preserving order.
/// Segments already within the ceiling pass through untouched.
pub fn enforce_height_ceiling(segments: Vec<Segment>, ceiling: u32) -> Vec<Segment> {
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        let height = segment.height();
        if ceiling == 0 || height <= ceiling {
            out.push(segment);
            continue;
        }

        let slices = slice_heights(height, ceiling);
        warn!(
            "Segment at y={} is {} rows tall, forcing {} slices under {}",
            segment.top,
            height,
            slices.len(),
            ceiling
        );
        let width = segment.image.width();
        for (offset, part) in slices {
            out.push(Segment {
                top: segment.top + offset,
                image: imageops::crop_imm(&segment.image, 0, offset, width, part).to_image(),
            });
        }
    }
    out
}

use crate::options::PipelineOptions;
use crate::plan::plan_cuts;
use crate::scan::{is_too_short, scan_bands};
use crate::split::slice_heights;
use crate::types::*;
use image::RgbImage;

/// Calculate how `strip` would be segmented, without cropping anything
pub fn calculate_statistics(
    strip: &RgbImage,
    options: &PipelineOptions,
) -> Result<SegmentationStatistics> {
    options.validate()?;

    let (strip_width, strip_height) = strip.dimensions();
    if strip_height == 0 {
        return Err(PaginateError::Geometry("strip has no rows".to_string()));
    }

    let scan_options = options.scan_options();
    let scan_skipped = is_too_short(strip_height, scan_options.min_band_height);
    let bands = scan_bands(strip, &scan_options);
    let cuts = plan_cuts(&bands, scan_options.min_band_height);

    // Segment heights implied by the cuts
    let mut bounds = Vec::with_capacity(cuts.len() + 2);
    bounds.push(0);
    bounds.extend(cuts.iter().copied());
    bounds.push(strip_height);
    let ceiling = options.split_ceiling();
    let forced_slices = bounds
        .windows(2)
        .map(|pair| slice_heights(pair[1] - pair[0], ceiling).len() - 1)
        .sum();

    Ok(SegmentationStatistics {
        strip_width,
        strip_height,
        scan_skipped,
        bands: bands.len(),
        background_bands: bands.iter().filter(|b| b.is_background()).count(),
        segments: cuts.len() + 1,
        cuts,
        forced_slices,
    })
}

//! Per-band edge detection and binarization.
//!
//! Each band is cut out of the shared intensity image, run through
//! Canny, and thresholded into a [`BandMask`]. Bands are processed on a
//! fixed-size rayon pool and joined back in band order.
//!
//! A band only sees its own rows, so edge responses within the
//! detector's kernel radius of a seam can differ from an unpartitioned
//! run. That approximation is accepted in exchange for throughput.

use rayon::prelude::*;

use crate::cancel::CancellationSignal;
use crate::canny;
use crate::types::{
    BACKGROUND, Band, BandMask, FOREGROUND, GrayImage, IntensityImage, PipelineConfig,
    PipelineError,
};

/// Minimum allowed Canny bound.
///
/// A zero low bound turns every pixel with any gradient into a weak
/// edge, flooding the mask.
pub const MIN_CANNY_BOUND: f32 = 1.0;
const _: () = assert!(MIN_CANNY_BOUND > 0.0);

/// Compute the edge-response buffer for an intensity image.
///
/// Both bounds are clamped to at least [`MIN_CANNY_BOUND`] and `low`
/// is clamped to at most `high`.
#[must_use = "returns the edge-response buffer"]
pub fn edge_response(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let high = high.max(MIN_CANNY_BOUND);
    let low = low.max(MIN_CANNY_BOUND).min(high);
    canny::canny(image, low, high)
}

/// Threshold an edge-response buffer into a mask.
///
/// A pixel becomes [`FOREGROUND`] when its edge response is strictly
/// greater than `threshold`, and [`BACKGROUND`] otherwise. Raising the
/// threshold can therefore only shrink the foreground.
#[must_use = "returns the binarized mask"]
pub fn binarize(edges: &GrayImage, threshold: u8) -> GrayImage {
    let mut mask = edges.clone();
    for value in mask.iter_mut() {
        *value = if *value > threshold { FOREGROUND } else { BACKGROUND };
    }
    mask
}

/// Edge-detect and binarize the rows of `image` covered by `band`.
///
/// Pure: the same band of the same image with the same config always
/// yields the same mask.
///
/// # Errors
///
/// Returns [`PipelineError::MergeShape`] if the band is empty or
/// extends past the bottom of the image.
pub fn binarize_band(
    image: &IntensityImage,
    band: Band,
    config: &PipelineConfig,
) -> Result<BandMask, PipelineError> {
    if band.rows() == 0 || band.end_row > image.height() {
        return Err(PipelineError::MergeShape(format!(
            "band [{}, {}) does not fit an image of height {}",
            band.start_row,
            band.end_row,
            image.height()
        )));
    }

    let rows =
        image::imageops::crop_imm(image, 0, band.start_row, image.width(), band.rows()).to_image();
    let edges = edge_response(&rows, config.canny_low, config.canny_high);
    Ok(BandMask {
        band,
        mask: binarize(&edges, config.threshold),
    })
}

/// Binarize every band in parallel, one pool thread per band up to
/// `config.workers`.
///
/// Results come back in the order of `bands`, whichever worker
/// finishes first. A band not yet started when `cancel` is observed is
/// skipped; bands already running are left to finish. Returns
/// `Ok(None)` if any band was skipped.
///
/// # Errors
///
/// Returns [`PipelineError::WorkerPool`] if the pool cannot be built,
/// or the first error from [`binarize_band`]. One failed band fails
/// the whole run.
pub fn binarize_bands(
    image: &IntensityImage,
    bands: &[Band],
    config: &PipelineConfig,
    cancel: &CancellationSignal,
) -> Result<Option<Vec<BandMask>>, PipelineError> {
    if bands.is_empty() {
        return Ok(Some(Vec::new()));
    }
    let threads = bands.len().min(config.workers).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("rastervec-band-{i}"))
        .build()
        .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;

    let results: Result<Vec<Option<BandMask>>, PipelineError> = pool.install(|| {
        bands
            .par_iter()
            .map(|&band| {
                if cancel.is_cancelled() {
                    log::debug!("skipping band [{}, {}): cancelled", band.start_row, band.end_row);
                    return Ok(None);
                }
                binarize_band(image, band, config).map(Some)
            })
            .collect()
    });

    Ok(results?.into_iter().collect())
}

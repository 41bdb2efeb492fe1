//! rastervec-pipeline: Pure raster-to-vector conversion pipeline (sans-IO).
//!
//! Converts raster images into one vector shape per edge pixel through:
//! decode -> intensity -> downsample -> partition into bands ->
//! parallel edge detection + binarization -> ordered merge -> emission.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and hands shapes to a caller-supplied [`ShapeSink`].
//! Document formats live in `rastervec-export`; files and background
//! jobs live in `rastervec-io`.

pub mod binarize;
pub mod cancel;
mod canny;
pub mod diagnostics;
pub mod emit;
pub mod merge;
pub mod partition;
pub mod preprocess;
pub mod progress;
pub mod types;

use std::time::Instant;

pub use cancel::CancellationSignal;
pub use diagnostics::ConversionDiagnostics;
pub use emit::{Emission, ShapeSink};
pub use preprocess::DownsampleFilter;
pub use progress::{NoProgress, ProgressEvent, ProgressSink};
pub use types::{
    Band, BandMask, BinaryMask, ConversionStatus, Dimensions, IntensityImage, PipelineConfig,
    PipelineError,
};

/// Result of a conversion that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Whether emission finished or was cancelled.
    pub status: ConversionStatus,
    /// Dimensions of the working image, which are also the coordinate
    /// space of the emitted shapes.
    pub dimensions: Dimensions,
    /// Per-stage timing and counts.
    pub diagnostics: ConversionDiagnostics,
}

/// A finished [`process`] run: the populated sink and how it ended.
#[derive(Debug)]
pub struct Processed<S> {
    /// The sink the shapes were appended to.
    pub sink: S,
    /// Status and diagnostics.
    pub conversion: Conversion,
}

/// Partition, binarize in parallel, and merge into one mask.
///
/// Returns `Ok(None)` if `cancel` was observed during or right after
/// the parallel stage; the partial band results are discarded.
///
/// # Errors
///
/// Returns [`PipelineError::WorkerPool`] if the worker pool cannot be
/// built and [`PipelineError::MergeShape`] if the band masks do not
/// tile the image.
pub fn build_mask(
    image: &IntensityImage,
    config: &PipelineConfig,
    cancel: &CancellationSignal,
    diagnostics: &mut ConversionDiagnostics,
) -> Result<Option<BinaryMask>, PipelineError> {
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    let bands = partition::partition(dimensions.height, config.workers);
    diagnostics.band_count = bands.len();
    log::debug!(
        "split {}x{} image into {} bands: {bands:?}",
        dimensions.width,
        dimensions.height,
        bands.len()
    );

    let started = Instant::now();
    let band_masks = binarize::binarize_bands(image, &bands, config, cancel)?;
    diagnostics.binarize = started.elapsed();
    let Some(band_masks) = band_masks.filter(|_| !cancel.is_cancelled()) else {
        log::warn!("cancelled during binarization; discarding band results");
        return Ok(None);
    };

    let started = Instant::now();
    let mask = merge::merge_bands(dimensions, band_masks)?;
    diagnostics.merge = started.elapsed();
    diagnostics.foreground_pixels = mask.foreground_count() as u64;
    Ok(Some(mask))
}

/// Convert an intensity image, appending shapes to `sink`.
///
/// Runs [`build_mask`] and then [`emit::emit`]. A cancelled run is
/// not an error: it returns [`ConversionStatus::CancelledByUser`] and
/// `sink` holds whatever was emitted before the stop.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a config that fails
/// [`PipelineConfig::validate`], [`PipelineError::EmptyImage`] for an
/// image with no pixels, and any error from [`build_mask`].
pub fn convert<S, P>(
    image: &IntensityImage,
    config: &PipelineConfig,
    sink: &mut S,
    progress: &mut P,
    cancel: &CancellationSignal,
) -> Result<Conversion, PipelineError>
where
    S: ShapeSink + ?Sized,
    P: ProgressSink + ?Sized,
{
    config.validate()?;
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    if dimensions.pixel_count() == 0 {
        return Err(PipelineError::EmptyImage {
            width: dimensions.width,
            height: dimensions.height,
        });
    }

    let mut diagnostics = ConversionDiagnostics {
        dimensions: Some(dimensions),
        ..ConversionDiagnostics::default()
    };

    let Some(mask) = build_mask(image, config, cancel, &mut diagnostics)? else {
        return Ok(Conversion {
            status: ConversionStatus::CancelledByUser,
            dimensions,
            diagnostics,
        });
    };

    let started = Instant::now();
    let emission = emit::emit(&mask, sink, progress, cancel);
    diagnostics.emit = started.elapsed();
    diagnostics.pixels_visited = emission.visited;
    diagnostics.shapes_emitted = emission.shapes;

    log::debug!(
        "emitted {} shapes over {} of {} pixels ({:?})",
        emission.shapes,
        emission.visited,
        dimensions.pixel_count(),
        emission.status,
    );

    Ok(Conversion {
        status: emission.status,
        dimensions,
        diagnostics,
    })
}

/// Run the full pipeline on raw image bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration.
/// Once the working dimensions are known, `make_sink` is called to
/// create the sink, so document-backed sinks can size themselves.
///
/// # Pipeline steps
///
/// 1. Decode image and convert to intensity
/// 2. Downsample to `config.max_width` if wider
/// 3. Partition into `config.workers` bands
/// 4. Canny + threshold each band in parallel
/// 5. Merge band masks in row order
/// 6. Emit one unit shape per foreground pixel
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty,
/// [`PipelineError::ImageDecode`] if the image format is unrecognized,
/// [`PipelineError::EmptyImage`] if the image has no pixels after
/// downsampling, and any error from [`convert`].
pub fn process<S, F, P>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    make_sink: F,
    progress: &mut P,
    cancel: &CancellationSignal,
) -> Result<Processed<S>, PipelineError>
where
    S: ShapeSink,
    F: FnOnce(Dimensions) -> S,
    P: ProgressSink + ?Sized,
{
    config.validate()?;

    let started = Instant::now();
    let pre = preprocess::preprocess(image_bytes, config)?;
    let preprocess_duration = started.elapsed();

    let mut sink = make_sink(pre.dimensions());
    let mut conversion = convert(&pre.image, config, &mut sink, progress, cancel)?;
    conversion.diagnostics.preprocess = preprocess_duration;
    conversion.diagnostics.source_dimensions = Some(pre.source_dimensions);
    conversion.diagnostics.downsampled = pre.downsampled;

    Ok(Processed { sink, conversion })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::preprocess::tests::encode_png;

    type Shapes = Vec<(u32, u32)>;

    /// PNG with a filled dark rectangle on a white background, so Canny
    /// finds a closed outline.
    fn rectangle_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            let inside = (width / 4..3 * width / 4).contains(&x)
                && (height / 4..3 * height / 4).contains(&y);
            if inside {
                image::Rgba([20, 20, 20, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        encode_png(&img)
    }

    fn run(bytes: &[u8], config: &PipelineConfig) -> Processed<Shapes> {
        process(
            bytes,
            config,
            |_| Shapes::new(),
            &mut NoProgress,
            &CancellationSignal::new(),
        )
        .unwrap()
    }

    #[test]
    fn process_empty_input() {
        let result = process(
            &[],
            &PipelineConfig::default(),
            |_| Shapes::new(),
            &mut NoProgress,
            &CancellationSignal::new(),
        );
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(
            &[0xFF, 0x00],
            &PipelineConfig::default(),
            |_| Shapes::new(),
            &mut NoProgress,
            &CancellationSignal::new(),
        );
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn invalid_config_is_rejected_before_decoding() {
        let config = PipelineConfig {
            workers: 0,
            ..PipelineConfig::default()
        };
        let result = process(
            &[0xFF, 0x00],
            &config,
            |_| Shapes::new(),
            &mut NoProgress,
            &CancellationSignal::new(),
        );
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn all_white_four_by_four_emits_nothing() {
        let png = encode_png(&image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([255, 255, 255, 255]),
        ));
        let out = run(&png, &PipelineConfig::default());
        assert_eq!(out.conversion.status, ConversionStatus::Finished);
        assert!(out.sink.is_empty());
        assert_eq!(out.conversion.diagnostics.pixels_visited, 16);
    }

    #[test]
    fn rectangle_outline_produces_shapes() {
        let out = run(&rectangle_png(64, 64), &PipelineConfig::default());
        assert_eq!(out.conversion.status, ConversionStatus::Finished);
        assert!(!out.sink.is_empty());
        assert_eq!(
            out.conversion.diagnostics.shapes_emitted,
            out.sink.len() as u64
        );
        assert_eq!(
            out.conversion.diagnostics.foreground_pixels,
            out.sink.len() as u64
        );
    }

    #[test]
    fn repeated_runs_emit_identical_shapes() {
        let png = rectangle_png(90, 70);
        let config = PipelineConfig::default();
        let a: BTreeSet<_> = run(&png, &config).sink.into_iter().collect();
        let b: BTreeSet<_> = run(&png, &config).sink.into_iter().collect();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn wide_image_is_downsampled_before_detection() {
        let png = rectangle_png(1200, 120);
        let out = run(&png, &PipelineConfig::default());
        assert!(out.conversion.diagnostics.downsampled);
        assert_eq!(
            out.conversion.dimensions,
            Dimensions {
                width: 1000,
                height: 100
            }
        );
        assert!(!out.sink.is_empty());
        assert!(out.sink.iter().all(|&(x, y)| x <= 999 && y <= 99));
    }

    #[test]
    fn sink_is_sized_from_working_dimensions() {
        let png = rectangle_png(1500, 30);
        let mut seen = None;
        process(
            &png,
            &PipelineConfig::default(),
            |dims| {
                seen = Some(dims);
                Shapes::new()
            },
            &mut NoProgress,
            &CancellationSignal::new(),
        )
        .unwrap();
        assert_eq!(
            seen,
            Some(Dimensions {
                width: 1000,
                height: 20
            })
        );
    }

    #[test]
    fn single_worker_matches_many_away_from_seams() {
        // Band seams may differ by up to the detector's kernel radius;
        // rows far from every seam must agree exactly.
        let png = rectangle_png(80, 80);
        let one = PipelineConfig {
            workers: 1,
            ..PipelineConfig::default()
        };
        let four = PipelineConfig::default();
        let seams: Vec<u32> = partition::partition(80, four.workers)
            .iter()
            .skip(1)
            .map(|b| b.start_row)
            .collect();
        let near_seam = |y: u32| seams.iter().any(|&s| y.abs_diff(s) <= 6);

        let filter = |shapes: Shapes| -> BTreeSet<(u32, u32)> {
            shapes.into_iter().filter(|&(_, y)| !near_seam(y)).collect()
        };
        let a = filter(run(&png, &one).sink);
        let b = filter(run(&png, &four).sink);
        assert_eq!(a, b);
    }

    #[test]
    fn huge_worker_count_on_tiny_image_finishes() {
        let png = encode_png(&image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([255, 255, 255, 255]),
        ));
        let config = PipelineConfig {
            workers: 10_000,
            ..PipelineConfig::default()
        };
        let started = Instant::now();
        let out = run(&png, &config);
        assert!(
            started.elapsed() < std::time::Duration::from_secs(10),
            "took {:?}",
            started.elapsed()
        );
        assert_eq!(out.conversion.status, ConversionStatus::Finished);
        assert_eq!(out.conversion.diagnostics.band_count, 4);
        assert!(out.sink.is_empty());
    }

    #[test]
    fn pre_cancelled_conversion_reports_cancelled() {
        let cancel = CancellationSignal::new();
        cancel.cancel();
        let out = process(
            &rectangle_png(64, 64),
            &PipelineConfig::default(),
            |_| Shapes::new(),
            &mut NoProgress,
            &cancel,
        )
        .unwrap();
        assert_eq!(out.conversion.status, ConversionStatus::CancelledByUser);
        assert!(out.sink.is_empty());
    }

    #[test]
    fn progress_through_full_pipeline_completes() {
        let mut events = Vec::new();
        process(
            &rectangle_png(64, 64),
            &PipelineConfig::default(),
            |_| Shapes::new(),
            &mut |e: ProgressEvent| events.push(e.fraction),
            &CancellationSignal::new(),
        )
        .unwrap();
        assert!(events.windows(2).all(|w| w[0] <= w[1]));
        assert!(events.last().copied().unwrap() >= 0.99);
    }

    #[test]
    fn convert_rejects_empty_image() {
        let result = convert(
            &IntensityImage::new(0, 5),
            &PipelineConfig::default(),
            &mut Shapes::new(),
            &mut NoProgress,
            &CancellationSignal::new(),
        );
        assert!(matches!(result, Err(PipelineError::EmptyImage { .. })));
    }
}

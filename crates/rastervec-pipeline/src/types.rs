//! Shared types for the rastervec conversion pipeline.

use serde::{Deserialize, Serialize};

use crate::preprocess::DownsampleFilter;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Single-channel intensity image produced by the preprocessor.
///
/// Row-major `u8` pixels with `pixels.len() == width * height`.
/// Never mutated once created; band workers share it by reference.
pub type IntensityImage = GrayImage;

/// Mask value for a foreground (edge) pixel. Rendered as a black shape.
pub const FOREGROUND: u8 = 0;

/// Mask value for a background pixel. Nothing is emitted for it.
pub const BACKGROUND: u8 = 255;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Half-open row range `[start_row, end_row)` of an image.
///
/// The unit of parallel work. A band produced by
/// [`partition`](crate::partition::partition) always has
/// `end_row > start_row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Band {
    /// First row covered by the band.
    pub start_row: u32,
    /// One past the last row covered by the band.
    pub end_row: u32,
}

impl Band {
    /// Create a band covering `[start_row, end_row)`.
    #[must_use]
    pub const fn new(start_row: u32, end_row: u32) -> Self {
        Self { start_row, end_row }
    }

    /// Number of rows in the band.
    #[must_use]
    pub const fn rows(self) -> u32 {
        self.end_row.saturating_sub(self.start_row)
    }
}

/// Binarized output of one band, still in band-local coordinates.
///
/// Owned exclusively by the worker that produced it until handed to
/// [`merge_bands`](crate::merge::merge_bands).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandMask {
    /// The rows this mask covers in the full image.
    pub band: Band,
    /// Mask pixels, `band.rows()` rows tall.
    pub mask: GrayImage,
}

/// Full-resolution binary mask.
///
/// Every pixel is either [`FOREGROUND`] or [`BACKGROUND`]. Rows are in
/// the original image order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// Wrap a binarized image.
    ///
    /// Returns `None` if any pixel is neither [`FOREGROUND`] nor
    /// [`BACKGROUND`].
    #[must_use]
    pub fn new(image: GrayImage) -> Option<Self> {
        image
            .as_raw()
            .iter()
            .all(|&v| v == FOREGROUND || v == BACKGROUND)
            .then_some(Self(image))
    }

    /// Mask dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.0.width(),
            height: self.0.height(),
        }
    }

    /// Whether the pixel at `(x, y)` is foreground.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the mask.
    #[must_use]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y).0[0] == FOREGROUND
    }

    /// Number of foreground pixels.
    #[must_use]
    pub fn foreground_count(&self) -> usize {
        self.0.as_raw().iter().filter(|&&v| v == FOREGROUND).count()
    }

    /// Borrow the underlying image.
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.0
    }

    /// Consume the mask and return the underlying image.
    #[must_use]
    pub fn into_image(self) -> GrayImage {
        self.0
    }
}

/// Configuration for one conversion run.
///
/// Every parameter has a default (see the `DEFAULT_*` constants).
/// Call [`validate`](Self::validate) before running; [`crate::convert`]
/// does so itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Edge-response threshold. Pixels whose edge response is strictly
    /// greater become foreground.
    pub threshold: u8,

    /// Number of bands, and the size of the worker pool that
    /// binarizes them.
    pub workers: usize,

    /// Images wider than this are downsampled to exactly this width,
    /// preserving aspect ratio.
    pub max_width: u32,

    /// Resampling filter used when downsampling.
    pub downsample_filter: DownsampleFilter,

    /// Canny hysteresis low bound. Pixels with gradient magnitude
    /// between `canny_low` and `canny_high` are edges only if connected
    /// to a strong edge.
    pub canny_low: f32,

    /// Canny hysteresis high bound. Pixels with gradient magnitude
    /// above this value are definite edges.
    pub canny_high: f32,
}

impl PipelineConfig {
    /// Default edge-response threshold (midpoint of the `u8` range).
    pub const DEFAULT_THRESHOLD: u8 = 128;

    /// Default band and worker count.
    pub const DEFAULT_WORKERS: usize = 4;

    /// Default maximum working width in pixels.
    pub const DEFAULT_MAX_WIDTH: u32 = 1000;

    /// Default downsample filter.
    pub const DEFAULT_DOWNSAMPLE_FILTER: DownsampleFilter = DownsampleFilter::Lanczos3;

    /// Default Canny low hysteresis bound, on a 0-255 gradient scale.
    pub const DEFAULT_CANNY_LOW: f32 = 100.0;

    /// Default Canny high hysteresis bound, on a 0-255 gradient scale.
    pub const DEFAULT_CANNY_HIGH: f32 = 200.0;

    /// Check the invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `workers` or
    /// `max_width` is zero, if `canny_low` is not positive, or if
    /// `canny_low` exceeds `canny_high`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "workers must be at least 1".to_owned(),
            ));
        }
        if self.max_width == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_width must be at least 1".to_owned(),
            ));
        }
        if self.canny_low.is_nan() || self.canny_low <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "canny_low must be positive, got {}",
                self.canny_low
            )));
        }
        if self.canny_low > self.canny_high {
            return Err(PipelineError::InvalidConfig(format!(
                "canny_low ({}) exceeds canny_high ({})",
                self.canny_low, self.canny_high
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            workers: Self::DEFAULT_WORKERS,
            max_width: Self::DEFAULT_MAX_WIDTH,
            downsample_filter: Self::DEFAULT_DOWNSAMPLE_FILTER,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
        }
    }
}

/// How a conversion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStatus {
    /// Every pixel of the mask was visited.
    Finished,
    /// The cancellation signal was observed before the scan completed.
    CancelledByUser,
}

/// Errors that can occur during pipeline processing.
///
/// Cancellation is not an error; see [`ConversionStatus`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The image has no pixels after preprocessing.
    #[error("image is empty after preprocessing ({width}x{height})")]
    EmptyImage {
        /// Width after preprocessing.
        width: u32,
        /// Height after preprocessing.
        height: u32,
    },

    /// Band masks did not tile the image. Indicates a bug in
    /// partitioning or binarization, never bad input.
    #[error("band masks do not tile the image: {0}")]
    MergeShape(String),

    /// The band worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

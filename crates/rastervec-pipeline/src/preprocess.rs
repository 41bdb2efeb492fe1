//! Image decoding, intensity conversion, and width-limiting downsample.
//!
//! This is the first step in the pipeline: raw bytes in, an
//! [`IntensityImage`] out. Images wider than the configured maximum are
//! resized to exactly that width with the aspect ratio preserved;
//! narrower images pass through untouched.

use std::fmt;

use image::DynamicImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, IntensityImage, PipelineConfig, PipelineError};

/// Resampling filter used when downsampling.
///
/// Every variant is anti-aliased. Nearest-neighbour is deliberately
/// not offered: it drops thin strokes, which then never reach the
/// edge detector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownsampleFilter {
    /// Bilinear interpolation: fast, decent quality.
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    #[default]
    Lanczos3,
}

impl DownsampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> FilterType {
        match self {
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for DownsampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Output of [`preprocess`].
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// The intensity image every later stage works on.
    pub image: IntensityImage,
    /// Dimensions of the decoded source, before any resize.
    pub source_dimensions: Dimensions,
    /// Whether the image was downsampled.
    pub downsampled: bool,
}

impl Preprocessed {
    /// Dimensions of the working image.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }
}

/// Decode raw image bytes.
///
/// Supports whatever formats the `image` crate is built with (PNG,
/// JPEG, BMP, WebP in this workspace).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Convert a decoded image to single-channel intensity.
///
/// Uses the `image` crate's luminance weighting, so the same input
/// always produces the same intensities.
#[must_use = "returns the intensity image"]
pub fn to_intensity(image: &DynamicImage) -> IntensityImage {
    image.to_luma8()
}

/// Height after scaling an image of `dimensions` to `target_width`,
/// rounded to the nearest row.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scaled_height(dimensions: Dimensions, target_width: u32) -> u32 {
    if dimensions.width == 0 {
        return 0;
    }
    let ratio = f64::from(target_width) / f64::from(dimensions.width);
    (f64::from(dimensions.height) * ratio).round() as u32
}

/// Downsample `image` so it is at most `max_width` pixels wide.
///
/// Returns the (possibly unchanged) image and whether downsampling
/// was actually applied.
#[must_use]
pub fn downsample(
    image: IntensityImage,
    max_width: u32,
    filter: DownsampleFilter,
) -> (IntensityImage, bool) {
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    if dimensions.width <= max_width {
        return (image, false);
    }

    let new_height = scaled_height(dimensions, max_width);
    if new_height == 0 {
        // Nothing to sample into; the caller rejects the empty result.
        return (IntensityImage::new(max_width, 0), true);
    }
    let resized = image::imageops::resize(&image, max_width, new_height, filter.to_image_filter());
    (resized, true)
}

/// Decode, convert to intensity, and downsample.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] or [`PipelineError::ImageDecode`]
/// from [`decode`], and [`PipelineError::EmptyImage`] if the result has
/// zero width or height.
pub fn preprocess(bytes: &[u8], config: &PipelineConfig) -> Result<Preprocessed, PipelineError> {
    let decoded = decode(bytes)?;
    let source_dimensions = Dimensions {
        width: decoded.width(),
        height: decoded.height(),
    };
    let intensity = to_intensity(&decoded);
    drop(decoded);

    let (image, downsampled) = downsample(intensity, config.max_width, config.downsample_filter);
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }

    log::debug!(
        "preprocessed {}x{} source into {}x{} intensity image (downsampled: {downsampled})",
        source_dimensions.width,
        source_dimensions.height,
        image.width(),
        image.height(),
    );

    Ok(Preprocessed {
        image,
        source_dimensions,
        downsampled,
    })
}

//! Reassemble per-band masks into one full-resolution mask.

use crate::partition::tiles;
use crate::types::{Band, BandMask, BinaryMask, Dimensions, GrayImage, PipelineError};

/// Stack band masks top to bottom by `start_row`.
///
/// The input order does not matter: masks are ordered by the band they
/// cover, never by when their worker finished. The bands must tile
/// `[0, dimensions.height)` exactly and every mask must be
/// `dimensions.width` wide and as tall as its band.
///
/// # Errors
///
/// Returns [`PipelineError::MergeShape`] if any mask has the wrong
/// shape, if the bands leave a gap or overlap, or if a mask contains
/// a value that is neither foreground nor background.
pub fn merge_bands(
    dimensions: Dimensions,
    mut band_masks: Vec<BandMask>,
) -> Result<BinaryMask, PipelineError> {
    band_masks.sort_by_key(|m| m.band.start_row);

    for BandMask { band, mask } in &band_masks {
        if mask.width() != dimensions.width || mask.height() != band.rows() {
            return Err(PipelineError::MergeShape(format!(
                "band [{}, {}) has a {}x{} mask, expected {}x{}",
                band.start_row,
                band.end_row,
                mask.width(),
                mask.height(),
                dimensions.width,
                band.rows(),
            )));
        }
    }

    let bands: Vec<Band> = band_masks.iter().map(|m| m.band).collect();
    if !tiles(&bands, dimensions.height) {
        return Err(PipelineError::MergeShape(format!(
            "bands {bands:?} do not tile [0, {})",
            dimensions.height
        )));
    }

    let mut pixels = Vec::with_capacity(
        usize::try_from(dimensions.pixel_count()).unwrap_or_default(),
    );
    for band_mask in band_masks {
        pixels.extend_from_slice(band_mask.mask.as_raw());
    }

    let image = GrayImage::from_raw(dimensions.width, dimensions.height, pixels).ok_or_else(
        || PipelineError::MergeShape("merged pixel count does not match dimensions".to_owned()),
    )?;
    BinaryMask::new(image).ok_or_else(|| {
        PipelineError::MergeShape("band mask contains non-binary values".to_owned())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BACKGROUND, FOREGROUND};

    const DIMS: Dimensions = Dimensions {
        width: 3,
        height: 5,
    };

    /// A band mask whose foreground pixels sit on the diagonal of the
    /// full image, so misordered rows are detectable.
    fn band_mask(start: u32, end: u32) -> BandMask {
        let mask = GrayImage::from_fn(DIMS.width, end - start, |x, y| {
            if (y + start) % DIMS.width == x {
                image::Luma([FOREGROUND])
            } else {
                image::Luma([BACKGROUND])
            }
        });
        BandMask {
            band: Band::new(start, end),
            mask,
        }
    }

    #[test]
    fn in_order_merge_preserves_rows() {
        let merged =
            merge_bands(DIMS, vec![band_mask(0, 1), band_mask(1, 2), band_mask(2, 5)]).unwrap();
        assert_eq!(merged.dimensions(), DIMS);
        for y in 0..DIMS.height {
            for x in 0..DIMS.width {
                assert_eq!(merged.is_foreground(x, y), y % DIMS.width == x, "({x}, {y})");
            }
        }
    }

    #[test]
    fn arrival_order_does_not_matter() {
        let in_order =
            merge_bands(DIMS, vec![band_mask(0, 1), band_mask(1, 2), band_mask(2, 5)]).unwrap();
        let shuffled =
            merge_bands(DIMS, vec![band_mask(2, 5), band_mask(0, 1), band_mask(1, 2)]).unwrap();
        assert_eq!(in_order, shuffled);
    }

    #[test]
    fn gap_is_rejected() {
        let result = merge_bands(DIMS, vec![band_mask(0, 1), band_mask(2, 5)]);
        assert!(matches!(result, Err(PipelineError::MergeShape(_))));
    }

    #[test]
    fn overlap_is_rejected() {
        let result = merge_bands(DIMS, vec![band_mask(0, 3), band_mask(2, 5)]);
        assert!(matches!(result, Err(PipelineError::MergeShape(_))));
    }

    #[test]
    fn short_coverage_is_rejected() {
        let result = merge_bands(DIMS, vec![band_mask(0, 4)]);
        assert!(matches!(result, Err(PipelineError::MergeShape(_))));
    }

    #[test]
    fn wrong_width_is_rejected() {
        let bad = BandMask {
            band: Band::new(2, 5),
            mask: GrayImage::from_pixel(4, 3, image::Luma([BACKGROUND])),
        };
        let result = merge_bands(DIMS, vec![band_mask(0, 2), bad]);
        assert!(matches!(result, Err(PipelineError::MergeShape(_))));
    }

    #[test]
    fn mask_taller_than_band_is_rejected() {
        let bad = BandMask {
            band: Band::new(2, 5),
            mask: GrayImage::from_pixel(3, 4, image::Luma([BACKGROUND])),
        };
        let result = merge_bands(DIMS, vec![band_mask(0, 2), bad]);
        assert!(matches!(result, Err(PipelineError::MergeShape(_))));
    }

    #[test]
    fn non_binary_values_are_rejected() {
        let bad = BandMask {
            band: Band::new(0, 5),
            mask: GrayImage::from_pixel(3, 5, image::Luma([7])),
        };
        let result = merge_bands(DIMS, vec![bad]);
        assert!(matches!(result, Err(PipelineError::MergeShape(_))));
    }
}

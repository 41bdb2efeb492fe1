//! Split an image into contiguous horizontal bands for parallel work.

use crate::types::Band;

/// Split `height` rows into at most `workers` contiguous bands.
///
/// Every band but the last is `height / workers` rows tall; the last
/// band absorbs the remainder, so the bands tile `[0, height)` exactly.
/// When `height < workers` each row gets its own band. A zero height or
/// zero worker count yields no bands.
#[must_use]
pub fn partition(height: u32, workers: usize) -> Vec<Band> {
    if height == 0 || workers == 0 {
        return Vec::new();
    }
    let count = u32::try_from(workers).map_or(height, |w| w.min(height));
    let chunk_size = height / count;

    (0..count)
        .map(|i| {
            let start_row = i * chunk_size;
            let end_row = if i + 1 == count {
                height
            } else {
                start_row + chunk_size
            };
            Band::new(start_row, end_row)
        })
        .collect()
}

/// Whether `bands` tile `[0, height)` in order with no gaps or overlaps.
#[must_use]
pub fn tiles(bands: &[Band], height: u32) -> bool {
    let mut expected_start = 0;
    for band in bands {
        if band.start_row != expected_start || band.end_row <= band.start_row {
            return false;
        }
        expected_start = band.end_row;
    }
    expected_start == height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_rows_four_workers() {
        let bands = partition(10, 4);
        assert_eq!(
            bands,
            vec![
                Band::new(0, 2),
                Band::new(2, 4),
                Band::new(4, 6),
                Band::new(6, 10),
            ]
        );
    }

    #[test]
    fn divisible_height_gives_equal_bands() {
        let bands = partition(12, 4);
        assert!(bands.iter().all(|b| b.rows() == 3));
    }

    #[test]
    fn fewer_rows_than_workers() {
        let bands = partition(3, 4);
        assert_eq!(
            bands,
            vec![Band::new(0, 1), Band::new(1, 2), Band::new(2, 3)]
        );
    }

    #[test]
    fn zero_height_yields_no_bands() {
        assert!(partition(0, 4).is_empty());
    }

    #[test]
    fn single_worker_covers_everything() {
        assert_eq!(partition(7, 1), vec![Band::new(0, 7)]);
    }

    #[test]
    fn huge_worker_count_does_not_overflow() {
        let bands = partition(5, usize::MAX);
        assert_eq!(bands.len(), 5);
        assert!(tiles(&bands, 5));
    }

    #[test]
    fn bands_tile_for_all_small_shapes() {
        for height in 1..=64 {
            for workers in 1..=16 {
                let bands = partition(height, workers);
                assert!(
                    tiles(&bands, height),
                    "h={height} k={workers} -> {bands:?}"
                );
                assert!(bands.len() <= workers);
            }
        }
    }

    #[test]
    fn tiles_rejects_gaps_and_overlaps() {
        assert!(!tiles(&[Band::new(0, 2), Band::new(3, 5)], 5));
        assert!(!tiles(&[Band::new(0, 3), Band::new(2, 5)], 5));
        assert!(!tiles(&[Band::new(0, 2)], 5));
        assert!(!tiles(&[Band::new(0, 0), Band::new(0, 5)], 5));
        assert!(tiles(&[], 0));
    }
}

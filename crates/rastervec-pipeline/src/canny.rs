//! Canny edge detection over a flat pixel grid.
//!
//! Smoothing and Sobel gradients come from `imageproc`; non-maximum
//! suppression and hysteresis are done here so that hysteresis tracks
//! all eight neighbours and stays in bounds on the image border. Bands
//! can be as thin as a single row, so border pixels are the common
//! case rather than the exception.
//!
//! Upstream reference for the border bug this avoids:
//! <https://github.com/image-rs/imageproc/issues/705>

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::{filter_clamped, gaussian_blur_f32};
use imageproc::kernel;

/// Smoothing applied before taking gradients.
const SIGMA: f32 = 1.4;

/// Value written for an edge pixel.
pub const EDGE: u8 = 255;

/// Gradient direction, quantized to the four neighbour axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Diagonal,
    Vertical,
    AntiDiagonal,
}

impl Direction {
    fn from_gradient(gx: i16, gy: i16) -> Self {
        let mut angle = f32::from(gy).atan2(f32::from(gx)).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if (22.5..67.5).contains(&angle) {
            Self::Diagonal
        } else if (67.5..112.5).contains(&angle) {
            Self::Vertical
        } else if (112.5..157.5).contains(&angle) {
            Self::AntiDiagonal
        } else {
            Self::Horizontal
        }
    }
}

/// Run Canny edge detection.
///
/// Returns a binary image: [`EDGE`] for edge pixels, 0 otherwise.
/// Pixels with suppressed gradient magnitude at or above `high` seed
/// an edge; pixels at or above `low` join an edge when 8-connected to
/// one. The caller guarantees `low <= high`.
#[must_use = "returns the edge map"]
pub fn canny(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);

    let blurred = gaussian_blur_f32(image, SIGMA);
    let gx: Image<Luma<i16>> = filter_clamped(&blurred, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(&blurred, kernel::SOBEL_VERTICAL_3X3);

    let magnitude: Vec<f32> = gx
        .as_raw()
        .iter()
        .zip(gy.as_raw())
        .map(|(&dx, &dy)| f32::from(dx).hypot(f32::from(dy)))
        .collect();

    let thinned = non_maximum_suppression(&magnitude, gx.as_raw(), gy.as_raw(), w, h);
    let edges = hysteresis(&thinned, w, h, low, high);

    GrayImage::from_fn(width, height, |x, y| {
        Luma([edges[y as usize * w + x as usize]])
    })
}

/// Zero every interior pixel that is not a local maximum along its
/// gradient direction. The one-pixel border is always zeroed.
fn non_maximum_suppression(
    magnitude: &[f32],
    gx: &[i16],
    gy: &[i16],
    w: usize,
    h: usize,
) -> Vec<f32> {
    let mut out = vec![0.0; magnitude.len()];
    if w < 3 || h < 3 {
        return out;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            let (a, b) = match Direction::from_gradient(gx[i], gy[i]) {
                Direction::Horizontal => (i - 1, i + 1),
                Direction::Diagonal => (i + w + 1, i - w - 1),
                Direction::Vertical => (i - w, i + w),
                Direction::AntiDiagonal => (i + w - 1, i - w + 1),
            };
            let m = magnitude[i];
            if m >= magnitude[a] && m >= magnitude[b] {
                out[i] = m;
            }
        }
    }
    out
}

/// Keep strong edges and the weak edges 8-connected to them.
///
/// Iterative depth-first flood from each strong seed; neighbours
/// outside the grid are skipped.
fn hysteresis(thinned: &[f32], w: usize, h: usize, low: f32, high: f32) -> Vec<u8> {
    let mut out = vec![0u8; thinned.len()];
    let mut stack = Vec::new();

    for seed in 0..thinned.len() {
        if thinned[seed] < high || out[seed] != 0 {
            continue;
        }
        out[seed] = EDGE;
        stack.push((seed % w, seed / w));

        while let Some((x, y)) = stack.pop() {
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if nx >= w || ny >= h {
                        continue;
                    }
                    let n = ny * w + nx;
                    if thinned[n] >= low && out[n] == 0 {
                        out[n] = EDGE;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

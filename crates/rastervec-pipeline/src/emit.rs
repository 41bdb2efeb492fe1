//! Per-pixel vector shape emission.
//!
//! The merged mask is scanned lazily in row-major order. The emitter
//! consumes that scan and owns the two cross-cutting concerns: it
//! checks the cancellation signal before every pixel and forwards
//! rate-limited progress. Shape output goes to a [`ShapeSink`], which
//! keeps this module free of any document format.

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationSignal;
use crate::progress::{ProgressSink, ProgressTicker};
use crate::types::{BinaryMask, ConversionStatus};

/// Receiver of emitted shapes.
pub trait ShapeSink {
    /// Append a filled, axis-aligned 1x1 shape with its top-left corner
    /// at pixel `(x, y)`.
    fn append_unit_square(&mut self, x: u32, y: u32);
}

/// Collects shape coordinates in emission order.
impl ShapeSink for Vec<(u32, u32)> {
    fn append_unit_square(&mut self, x: u32, y: u32) {
        self.push((x, y));
    }
}

impl<S: ShapeSink + ?Sized> ShapeSink for &mut S {
    fn append_unit_square(&mut self, x: u32, y: u32) {
        (**self).append_unit_square(x, y);
    }
}

/// One pixel of a mask scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedPixel {
    /// Column, 0 at the left edge.
    pub x: u32,
    /// Row, 0 at the top edge.
    pub y: u32,
    /// Whether the mask marks this pixel as an edge.
    pub foreground: bool,
}

/// Every pixel of `mask`, row 0 first, left to right.
///
/// The sequence is lazy and finite; to scan again, call this again.
pub fn scan(mask: &BinaryMask) -> impl Iterator<Item = ScannedPixel> + '_ {
    mask.as_image()
        .enumerate_pixels()
        .map(|(x, y, p)| ScannedPixel {
            x,
            y,
            foreground: p.0[0] == crate::types::FOREGROUND,
        })
}

/// Coordinates of the foreground pixels of `mask`, in scan order.
pub fn foreground_pixels(mask: &BinaryMask) -> impl Iterator<Item = (u32, u32)> + '_ {
    scan(mask).filter(|p| p.foreground).map(|p| (p.x, p.y))
}

/// Outcome of [`emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emission {
    /// Whether the scan ran to the end.
    pub status: ConversionStatus,
    /// Shapes appended to the sink.
    pub shapes: u64,
    /// Pixels visited before stopping.
    pub visited: u64,
}

/// Append one unit shape per foreground pixel of `mask` to `sink`.
///
/// `cancel` is checked before each pixel; once it is set the scan
/// stops immediately and returns [`ConversionStatus::CancelledByUser`]
/// with whatever was already appended. Progress is reported at most
/// once per 1% of pixels, plus a final full-progress event when the
/// scan completes. A cancelled scan gets no final event.
pub fn emit<S, P>(
    mask: &BinaryMask,
    sink: &mut S,
    progress: &mut P,
    cancel: &CancellationSignal,
) -> Emission
where
    S: ShapeSink + ?Sized,
    P: ProgressSink + ?Sized,
{
    let mut ticker = ProgressTicker::new(mask.dimensions().pixel_count());
    let mut shapes = 0;

    for pixel in scan(mask) {
        if cancel.is_cancelled() {
            log::warn!(
                "emission cancelled at ({}, {}) after {shapes} shapes",
                pixel.x,
                pixel.y
            );
            return Emission {
                status: ConversionStatus::CancelledByUser,
                shapes,
                visited: ticker.visited(),
            };
        }
        if pixel.foreground {
            sink.append_unit_square(pixel.x, pixel.y);
            shapes += 1;
        }
        if let Some(event) = ticker.advance() {
            progress.report(event);
        }
    }

    if let Some(event) = ticker.finish() {
        progress.report(event);
    }
    Emission {
        status: ConversionStatus::Finished,
        shapes,
        visited: ticker.visited(),
    }
}

//! Rate-limited progress reporting.
//!
//! [`ProgressTicker`] turns a stream of visited pixels into at most
//! one [`ProgressEvent`] per 1% of the total, plus a final event on
//! completion. Fractions never decrease within a run.

use serde::{Deserialize, Serialize};

/// Fraction of the scan completed, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Completed fraction.
    pub fraction: f64,
}

/// Receiver of progress notifications.
///
/// Implemented for any `FnMut(ProgressEvent)`, so a closure can be
/// passed directly.
pub trait ProgressSink {
    /// Called with each progress event, in non-decreasing order.
    fn report(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressSink for F {
    fn report(&mut self, event: ProgressEvent) {
        self(event);
    }
}

/// A [`ProgressSink`] that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _event: ProgressEvent) {}
}

/// Counts visited pixels and decides when to report.
///
/// Reports each time the completed whole percentage increases. With
/// `total < 100` no intermediate events are produced; only
/// [`finish`](Self::finish) reports.
#[derive(Debug, Clone)]
pub struct ProgressTicker {
    total: u64,
    visited: u64,
    reported_percent: u64,
}

impl ProgressTicker {
    /// Ticker for a scan of `total` pixels.
    #[must_use]
    pub const fn new(total: u64) -> Self {
        Self {
            total,
            visited: 0,
            reported_percent: 0,
        }
    }

    /// Pixels visited so far.
    #[must_use]
    pub const fn visited(&self) -> u64 {
        self.visited
    }

    /// Record one visited pixel. Returns an event when a 1% boundary
    /// is crossed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&mut self) -> Option<ProgressEvent> {
        self.visited += 1;
        if self.total < 100 {
            return None;
        }
        let percent = (u128::from(self.visited) * 100 / u128::from(self.total)) as u64;
        if percent <= self.reported_percent {
            return None;
        }
        self.reported_percent = percent;
        Some(self.event())
    }

    /// Final event of a completed scan, unless the last tick already
    /// reported 100%.
    pub const fn finish(&mut self) -> Option<ProgressEvent> {
        if self.reported_percent >= 100 {
            return None;
        }
        self.reported_percent = 100;
        Some(ProgressEvent { fraction: 1.0 })
    }

    #[allow(clippy::cast_precision_loss)]
    fn event(&self) -> ProgressEvent {
        let fraction = (self.visited as f64 / self.total as f64).min(1.0);
        ProgressEvent { fraction }
    }
}

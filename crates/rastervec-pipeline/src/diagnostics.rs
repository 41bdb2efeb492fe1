//! Conversion diagnostics: per-stage timing and counts.
//!
//! Collected on every run by [`crate::process`] and [`crate::convert`].
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{ConversionStatus, Dimensions};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionDiagnostics {
    /// Decode, intensity conversion, and downsample. Zero when the
    /// caller supplied an already-preprocessed image.
    #[serde(with = "duration_serde")]
    pub preprocess: Duration,
    /// Parallel edge detection and binarization across all bands.
    #[serde(with = "duration_serde")]
    pub binarize: Duration,
    /// Band mask reassembly.
    #[serde(with = "duration_serde")]
    pub merge: Duration,
    /// Per-pixel shape emission.
    #[serde(with = "duration_serde")]
    pub emit: Duration,
    /// Decoded source dimensions, when the pipeline did the decoding.
    pub source_dimensions: Option<Dimensions>,
    /// Whether the source was downsampled.
    pub downsampled: bool,
    /// Dimensions of the working image.
    pub dimensions: Option<Dimensions>,
    /// Number of bands the image was split into.
    pub band_count: usize,
    /// Foreground pixels in the merged mask (zero if the run was
    /// cancelled before merging).
    pub foreground_pixels: u64,
    /// Pixels visited by the emitter.
    pub pixels_visited: u64,
    /// Shapes appended to the sink.
    pub shapes_emitted: u64,
}

impl ConversionDiagnostics {
    /// Sum of the stage durations.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.preprocess + self.binarize + self.merge + self.emit
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self, status: ConversionStatus) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Conversion Diagnostics Report\n{}", "=".repeat(60)));
        if let Some(src) = self.source_dimensions {
            lines.push(format!("Source: {}x{}", src.width, src.height));
        }
        if let Some(dims) = self.dimensions {
            lines.push(format!(
                "Working image: {}x{} ({} pixels, downsampled: {})",
                dims.width,
                dims.height,
                dims.pixel_count(),
                self.downsampled,
            ));
        }
        lines.push(format!("Status: {status:?}"));
        lines.push(format!("Total duration: {:.3}ms", duration_ms(self.total())));
        lines.push(String::new());

        lines.push(format!("{:<16} {:>10} {:>10}", "Stage", "Duration", "% Total"));
        lines.push("-".repeat(40));

        let total_ms = duration_ms(self.total());
        for (name, duration) in [
            ("Preprocess", self.preprocess),
            ("Binarize", self.binarize),
            ("Merge", self.merge),
            ("Emit", self.emit),
        ] {
            let ms = duration_ms(duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Bands: {}  |  Foreground: {}  |  Visited: {}  |  Shapes: {}",
            self.band_count, self.foreground_pixels, self.pixels_visited, self.shapes_emitted,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> ConversionDiagnostics {
        ConversionDiagnostics {
            // Binary-exact second fractions so JSON roundtrips compare equal.
            preprocess: Duration::from_millis(250),
            binarize: Duration::from_millis(1000),
            merge: Duration::from_millis(125),
            emit: Duration::from_millis(500),
            source_dimensions: Some(Dimensions {
                width: 1200,
                height: 600,
            }),
            downsampled: true,
            dimensions: Some(Dimensions {
                width: 1000,
                height: 500,
            }),
            band_count: 4,
            foreground_pixels: 42,
            pixels_visited: 500_000,
            shapes_emitted: 42,
        }
    }

    #[test]
    fn total_sums_stages() {
        assert_eq!(sample().total(), Duration::from_millis(1875));
    }

    #[test]
    fn report_mentions_every_stage() {
        let report = sample().report(ConversionStatus::Finished);
        for stage in ["Preprocess", "Binarize", "Merge", "Emit"] {
            assert!(report.contains(stage), "missing {stage} in:\n{report}");
        }
        assert!(report.contains("1000x500"));
        assert!(report.contains("Shapes: 42"));
    }

    #[test]
    fn json_roundtrip() {
        let diag = sample();
        let json = serde_json::to_string(&diag).unwrap();
        let back: ConversionDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diag);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["emit"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<ConversionDiagnostics>(value).is_err());
    }
}

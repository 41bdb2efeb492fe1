//! File-to-file conversion.
//!
//! [`convert_file`] is the synchronous core that [`crate::Job`] runs on
//! its worker thread: read the source, run the pipeline into an
//! [`SvgDocument`], and write the document. A cancelled run still
//! writes the partial document.

use std::path::{Path, PathBuf};

use serde::Serialize;

use rastervec_export::{SvgDocument, SvgMetadata};
use rastervec_pipeline::{
    CancellationSignal, ConversionDiagnostics, ConversionStatus, Dimensions, PipelineConfig,
    PipelineError, ProgressSink,
};

/// Extension of the output document.
const OUTPUT_EXTENSION: &str = "svg";

/// Errors from a file conversion.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The source image could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The pipeline rejected the input or configuration.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The output document could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The worker thread could not be started.
    #[error("failed to start worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread panicked.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

/// What a completed file conversion produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    /// Whether emission finished or was cancelled.
    pub status: ConversionStatus,
    /// Where the document was written.
    pub output: PathBuf,
    /// Document dimensions in pixels.
    pub dimensions: Dimensions,
    /// Per-stage timing and counts.
    pub diagnostics: ConversionDiagnostics,
}

/// The input path with its extension replaced by `.svg`.
///
/// ```
/// use std::path::Path;
/// use rastervec_io::default_output_path;
///
/// assert_eq!(default_output_path(Path::new("scans/cat.png")), Path::new("scans/cat.svg"));
/// ```
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension(OUTPUT_EXTENSION)
}

/// Describe the run for the document's `<desc>` element.
fn describe(config: &PipelineConfig) -> String {
    format!(
        "rastervec: threshold={} workers={} max_width={} filter={}",
        config.threshold, config.workers, config.max_width, config.downsample_filter
    )
}

/// Read `input`, convert it, and write the SVG document to `output`.
///
/// # Errors
///
/// Returns [`JobError::Read`] if `input` cannot be read,
/// [`JobError::Pipeline`] if decoding or conversion fails, and
/// [`JobError::Write`] if `output` cannot be written. Nothing is
/// written when the pipeline fails.
pub fn convert_file<P>(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
    progress: &mut P,
    cancel: &CancellationSignal,
) -> Result<ConversionReport, JobError>
where
    P: ProgressSink + ?Sized,
{
    let bytes = std::fs::read(input).map_err(|source| JobError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    log::debug!("read {} bytes from {}", bytes.len(), input.display());

    let title = input.file_stem().map(|stem| stem.to_string_lossy());
    let description = describe(config);
    let metadata = SvgMetadata {
        title: title.as_deref(),
        description: Some(&description),
    };

    let processed = rastervec_pipeline::process(
        &bytes,
        config,
        |dims| SvgDocument::new(dims, &metadata),
        progress,
        cancel,
    )?;
    let conversion = processed.conversion;

    std::fs::write(output, processed.sink.render()).map_err(|source| JobError::Write {
        path: output.to_path_buf(),
        source,
    })?;

    match conversion.status {
        ConversionStatus::Finished => log::info!(
            "wrote {} shapes to {} in {:.3}s",
            conversion.diagnostics.shapes_emitted,
            output.display(),
            conversion.diagnostics.total().as_secs_f64(),
        ),
        ConversionStatus::CancelledByUser => log::warn!(
            "cancelled; wrote partial document with {} shapes to {}",
            conversion.diagnostics.shapes_emitted,
            output.display(),
        ),
    }

    Ok(ConversionReport {
        status: conversion.status,
        output: output.to_path_buf(),
        dimensions: conversion.dimensions,
        diagnostics: conversion.diagnostics,
    })
}

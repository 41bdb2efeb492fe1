//! rastervec-io: Files and background jobs.
//!
//! Reads source images from disk, runs the pipeline into an SVG
//! document, and writes the result. [`Job`] runs a conversion on a
//! dedicated thread with progress subscription and cancellation.

pub mod file;
pub mod job;

pub use file::{ConversionReport, JobError, convert_file, default_output_path};
pub use job::{Job, JobOutcome, JobRequest};

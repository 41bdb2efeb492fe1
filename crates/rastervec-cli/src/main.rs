//! rastervec: convert a raster image into an SVG of edge pixels.
//!
//! Runs a conversion job on a background thread, shows progress on
//! stderr, and prints the diagnostics report when the job ends.
//!
//! # Usage
//!
//! ```text
//! rastervec [OPTIONS] <INPUT>
//! ```
//!
//! Exit status is 0 when the document was finished, 130 when the run
//! was cancelled (the partial document is still written), and 1 on
//! any failure. Set `RUST_LOG=debug` for per-stage logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use rastervec_io::{ConversionReport, Job, JobOutcome, JobRequest};
use rastervec_pipeline::{CancellationSignal, DownsampleFilter, PipelineConfig, ProgressEvent};

/// Exit status of a finished run.
const EXIT_SUCCESS: u8 = 0;

/// Exit status of a failed run.
const EXIT_FAILURE: u8 = 1;

/// Exit status of a cancelled run (128 + SIGINT).
const EXIT_CANCELLED: u8 = 130;

/// Convert a raster image into an SVG with one black unit square per
/// edge pixel.
#[derive(Parser)]
#[command(name = "rastervec", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Output SVG path. Defaults to the input path with an `.svg`
    /// extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Edge-response threshold; pixels above it become shapes.
    #[arg(short, long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Number of horizontal bands processed in parallel.
    #[arg(short, long, default_value_t = PipelineConfig::DEFAULT_WORKERS, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    workers: usize,

    /// Images wider than this are downsampled to it first.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MAX_WIDTH, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    max_width: u32,

    /// Downsample filter (triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    filter: Filter,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization; missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Print the result as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Suppress progress output.
    #[arg(short, long)]
    quiet: bool,
}

/// Downsample resampling filter selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Filter {
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl From<Filter> for DownsampleFilter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

const fn filter_from_pipeline(f: DownsampleFilter) -> Filter {
    match f {
        DownsampleFilter::Triangle => Filter::Triangle,
        DownsampleFilter::CatmullRom => Filter::CatmullRom,
        DownsampleFilter::Gaussian => Filter::Gaussian,
        DownsampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(PipelineConfig::DEFAULT_DOWNSAMPLE_FILTER);

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// `--config-json` wins over the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        PipelineConfig {
            threshold: cli.threshold,
            workers: cli.workers,
            max_width: cli.max_width,
            downsample_filter: cli.filter.into(),
            ..PipelineConfig::default()
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Render a progress event as an in-place percentage on stderr.
fn show_progress(event: ProgressEvent) {
    let mut stderr = std::io::stderr().lock();
    // Progress is cosmetic; a closed stderr is not worth failing over.
    let _ = write!(stderr, "\r{:>3.0}%", event.fraction * 100.0);
    let _ = stderr.flush();
}

fn print_report(report: &ConversionReport, json: bool) -> Result<(), String> {
    if json {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| format!("Error serializing report: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", report.diagnostics.report(report.status));
        println!("Output: {}", report.output.display());
    }
    Ok(())
}

/// Run one conversion, observing `cancel`, and return the exit status.
fn run(cli: &Cli, cancel: CancellationSignal) -> u8 {
    let config = match config_from_cli(cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return EXIT_FAILURE;
        }
    };

    let request = JobRequest {
        output: cli.output.clone(),
        config,
        cancel,
        ..JobRequest::new(&cli.input)
    };
    if !cli.quiet {
        eprintln!(
            "Converting {} -> {}",
            request.input.display(),
            request.output_path().display()
        );
    }

    let job = match Job::start(request) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("{e}");
            return EXIT_FAILURE;
        }
    };
    if !cli.quiet {
        job.subscribe_progress(show_progress);
    }

    let outcome = job.await_result();
    if !cli.quiet {
        eprintln!();
    }

    let (report, code) = match &outcome {
        JobOutcome::Finished(report) => (report, EXIT_SUCCESS),
        JobOutcome::CancelledByUser(report) => {
            eprintln!("Cancelled; partial document written");
            (report, EXIT_CANCELLED)
        }
        JobOutcome::Failed(e) => {
            log::error!("conversion failed: {e:?}");
            eprintln!("Error: {e}");
            return EXIT_FAILURE;
        }
    };

    if let Err(msg) = print_report(report, cli.json) {
        eprintln!("{msg}");
        return EXIT_FAILURE;
    }
    code
}

/// Cancel `cancel` on the first Ctrl-C; exit on the second.
fn install_interrupt_handler(cancel: CancellationSignal) {
    let result = ctrlc::set_handler(move || {
        if cancel.cancel() {
            eprintln!("\nStopping; press Ctrl-C again to abort without saving");
        } else {
            std::process::exit(i32::from(EXIT_CANCELLED));
        }
    });
    if let Err(e) = result {
        log::warn!("failed to install Ctrl-C handler: {e}");
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let cancel = CancellationSignal::new();
    install_interrupt_handler(cancel.clone());
    ExitCode::from(run(&cli, cancel))
}

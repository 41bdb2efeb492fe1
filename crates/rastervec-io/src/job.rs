//! Background conversion jobs.
//!
//! A [`Job`] runs [`convert_file`] on a dedicated thread so the caller
//! stays responsive. The caller can subscribe to progress, request
//! cancellation, and wait for the outcome.
//!
//! Progress callbacks run on the worker thread while the job's
//! subscriber list is locked, so a callback must not call
//! [`Job::subscribe_progress`] and should return quickly. A subscriber
//! added after progress has started is immediately sent the latest
//! fraction on the subscribing thread, so every subscriber sees a
//! non-decreasing sequence ending at the job's final state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use rastervec_pipeline::{CancellationSignal, ConversionStatus, PipelineConfig, ProgressEvent};

use crate::file::{ConversionReport, JobError, convert_file, default_output_path};

/// Name of the worker thread.
const WORKER_THREAD_NAME: &str = "rastervec-job";

type Subscriber = Box<dyn FnMut(ProgressEvent) + Send>;

/// What to convert.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Source image.
    pub input: PathBuf,
    /// Destination document. Defaults to [`default_output_path`].
    pub output: Option<PathBuf>,
    /// Pipeline parameters.
    pub config: PipelineConfig,
    /// Signal the job observes. Cancelling it is equivalent to
    /// [`Job::cancel`].
    pub cancel: CancellationSignal,
}

impl JobRequest {
    /// Request converting `input` with the default configuration.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            config: PipelineConfig::default(),
            cancel: CancellationSignal::new(),
        }
    }

    /// The output path this request resolves to.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }
}

/// Terminal state of a [`Job`].
#[derive(Debug)]
pub enum JobOutcome {
    /// Every pixel was visited and the document was written.
    Finished(ConversionReport),
    /// Stopped by cancellation; the partial document was written.
    CancelledByUser(ConversionReport),
    /// Nothing usable was produced.
    Failed(JobError),
}

impl JobOutcome {
    /// The report, unless the job failed.
    #[must_use]
    pub const fn report(&self) -> Option<&ConversionReport> {
        match self {
            Self::Finished(report) | Self::CancelledByUser(report) => Some(report),
            Self::Failed(_) => None,
        }
    }
}

impl From<Result<ConversionReport, JobError>> for JobOutcome {
    fn from(result: Result<ConversionReport, JobError>) -> Self {
        match result {
            Ok(report) => match report.status {
                ConversionStatus::Finished => Self::Finished(report),
                ConversionStatus::CancelledByUser => Self::CancelledByUser(report),
            },
            Err(err) => Self::Failed(err),
        }
    }
}

#[derive(Default)]
struct ProgressState {
    latest: Option<ProgressEvent>,
    subscribers: Vec<Subscriber>,
}

/// Fan-out of progress events to subscribers.
#[derive(Default)]
struct ProgressHub(Mutex<ProgressState>);

impl ProgressHub {
    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        // A panicking subscriber must not wedge the job.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: ProgressEvent) {
        let mut state = self.lock();
        state.latest = Some(event);
        for subscriber in &mut state.subscribers {
            subscriber(event);
        }
    }

    /// Register `subscriber`, replaying the latest event to it first.
    ///
    /// The replay runs without the lock held. If a newer event is
    /// published meanwhile, it is replayed too before the subscriber
    /// joins the list, so the final event is never missed.
    fn subscribe(&self, mut subscriber: Subscriber) {
        let mut replayed = None;
        loop {
            let latest = self.lock().latest;
            if latest != replayed {
                if let Some(event) = latest {
                    subscriber(event);
                }
                replayed = latest;
            }
            let mut state = self.lock();
            if state.latest == replayed {
                state.subscribers.push(subscriber);
                return;
            }
        }
    }
}

/// A conversion running on a background thread.
///
/// # Examples
///
/// ```no_run
/// use rastervec_io::{Job, JobOutcome, JobRequest};
///
/// let job = Job::start(JobRequest::new("scan.png"))?;
/// job.subscribe_progress(|event| eprintln!("{:.0}%", event.fraction * 100.0));
/// match job.await_result() {
///     JobOutcome::Finished(report) => println!("wrote {}", report.output.display()),
///     JobOutcome::CancelledByUser(_) => println!("stopped"),
///     JobOutcome::Failed(err) => eprintln!("{err}"),
/// }
/// # Ok::<(), rastervec_io::JobError>(())
/// ```
pub struct Job {
    cancel: CancellationSignal,
    progress: Arc<ProgressHub>,
    handle: JoinHandle<Result<ConversionReport, JobError>>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.handle.is_finished())
            .finish_non_exhaustive()
    }
}

impl Job {
    /// Start converting on a new thread.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Spawn`] if the thread cannot be created.
    /// Every other failure is reported by [`await_result`](Self::await_result).
    pub fn start(request: JobRequest) -> Result<Self, JobError> {
        let progress = Arc::new(ProgressHub::default());
        let cancel = request.cancel.clone();
        let output = request.output_path();

        let hub = Arc::clone(&progress);
        let handle = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || {
                log::debug!(
                    "converting {} -> {}",
                    request.input.display(),
                    output.display()
                );
                convert_file(
                    &request.input,
                    &output,
                    &request.config,
                    &mut |event: ProgressEvent| hub.publish(event),
                    &request.cancel,
                )
            })
            .map_err(JobError::Spawn)?;

        Ok(Self {
            cancel,
            progress,
            handle,
        })
    }

    /// Register a progress callback.
    ///
    /// If progress has already been reported, `callback` is called
    /// right away on this thread with the latest event. Later calls run
    /// on the worker thread while the subscriber list is locked, so
    /// `callback` must not subscribe again and should return quickly.
    pub fn subscribe_progress<F>(&self, callback: F)
    where
        F: FnMut(ProgressEvent) + Send + 'static,
    {
        self.progress.subscribe(Box::new(callback));
    }

    /// Ask the job to stop.
    ///
    /// Idempotent. Has no effect on a job that already finished.
    pub fn cancel(&self) {
        if self.cancel.cancel() {
            log::debug!("cancellation requested");
        }
    }

    /// Whether the worker thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the job ends.
    #[must_use]
    pub fn await_result(self) -> JobOutcome {
        self.handle
            .join()
            .map_or(JobOutcome::Failed(JobError::WorkerPanicked), JobOutcome::from)
    }
}

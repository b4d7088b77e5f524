// Cleaning Controller - Bridges a front end with state management and the cleaning engine
//
// This module contains the CleaningController which coordinates between:
// - StateManager (selection and job state)
// - CleanJob (business logic)
// - The tokio runtime (keeps blocking file I/O off the caller's thread)
//
// A front end (the CLI here, a GUI elsewhere) calls select/set_output/clean and
// subscribes to StateManager events to render progress.

use crate::metrics::Metrics;
use crate::models::{CleanableFile, CleanerSettings, CleaningReport, FileKind, MAX_CONCURRENT_JOBS};
use crate::services::{CleanError, CleanJob, EntryProgress};
use crate::state::StateManager;
use camino::Utf8PathBuf;
use std::io;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Runs cleaning jobs on tokio's blocking pool, one at a time
///
/// # Example
/// ```ignore
/// let state = Arc::new(StateManager::new());
/// let controller = Arc::new(CleaningController::from_settings(
///     state.clone(),
///     &settings,
///     metrics,
///     runtime.handle().clone(),
/// ));
///
/// controller.select_input("exports/feed.txt")?;
/// let report = runtime.block_on(controller.clean())?;
/// ```
pub struct CleaningController {
    state: Arc<StateManager>,

    job: Arc<CleanJob>,

    /// One permit per allowed concurrent job (see [`MAX_CONCURRENT_JOBS`])
    permits: Arc<Semaphore>,

    tokio_handle: tokio::runtime::Handle,
}

impl CleaningController {
    pub fn new(
        state: Arc<StateManager>,
        job: CleanJob,
        tokio_handle: tokio::runtime::Handle,
    ) -> Self {
        Self {
            state,
            job: Arc::new(job),
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_JOBS)),
            tokio_handle,
        }
    }

    /// Build a controller whose job is configured from user settings
    pub fn from_settings(
        state: Arc<StateManager>,
        settings: &CleanerSettings,
        metrics: Arc<Metrics>,
        tokio_handle: tokio::runtime::Handle,
    ) -> Self {
        let job = CleanJob::from_settings(settings).with_metrics(metrics);
        Self::new(state, job, tokio_handle)
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    /// True while a job holds the permit
    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }

    /// Select an input file and derive its default output path
    ///
    /// Selections that do not exist are rejected and leave the state untouched.
    pub fn select_input(&self, path: impl AsRef<str>) -> Result<FileKind, CleanError> {
        let file = CleanableFile::new(path)?;

        if !file.input_path.exists() {
            tracing::warn!("Selected file does not exist: {}", file.input_path);
            return Err(CleanError::InputNotFound {
                path: file.input_path,
                source: io::Error::new(io::ErrorKind::NotFound, "selected file does not exist"),
            });
        }

        let kind = file.kind();
        tracing::info!(
            "Selected {} ({}), default output {}",
            file.input_path,
            kind,
            file.output_path
        );
        self.state.select(file)?;

        Ok(kind)
    }

    /// Override where the cleaned copy is written
    pub fn set_output_path(&self, path: impl Into<Utf8PathBuf>) -> Result<(), CleanError> {
        let path = path.into();
        tracing::info!("Output path set to {}", path);
        self.state.set_output_path(path)?;
        Ok(())
    }

    /// Drop the current selection
    pub fn reset(&self) {
        self.state.reset();
    }

    /// Clean the current selection
    ///
    /// The job runs in its own task that owns the permit and always moves the
    /// state to `Done` or `Failed`; this future only awaits it. Dropping the
    /// future early therefore leaves the job running to completion. Archive
    /// entry progress is forwarded to the [`StateManager`] as it happens.
    ///
    /// # Errors
    /// - `JobInProgress` if another job is running (jobs are rejected, not queued)
    /// - `InvalidArgument` if nothing is selected
    /// - any error from the job itself, unchanged
    pub async fn clean(&self) -> Result<CleaningReport, CleanError> {
        let permit = Arc::clone(&self.permits).try_acquire_owned().map_err(|_| {
            tracing::warn!("Rejected cleaning request: a job is already running");
            CleanError::JobInProgress
        })?;

        let file = self.state.start_cleaning()?;
        let input = file.input_path.clone();

        let job = Arc::clone(&self.job);
        let state = Arc::clone(&self.state);
        let handle = self.tokio_handle.clone();

        let task = self.tokio_handle.spawn(async move {
            let result = run_job(job, Arc::clone(&state), file, &handle).await;

            match &result {
                Ok(report) => {
                    state.finish_cleaning(report.clone());
                }
                Err(e) => {
                    if e.is_missing_input() {
                        tracing::warn!("Input disappeared before cleaning, selection cleared");
                    }
                    tracing::error!("Cleaning failed ({:?}): {}", e.kind(), e);
                    state.fail_cleaning(e);
                }
            }

            drop(permit);
            result
        });

        task.await.unwrap_or_else(|e| {
            tracing::error!("Cleaning task for {} did not complete: {}", input, e);
            Err(CleanError::io(input, io::Error::other(e.to_string())))
        })
    }

    /// Start [`clean`](Self::clean) as a background task and return immediately
    ///
    /// Intended for event callbacks that must not block.
    pub fn spawn_clean(self: &Arc<Self>) -> JoinHandle<Result<CleaningReport, CleanError>> {
        let controller = Arc::clone(self);
        self.tokio_handle
            .spawn(async move { controller.clean().await })
    }
}

/// Run one job on the blocking pool, forwarding entry progress into state
async fn run_job(
    job: Arc<CleanJob>,
    state: Arc<StateManager>,
    mut file: CleanableFile,
    handle: &tokio::runtime::Handle,
) -> Result<CleaningReport, CleanError> {
    let input = file.input_path.clone();

    let blocking = handle.spawn_blocking(move || {
        let mut forward = |progress: &EntryProgress| {
            state.update_entry_progress(progress);
        };
        job.run(&mut file, Some(&mut forward))
    });

    match blocking.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Cleaning worker for {} did not complete: {}", input, e);
            Err(CleanError::io(input, io::Error::other(e.to_string())))
        }
    }
}

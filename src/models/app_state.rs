use super::cleanable_file::{CleanableFile, CleaningReport, FileKind};

/// Maximum number of cleaning jobs that may run at once.
///
/// **IMPORTANT:** This is hardcoded to 1 because the archive cleaner stages
/// work in a fixed, process-wide scratch directory. Two archive jobs running
/// together would delete each other's extracted entries.
///
/// This constraint is enforced by [`crate::controller::CleaningController`]
/// with a `tokio::sync::Semaphore`; a second job is rejected with
/// [`JobInProgress`](crate::services::CleanError::JobInProgress).
pub const MAX_CONCURRENT_JOBS: usize = 1;

/// Where the selection/job lifecycle currently is
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JobPhase {
    #[default]
    NoSelection,
    Ready {
        kind: FileKind,
    },
    Cleaning {
        kind: FileKind,
    },
    Done {
        report: CleaningReport,
    },
    Failed {
        message: String,
    },
}

impl JobPhase {
    pub fn is_cleaning(&self) -> bool {
        matches!(self, JobPhase::Cleaning { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, JobPhase::Ready { .. })
    }
}

/// Single source of truth for selection and job state.
///
/// # Thread Safety
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`].
/// Never mutate it directly; go through the manager so change events are emitted.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub phase: JobPhase,

    /// The file the user picked; `None` before selection and after a job ends
    pub selected: Option<CleanableFile>,

    // Archive progress
    pub current_entry: Option<String>,
    pub entries_done: usize,
    pub entries_total: usize,

    // Results of the most recent job
    pub last_report: Option<CleaningReport>,
    pub last_error: Option<String>,
}

impl AppState {
    /// True when a file is selected and no job is running
    pub fn can_clean(&self) -> bool {
        self.selected.is_some() && !self.phase.is_cleaning()
    }

    /// Clear progress counters ahead of a new job
    pub fn reset_progress(&mut self) {
        self.current_entry = None;
        self.entries_done = 0;
        self.entries_total = 0;
    }

    /// Drop the selection and return to the starting state
    pub fn reset(&mut self) {
        self.phase = JobPhase::NoSelection;
        self.selected = None;
        self.reset_progress();
    }
}

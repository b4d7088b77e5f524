// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for front-end updates.

use crate::models::{AppState, CleanableFile, CleaningReport, FileKind, JobPhase};
use crate::services::{CleanError, EntryProgress};
use camino::Utf8PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// A front end subscribes to these instead of polling, and renders each
/// transition of the selection/job state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A new input was selected and is ready to clean
    SelectionChanged {
        input: Utf8PathBuf,
        output: Utf8PathBuf,
        kind: FileKind,
    },

    /// The user chose a different output path for the current selection
    OutputPathChanged { output: Utf8PathBuf },

    /// A job has started
    CleaningStarted { kind: FileKind },

    /// An archive entry has been processed
    EntryProgress {
        entry: String,
        current: usize,
        total: usize,
    },

    /// A job finished successfully
    CleaningFinished { total_replacements: u64 },

    /// A job failed; the selection has been cleared
    CleaningFailed { message: String },

    /// State has been reset to "no selection"
    StateReset,
}

/// Thread-safe state manager with event emission
///
/// This is the central state management component that:
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Validates state transitions (no output change or second start while cleaning)
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// The lifecycle it drives is
/// `NoSelection → Ready(kind) → Cleaning → Done(report) | Failed(error)`.
pub struct StateManager {
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state and a 100-event buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Get a clone of the current state
    pub fn snapshot(&self) -> AppState {
        self.read(|state| state.clone())
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let ready = state_manager.read(|state| state.can_clean());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        self.update_with(update_fn).1
    }

    /// Like [`update`](Self::update), but also returns the closure's result
    ///
    /// The check and the mutation happen under one write lock.
    fn update_with<F, R>(&self, update_fn: F) -> (R, Vec<StateChange>)
    where
        F: FnOnce(&mut AppState) -> R,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        let result = update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            self.emit(change.clone());
        }

        (result, changes)
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, change: StateChange) {
        // Nobody listening is fine
        let _ = self.state_tx.send(change);
    }

    fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        // Selection changes
        match (&old.selected, &new.selected) {
            (old_sel, Some(new_sel))
                if old_sel.as_ref().map(|f| &f.input_path) != Some(&new_sel.input_path) =>
            {
                changes.push(StateChange::SelectionChanged {
                    input: new_sel.input_path.clone(),
                    output: new_sel.output_path.clone(),
                    kind: new_sel.kind(),
                });
            }
            (Some(old_sel), Some(new_sel)) if old_sel.output_path != new_sel.output_path => {
                changes.push(StateChange::OutputPathChanged {
                    output: new_sel.output_path.clone(),
                });
            }
            _ => {}
        }

        // Phase transitions
        if old.phase != new.phase {
            match &new.phase {
                JobPhase::Cleaning { kind } => {
                    changes.push(StateChange::CleaningStarted { kind: *kind });
                }
                JobPhase::Done { report } => {
                    changes.push(StateChange::CleaningFinished {
                        total_replacements: report.total_replacements,
                    });
                }
                JobPhase::Failed { message } => {
                    changes.push(StateChange::CleaningFailed {
                        message: message.clone(),
                    });
                }
                JobPhase::NoSelection | JobPhase::Ready { .. } => {}
            }
        }

        // Archive progress
        if let Some(entry) = &new.current_entry {
            if old.entries_done != new.entries_done || old.current_entry != new.current_entry {
                changes.push(StateChange::EntryProgress {
                    entry: entry.clone(),
                    current: new.entries_done,
                    total: new.entries_total,
                });
            }
        }

        changes
    }

    // Convenience transitions

    /// Select a file, replacing any previous selection
    ///
    /// Rejected with `JobInProgress` while a job is running.
    pub fn select(&self, file: CleanableFile) -> Result<Vec<StateChange>, CleanError> {
        let (result, changes) = self.update_with(|state| {
            if state.phase.is_cleaning() {
                return Err(CleanError::JobInProgress);
            }
            state.phase = JobPhase::Ready { kind: file.kind() };
            state.selected = Some(file);
            state.reset_progress();
            state.last_error = None;
            Ok(())
        });
        result.map(|_| changes)
    }

    /// Override the output path of the current selection
    pub fn set_output_path(&self, output: Utf8PathBuf) -> Result<Vec<StateChange>, CleanError> {
        let (result, changes) = self.update_with(|state| {
            if state.phase.is_cleaning() {
                return Err(CleanError::JobInProgress);
            }
            let selected = state.selected.as_mut().ok_or_else(|| {
                CleanError::InvalidArgument("no file selected".to_string())
            })?;
            selected.output_path = output;
            Ok(())
        });
        result.map(|_| changes)
    }

    /// Move from `Ready` to `Cleaning` and hand out a copy of the selection
    pub fn start_cleaning(&self) -> Result<CleanableFile, CleanError> {
        let (result, _) = self.update_with(|state| {
            if state.phase.is_cleaning() {
                return Err(CleanError::JobInProgress);
            }
            let selected = state.selected.clone().ok_or_else(|| {
                CleanError::InvalidArgument("no file selected".to_string())
            })?;
            state.phase = JobPhase::Cleaning {
                kind: selected.kind(),
            };
            state.reset_progress();
            Ok(selected)
        });
        result
    }

    /// Record that an archive entry has been processed
    pub fn update_entry_progress(&self, progress: &EntryProgress) -> Vec<StateChange> {
        self.update(|state| {
            state.current_entry = Some(progress.entry.clone());
            state.entries_done = progress.index;
            state.entries_total = progress.total;
        })
    }

    /// Move to `Done` and clear the selection
    pub fn finish_cleaning(&self, report: CleaningReport) -> Vec<StateChange> {
        self.update(|state| {
            state.last_report = Some(report.clone());
            state.phase = JobPhase::Done { report };
            state.selected = None;
            state.current_entry = None;
        })
    }

    /// Move to `Failed` and clear the selection
    pub fn fail_cleaning(&self, error: &CleanError) -> Vec<StateChange> {
        let message = error.to_string();
        self.update(|state| {
            state.last_error = Some(message.clone());
            state.phase = JobPhase::Failed { message };
            state.selected = None;
            state.current_entry = None;
        })
    }

    /// Return to "no selection"
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| state.reset());

        changes.push(StateChange::StateReset);
        self.emit(StateChange::StateReset);

        changes
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::time::Duration;

    fn report(total: u64) -> CleaningReport {
        CleaningReport {
            kind: FileKind::Text,
            output_path: "out.txt".into(),
            total_replacements: total,
            files_cleaned: 1,
            entries: IndexMap::new(),
            failed_entries: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_select_emits_selection_changed() {
        let manager = StateManager::new();

        let changes = manager
            .select(CleanableFile::new("feed.txt").unwrap())
            .unwrap();

        assert_eq!(
            changes,
            vec![StateChange::SelectionChanged {
                input: "feed.txt".into(),
                output: "feed_cleaned.txt".into(),
                kind: FileKind::Text,
            }]
        );
        assert!(manager.read(|s| s.phase.is_ready()));
    }

    #[test]
    fn test_output_override() {
        let manager = StateManager::new();
        manager
            .select(CleanableFile::new("bundle.zip").unwrap())
            .unwrap();

        let changes = manager.set_output_path("custom.zip".into()).unwrap();

        assert_eq!(
            changes,
            vec![StateChange::OutputPathChanged {
                output: "custom.zip".into()
            }]
        );
        let selected = manager.read(|s| s.selected.clone()).unwrap();
        assert_eq!(selected.kind(), FileKind::Archive);
    }

    #[test]
    fn test_output_override_requires_selection() {
        let manager = StateManager::new();
        let err = manager.set_output_path("x.txt".into()).unwrap_err();
        assert!(matches!(err, CleanError::InvalidArgument(_)));
    }

    #[test]
    fn test_start_cleaning_twice_rejected() {
        let manager = StateManager::new();
        manager
            .select(CleanableFile::new("feed.txt").unwrap())
            .unwrap();

        let file = manager.start_cleaning().unwrap();
        assert_eq!(file.input_path, Utf8PathBuf::from("feed.txt"));

        let err = manager.start_cleaning().unwrap_err();
        assert!(matches!(err, CleanError::JobInProgress));
    }

    #[test]
    fn test_start_without_selection() {
        let manager = StateManager::new();
        let err = manager.start_cleaning().unwrap_err();
        assert!(matches!(err, CleanError::InvalidArgument(_)));
        assert_eq!(manager.read(|s| s.phase.clone()), JobPhase::NoSelection);
    }

    #[test]
    fn test_finish_clears_selection() {
        let manager = StateManager::new();
        manager
            .select(CleanableFile::new("feed.txt").unwrap())
            .unwrap();
        manager.start_cleaning().unwrap();

        let changes = manager.finish_cleaning(report(4));

        assert_eq!(
            changes,
            vec![StateChange::CleaningFinished {
                total_replacements: 4
            }]
        );
        let state = manager.snapshot();
        assert!(state.selected.is_none());
        assert_eq!(state.last_report.unwrap().total_replacements, 4);
    }

    #[test]
    fn test_fail_records_message() {
        let manager = StateManager::new();
        manager
            .select(CleanableFile::new("feed.txt").unwrap())
            .unwrap();
        manager.start_cleaning().unwrap();

        let error = CleanError::InputVanished("feed.txt".into());
        let changes = manager.fail_cleaning(&error);

        assert!(matches!(&changes[0], StateChange::CleaningFailed { message } if message.contains("feed.txt")));
        assert!(manager.read(|s| s.selected.is_none()));
        assert!(manager.read(|s| s.last_error.is_some()));
    }

    #[test]
    fn test_entry_progress_event() {
        let manager = StateManager::new();
        let changes = manager.update_entry_progress(&EntryProgress {
            entry: "sub/b.txt".to_string(),
            index: 2,
            total: 3,
            replacements: 1,
        });

        assert_eq!(
            changes,
            vec![StateChange::EntryProgress {
                entry: "sub/b.txt".to_string(),
                current: 2,
                total: 3
            }]
        );
    }

    #[test]
    fn test_reset_emits_state_reset() {
        let manager = StateManager::new();
        manager
            .select(CleanableFile::new("feed.txt").unwrap())
            .unwrap();

        let changes = manager.reset();

        assert_eq!(changes.last(), Some(&StateChange::StateReset));
        assert_eq!(manager.read(|s| s.phase.clone()), JobPhase::NoSelection);
    }
}

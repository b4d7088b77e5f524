//! Data models for the cleaner.
//!
//! - [`CleanableFile`]: The per-job descriptor (input, output, kind, replacement count)
//! - [`CleaningReport`]: What a finished job reports back to the caller
//! - [`AppState`] / [`JobPhase`]: Selection and job lifecycle, owned by [`StateManager`](crate::state::StateManager)
//! - [`CleanerConfig`]: User settings loaded from `Cleaner Settings.yaml`
//! - [`MAX_CONCURRENT_JOBS`]: Concurrency limit constant (always 1, the scratch directory is shared)

pub mod app_state;
pub mod cleanable_file;
pub mod config;

pub use app_state::{AppState, JobPhase, MAX_CONCURRENT_JOBS};
pub use cleanable_file::{CleanableFile, CleaningReport, EntryFailure, FileKind};
pub use config::{CleanerConfig, CleanerSettings, EntryFailurePolicy};

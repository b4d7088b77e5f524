//! Services module - the file-cleaning engine.
//!
//! Everything that reads, transforms or writes user files lives here. The
//! services are **framework-agnostic** and have no dependencies on the state
//! machine or the front end, so they can be driven directly from tests.
//!
//! # Components
//!
//! - [`path_policy`]: Classifies an input as text or zip and derives the default
//!   output path (`report.txt` → `report_cleaned.txt`). Pure string functions.
//!
//! - [`StreamCleaner`]: Streams one file into another, replacing every `"` with a
//!   space and counting replacements. Byte-for-byte identical otherwise.
//!
//! - [`ArchiveCleaner`]: Extracts a zip into a scratch directory, runs every entry
//!   through an [`EntryCleaner`], repackages the result and clears the scratch area.
//!
//! - [`CleanJob`]: Validates that the selected input still exists and dispatches
//!   to one of the two cleaners, producing a [`CleaningReport`](crate::models::CleaningReport).
//!
//! - [`CleanError`]: The error kinds every component raises. They propagate to the
//!   caller unchanged.
//!
//! # Usage Example
//!
//! ```ignore
//! use flcleaner::models::CleanableFile;
//! use flcleaner::services::CleanJob;
//!
//! let job = CleanJob::from_settings(&settings);
//! let mut file = CleanableFile::new("exports/feed.txt")?;
//! let report = job.run(&mut file, None)?;
//! println!("{}", report.summary());
//! ```
//!
//! All operations are synchronous and blocking; [`crate::controller`] moves them
//! onto tokio's blocking pool.

pub mod archive_cleaner;
pub mod clean_job;
pub mod error;
pub mod path_policy;
pub mod stream_cleaner;

pub use archive_cleaner::{ArchiveCleaner, ArchiveOutcome, EntryProgress};
pub use clean_job::CleanJob;
pub use error::{CleanError, ErrorKind};
pub use path_policy::{classify_and_derive_output, derive_output_path};
pub use stream_cleaner::{EntryCleaner, StreamCleaner, clean_stream};

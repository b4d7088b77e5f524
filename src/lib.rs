// flcleaner - Quote remover for fixed-length text files
//
// This is the library crate containing the cleaning engine, state and configuration.
// The binary crate (main.rs) provides the command line entry point.

pub mod config;
pub mod controller;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use controller::CleaningController;
pub use models::{
    AppState, CleanableFile, CleanerConfig, CleanerSettings, CleaningReport, EntryFailurePolicy,
    FileKind, JobPhase,
};
pub use services::{CleanError, CleanJob};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

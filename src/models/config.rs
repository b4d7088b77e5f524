use serde::{Deserialize, Serialize};

/// What the archive cleaner does when one entry cannot be cleaned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryFailurePolicy {
    /// Abort the whole archive on the first failing entry
    #[default]
    FailFast,
    /// Record the failure, leave the entry out of the output and continue
    SkipAndReport,
}

/// User configuration from Cleaner Settings.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanerConfig {
    #[serde(rename = "Cleaner_Settings", default)]
    pub cleaner_settings: CleanerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerSettings {
    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,

    #[serde(rename = "Log Directory", default = "default_log_directory")]
    pub log_directory: String,

    /// Empty means `<system temp>/<app name>`
    #[serde(rename = "Scratch Directory", default)]
    pub scratch_directory: String,

    #[serde(rename = "Remove Partial Output", default = "default_remove_partial_output")]
    pub remove_partial_output: bool,

    #[serde(rename = "Entry Failure Policy", default)]
    pub entry_failure_policy: EntryFailurePolicy,
}

impl Default for CleanerSettings {
    fn default() -> Self {
        Self {
            debug_mode: false,
            log_directory: default_log_directory(),
            scratch_directory: String::new(),
            remove_partial_output: true,
            entry_failure_policy: EntryFailurePolicy::FailFast,
        }
    }
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_remove_partial_output() -> bool {
    true
}

use super::archive_cleaner::{ArchiveCleaner, EntryProgress};
use super::error::CleanError;
use super::stream_cleaner::StreamCleaner;
use crate::metrics::Metrics;
use crate::models::{CleanableFile, CleanerSettings, CleaningReport, FileKind};
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Instant;

/// Top-level orchestrator for one cleaning job
///
/// Dispatches a [`CleanableFile`] to the stream or archive cleaner by kind
/// and turns the outcome into a [`CleaningReport`]. Errors from either
/// cleaner are logged and returned unchanged.
pub struct CleanJob {
    stream: StreamCleaner,
    archive: ArchiveCleaner,
    metrics: Option<Arc<Metrics>>,
}

impl CleanJob {
    pub fn new(stream: StreamCleaner, archive: ArchiveCleaner) -> Self {
        Self {
            stream,
            archive,
            metrics: None,
        }
    }

    /// Build a job from user settings
    ///
    /// An empty scratch directory setting means [`ArchiveCleaner::default_scratch_root`].
    pub fn from_settings(settings: &CleanerSettings) -> Self {
        let scratch_root = if settings.scratch_directory.trim().is_empty() {
            ArchiveCleaner::default_scratch_root()
        } else {
            Utf8PathBuf::from(settings.scratch_directory.trim())
        };

        Self::new(
            StreamCleaner::new(settings.remove_partial_output),
            ArchiveCleaner::new(
                scratch_root,
                settings.entry_failure_policy,
                settings.remove_partial_output,
            ),
        )
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn archive_cleaner(&self) -> &ArchiveCleaner {
        &self.archive
    }

    /// Run the job for `selected`, storing the total into its replacement count
    ///
    /// # Errors
    /// `InputVanished` if the input was deleted after selection; otherwise
    /// whatever the dispatched cleaner raised.
    pub fn run(
        &self,
        selected: &mut CleanableFile,
        progress: Option<&mut dyn FnMut(&EntryProgress)>,
    ) -> Result<CleaningReport, CleanError> {
        let start = Instant::now();

        let result = self.dispatch(selected, progress);

        match &result {
            Ok(report) => {
                tracing::info!(
                    "Cleaned {} {} -> {}: {} in {:.2}s",
                    report.kind,
                    selected.input_path,
                    report.output_path,
                    report.summary(),
                    report.duration.as_secs_f32()
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_job_completed(report.files_cleaned, report.total_replacements);
                    metrics.record_cleaning_time(start.elapsed());
                }
            }
            Err(e) => {
                tracing::error!("Cleaning {} failed: {}", selected.input_path, e);
                if let Some(metrics) = &self.metrics {
                    metrics.record_job_failed();
                }
            }
        }

        result
    }

    fn dispatch(
        &self,
        selected: &mut CleanableFile,
        progress: Option<&mut dyn FnMut(&EntryProgress)>,
    ) -> Result<CleaningReport, CleanError> {
        if !selected.input_path.exists() {
            return Err(CleanError::InputVanished(selected.input_path.clone()));
        }

        let start = Instant::now();
        let kind = selected.kind();

        let mut report = match kind {
            FileKind::Text => {
                let replaced = self
                    .stream
                    .clean(&selected.input_path, &selected.output_path)?;
                CleaningReport {
                    kind,
                    output_path: selected.output_path.clone(),
                    total_replacements: replaced,
                    files_cleaned: 1,
                    entries: IndexMap::new(),
                    failed_entries: Vec::new(),
                    duration: Default::default(),
                }
            }
            FileKind::Archive => {
                let outcome =
                    self.archive
                        .clean(&selected.input_path, &selected.output_path, progress)?;
                CleaningReport {
                    kind,
                    output_path: selected.output_path.clone(),
                    total_replacements: outcome.total_replacements,
                    files_cleaned: outcome.entries.len(),
                    entries: outcome.entries,
                    failed_entries: outcome.failed_entries,
                    duration: Default::default(),
                }
            }
        };

        selected.replacement_count = report.total_replacements;
        report.duration = start.elapsed();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryFailurePolicy;
    use std::fs;
    use tempfile::TempDir;

    fn job_in(dir: &TempDir) -> (CleanJob, Utf8PathBuf) {
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let job = CleanJob::new(
            StreamCleaner::default(),
            ArchiveCleaner::new(root.join("scratch"), EntryFailurePolicy::FailFast, true),
        );
        (job, root)
    }

    #[test]
    fn test_text_job_updates_count() {
        let dir = TempDir::new().unwrap();
        let (job, root) = job_in(&dir);
        let input = root.join("feed.txt");
        fs::write(&input, "\"1\",\"2\"").unwrap();
        let mut file = CleanableFile::new(input.as_str()).unwrap();

        let report = job.run(&mut file, None).unwrap();

        assert_eq!(report.total_replacements, 4);
        assert_eq!(file.replacement_count, 4);
        assert_eq!(report.files_cleaned, 1);
        assert!(report.entries.is_empty());
        assert_eq!(fs::read_to_string(root.join("feed_cleaned.txt")).unwrap(), " 1 , 2 ");
    }

    #[test]
    fn test_vanished_input() {
        let dir = TempDir::new().unwrap();
        let (job, root) = job_in(&dir);
        let mut file = CleanableFile::new(root.join("gone.txt").as_str()).unwrap();

        let err = job.run(&mut file, None).unwrap_err();

        assert!(matches!(err, CleanError::InputVanished(_)));
        assert!(!root.join("gone_cleaned.txt").exists());
    }

    #[test]
    fn test_metrics_recorded() {
        let dir = TempDir::new().unwrap();
        let (job, root) = job_in(&dir);
        let metrics = Arc::new(Metrics::new());
        let job = job.with_metrics(metrics.clone());

        let input = root.join("a.txt");
        fs::write(&input, "\"\"\"").unwrap();
        let mut ok = CleanableFile::new(input.as_str()).unwrap();
        let mut missing = CleanableFile::new(root.join("b.txt").as_str()).unwrap();

        job.run(&mut ok, None).unwrap();
        job.run(&mut missing, None).unwrap_err();

        assert_eq!(metrics.jobs_completed(), 1);
        assert_eq!(metrics.jobs_failed(), 1);
        assert_eq!(metrics.quotes_replaced(), 3);
    }

    #[test]
    fn test_from_settings_uses_configured_scratch() {
        let settings = CleanerSettings {
            scratch_directory: "/tmp/custom-scratch".to_string(),
            ..Default::default()
        };

        let job = CleanJob::from_settings(&settings);

        assert_eq!(job.archive_cleaner().scratch_root().as_str(), "/tmp/custom-scratch");
    }

    #[test]
    fn test_from_settings_default_scratch() {
        let job = CleanJob::from_settings(&CleanerSettings::default());
        assert!(job.archive_cleaner().scratch_root().ends_with(crate::APP_NAME));
    }
}

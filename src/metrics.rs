// Performance metrics module
//
// Provides lightweight counters for cleaning jobs

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide cleaning metrics
///
/// Uses atomic operations so the controller and the blocking worker running
/// a job can record without locks. Logged on shutdown by the binary.
#[derive(Debug)]
pub struct Metrics {
    /// Jobs that produced a report
    jobs_completed: AtomicUsize,

    /// Jobs that ended in an error
    jobs_failed: AtomicUsize,

    /// Files cleaned across all jobs (1 per text job, 1 per archive entry)
    files_cleaned: AtomicUsize,

    /// Quotes replaced across all jobs
    quotes_replaced: AtomicU64,

    /// Total cleaning time in milliseconds
    total_cleaning_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            jobs_completed: AtomicUsize::new(0),
            jobs_failed: AtomicUsize::new(0),
            files_cleaned: AtomicUsize::new(0),
            quotes_replaced: AtomicU64::new(0),
            total_cleaning_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished job and what it cleaned
    pub fn record_job_completed(&self, files: usize, replacements: u64) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
        self.files_cleaned.fetch_add(files, Ordering::Relaxed);
        self.quotes_replaced.fetch_add(replacements, Ordering::Relaxed);
    }

    pub fn record_job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cleaning_time(&self, duration: Duration) {
        self.total_cleaning_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn jobs_completed(&self) -> usize {
        self.jobs_completed.load(Ordering::Relaxed)
    }

    pub fn jobs_failed(&self) -> usize {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    pub fn files_cleaned(&self) -> usize {
        self.files_cleaned.load(Ordering::Relaxed)
    }

    pub fn quotes_replaced(&self) -> u64 {
        self.quotes_replaced.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average time per completed job in milliseconds
    pub fn avg_job_time_ms(&self) -> f64 {
        let total = self.total_cleaning_time_ms.load(Ordering::Relaxed);
        let count = self.jobs_completed();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Cleaning Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Jobs: {} completed, {} failed",
            self.jobs_completed(),
            self.jobs_failed()
        );
        tracing::info!(
            "Files cleaned: {}, quotes replaced: {}",
            self.files_cleaned(),
            self.quotes_replaced()
        );
        tracing::info!(
            "Total cleaning time: {:.2}s (avg: {:.2}ms per job)",
            self.total_cleaning_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_job_time_ms()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

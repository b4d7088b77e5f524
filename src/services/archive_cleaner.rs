use super::error::CleanError;
use super::stream_cleaner::{EntryCleaner, StreamCleaner, is_same_file};
use crate::models::{EntryFailure, EntryFailurePolicy};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs::{self, File};
use std::io;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Scratch subdirectory holding the extracted input archive
pub const ORIGINAL_DIR: &str = "original";

/// Scratch subdirectory holding the cleaned entries before repackaging
pub const CLEANED_DIR: &str = "cleaned";

/// Reported once per archive entry as it finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryProgress {
    /// Entry name relative to the archive root, `/`-separated
    pub entry: String,
    /// 1-based position of this entry
    pub index: usize,
    pub total: usize,
    pub replacements: u64,
}

/// Result of cleaning one archive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveOutcome {
    pub total_replacements: u64,
    pub entries: IndexMap<String, u64>,
    pub failed_entries: Vec<EntryFailure>,
}

/// Cleans every file inside a zip archive and repackages the result
///
/// Work is staged in two fixed subdirectories of `scratch_root`, which are
/// wiped at the start of every job. Because the location is shared, only one
/// archive job may run at a time (see [`crate::models::MAX_CONCURRENT_JOBS`]).
///
/// Phases, each with its own failure mode:
/// 1. Stage setup: clear `original/` and `cleaned/`, create `cleaned/`
/// 2. Extraction into `original/` (`ArchiveCorrupt` / `ArchiveUnreadable`)
/// 3. Per-entry cleaning into `cleaned/`, mirroring the directory tree
/// 4. Repackaging `cleaned/` into the output archive (replacing any existing file)
/// 5. Scratch cleanup, only after a successful repackage
pub struct ArchiveCleaner<C: EntryCleaner = StreamCleaner> {
    scratch_root: Utf8PathBuf,
    cleaner: C,
    policy: EntryFailurePolicy,
    remove_partial_output: bool,
}

impl ArchiveCleaner<StreamCleaner> {
    pub fn new(
        scratch_root: impl Into<Utf8PathBuf>,
        policy: EntryFailurePolicy,
        remove_partial_output: bool,
    ) -> Self {
        Self::with_cleaner(
            scratch_root,
            StreamCleaner::new(remove_partial_output),
            policy,
            remove_partial_output,
        )
    }

    /// `<system temp>/<app name>`, the process-wide default scratch root
    pub fn default_scratch_root() -> Utf8PathBuf {
        let temp = Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .unwrap_or_else(|path| Utf8PathBuf::from(path.to_string_lossy().into_owned()));
        temp.join(crate::APP_NAME)
    }
}

impl<C: EntryCleaner> ArchiveCleaner<C> {
    pub fn with_cleaner(
        scratch_root: impl Into<Utf8PathBuf>,
        cleaner: C,
        policy: EntryFailurePolicy,
        remove_partial_output: bool,
    ) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            cleaner,
            policy,
            remove_partial_output,
        }
    }

    pub fn scratch_root(&self) -> &Utf8Path {
        &self.scratch_root
    }

    pub fn original_dir(&self) -> Utf8PathBuf {
        self.scratch_root.join(ORIGINAL_DIR)
    }

    pub fn cleaned_dir(&self) -> Utf8PathBuf {
        self.scratch_root.join(CLEANED_DIR)
    }

    /// Clean `archive` into a new archive at `output`
    ///
    /// `progress` is called once per file entry, after it has been cleaned
    /// (or has failed under the skip-and-report policy).
    pub fn clean(
        &self,
        archive: &Utf8Path,
        output: &Utf8Path,
        progress: Option<&mut dyn FnMut(&EntryProgress)>,
    ) -> Result<ArchiveOutcome, CleanError> {
        if is_same_file(archive, output) {
            return Err(CleanError::InvalidArgument(format!(
                "output archive {output} refers to the input archive {archive}"
            )));
        }

        tracing::info!("Cleaning archive {} -> {}", archive, output);

        self.prepare_scratch()?;

        let extracted = self.extract(archive)?;
        tracing::debug!("Extracted {} entries to {}", extracted, self.original_dir());

        let outcome = self.clean_entries(progress)?;

        let written = self.repackage(output)?;
        tracing::debug!("Wrote {} entries to {}", written, output);

        self.clear_scratch();

        tracing::info!(
            "Archive {} cleaned: {} quote(s) across {} entries, {} failed",
            archive,
            outcome.total_replacements,
            outcome.entries.len(),
            outcome.failed_entries.len()
        );

        Ok(outcome)
    }

    /// Remove leftovers from a previous run so stale entries cannot leak into this one
    fn prepare_scratch(&self) -> Result<(), CleanError> {
        let original = self.original_dir();
        let cleaned = self.cleaned_dir();

        for dir in [&original, &cleaned] {
            if dir.exists() {
                fs::remove_dir_all(dir).map_err(|e| CleanError::io(dir.as_path(), e))?;
                tracing::debug!("Cleared stale scratch directory: {}", dir);
            }
        }

        fs::create_dir_all(&cleaned).map_err(|e| CleanError::io(cleaned.as_path(), e))?;
        Ok(())
    }

    fn extract(&self, archive_path: &Utf8Path) -> Result<usize, CleanError> {
        let file = File::open(archive_path).map_err(|source| CleanError::ArchiveUnreadable {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let mut archive = ZipArchive::new(file).map_err(|e| zip_read_error(archive_path, e))?;

        let destination = self.original_dir();
        fs::create_dir_all(&destination).map_err(|e| CleanError::io(destination.as_path(), e))?;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| zip_read_error(archive_path, e))?;

            let relative = entry
                .enclosed_name()
                .and_then(|name| Utf8PathBuf::from_path_buf(name).ok())
                .ok_or_else(|| CleanError::ArchiveCorrupt {
                    path: archive_path.to_path_buf(),
                    reason: format!("entry {:?} has an unsafe or non UTF-8 name", entry.name()),
                })?;
            let target = destination.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|e| CleanError::io(target.as_path(), e))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| CleanError::io(parent, e))?;
            }

            let mut out = File::create(&target).map_err(|e| CleanError::io(target.as_path(), e))?;
            io::copy(&mut entry, &mut out).map_err(|e| {
                // Decompression and checksum problems surface as InvalidData
                if e.kind() == io::ErrorKind::InvalidData {
                    CleanError::ArchiveCorrupt {
                        path: archive_path.to_path_buf(),
                        reason: format!("entry {relative}: {e}"),
                    }
                } else {
                    CleanError::ArchiveUnreadable {
                        path: archive_path.to_path_buf(),
                        source: e,
                    }
                }
            })?;
        }

        Ok(archive.len())
    }

    fn clean_entries(
        &self,
        mut progress: Option<&mut dyn FnMut(&EntryProgress)>,
    ) -> Result<ArchiveOutcome, CleanError> {
        let original = self.original_dir();
        let cleaned = self.cleaned_dir();

        let mut files = Vec::new();
        for (relative, is_dir) in walk_relative(&original)? {
            if is_dir {
                let mirrored = cleaned.join(&relative);
                fs::create_dir_all(&mirrored).map_err(|e| CleanError::io(mirrored.as_path(), e))?;
            } else {
                files.push(relative);
            }
        }

        let total = files.len();
        let mut outcome = ArchiveOutcome::default();

        for (index, relative) in files.iter().enumerate() {
            let name = entry_name(relative);
            let replacements = match self
                .cleaner
                .clean(&original.join(relative), &cleaned.join(relative))
            {
                Ok(count) => {
                    tracing::debug!("Entry {} ({}/{}): {} quote(s)", name, index + 1, total, count);
                    outcome.total_replacements += count;
                    outcome.entries.insert(name.clone(), count);
                    count
                }
                Err(e) => match self.policy {
                    EntryFailurePolicy::FailFast => {
                        tracing::error!("Entry {} failed, aborting archive: {}", name, e);
                        return Err(e);
                    }
                    EntryFailurePolicy::SkipAndReport => {
                        tracing::warn!("Entry {} failed, skipping: {}", name, e);
                        // A skipped entry must not be repackaged, whatever the cleaner left behind
                        discard_skipped_entry(&cleaned.join(relative));
                        outcome.failed_entries.push(EntryFailure {
                            entry: name.clone(),
                            error: e.to_string(),
                        });
                        0
                    }
                },
            };

            if let Some(report) = progress.as_deref_mut() {
                report(&EntryProgress {
                    entry: name,
                    index: index + 1,
                    total,
                    replacements,
                });
            }
        }

        Ok(outcome)
    }

    fn repackage(&self, output: &Utf8Path) -> Result<usize, CleanError> {
        if output.exists() {
            fs::remove_file(output).map_err(|source| CleanError::OutputUnwritable {
                path: output.to_path_buf(),
                source,
            })?;
            tracing::debug!("Removed existing output archive: {}", output);
        }

        let file = File::create(output).map_err(|source| CleanError::OutputUnwritable {
            path: output.to_path_buf(),
            source,
        })?;

        let result = self.write_archive(file, output);

        if result.is_err() && self.remove_partial_output {
            if let Err(e) = fs::remove_file(output) {
                tracing::warn!("Failed to remove partial archive {}: {}", output, e);
            }
        }

        result
    }

    fn write_archive(&self, file: File, output: &Utf8Path) -> Result<usize, CleanError> {
        let cleaned = self.cleaned_dir();
        let mut writer = ZipWriter::new(file);
        let mut written = 0;

        for (relative, is_dir) in walk_relative(&cleaned)? {
            let name = entry_name(&relative);
            let source_path = cleaned.join(&relative);

            if is_dir {
                // Only empty directories need their own entry; others are implied by file names
                if is_empty_dir(&source_path)? {
                    writer
                        .add_directory(format!("{name}/"), entry_options())
                        .map_err(|e| zip_write_error(output, e))?;
                    written += 1;
                }
                continue;
            }

            writer
                .start_file(name, entry_options())
                .map_err(|e| zip_write_error(output, e))?;
            let mut source =
                File::open(&source_path).map_err(|e| CleanError::io(source_path.as_path(), e))?;
            io::copy(&mut source, &mut writer).map_err(|e| CleanError::io(output, e))?;
            written += 1;
        }

        writer.finish().map_err(|e| zip_write_error(output, e))?;
        Ok(written)
    }

    /// Delete both scratch subdirectories after a successful job
    fn clear_scratch(&self) {
        for dir in [self.original_dir(), self.cleaned_dir()] {
            if let Err(e) = fs::remove_dir_all(&dir) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove scratch directory {}: {}", dir, e);
                }
            }
        }
    }
}

fn discard_skipped_entry(path: &Utf8Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove skipped entry {}: {}", path, e);
        }
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Every path under `root` (excluding `root`), relative to it, in sorted order
fn walk_relative(root: &Utf8Path) -> Result<Vec<(Utf8PathBuf, bool)>, CleanError> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| CleanError::io(root, e.into()))?;
        let path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
            CleanError::io(
                root,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 path: {}", entry.path().display()),
                ),
            )
        })?;
        let relative = path
            .strip_prefix(root)
            .map_err(|e| CleanError::io(path, io::Error::other(e)))?;

        paths.push((relative.to_path_buf(), entry.file_type().is_dir()));
    }

    Ok(paths)
}

fn is_empty_dir(dir: &Utf8Path) -> Result<bool, CleanError> {
    let mut entries = fs::read_dir(dir).map_err(|e| CleanError::io(dir, e))?;
    Ok(entries.next().is_none())
}

/// Zip entry name for a relative path: components joined with `/`
fn entry_name(relative: &Utf8Path) -> String {
    relative
        .components()
        .map(|component| component.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

fn zip_read_error(path: &Utf8Path, error: ZipError) -> CleanError {
    match error {
        ZipError::Io(source) => CleanError::ArchiveUnreadable {
            path: path.to_path_buf(),
            source,
        },
        other => CleanError::ArchiveCorrupt {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

fn zip_write_error(path: &Utf8Path, error: ZipError) -> CleanError {
    match error {
        ZipError::Io(source) => CleanError::io(path, source),
        other => CleanError::io(path, io::Error::other(other)),
    }
}

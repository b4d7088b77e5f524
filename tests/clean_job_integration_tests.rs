//! Integration tests for complete cleaning jobs
//!
//! These tests drive CleanJob through the public API the way a front end does:
//! - Text files cleaned next to the input
//! - Zip archives rebuilt entry by entry with progress callbacks
//! - Failure modes leave no stray output behind

use camino::{Utf8Path, Utf8PathBuf};
use flcleaner::models::{CleanableFile, EntryFailurePolicy, FileKind};
use flcleaner::services::{ArchiveCleaner, CleanError, CleanJob, EntryProgress, StreamCleaner};
use std::fs::{self, File};
use std::io::{Read, Write};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

struct Workspace {
    _temp_dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    fn scratch(&self) -> Utf8PathBuf {
        self.root.join("scratch")
    }

    fn job(&self, policy: EntryFailurePolicy) -> CleanJob {
        CleanJob::new(
            StreamCleaner::default(),
            ArchiveCleaner::new(self.scratch(), policy, true),
        )
    }
}

fn write_zip(path: &Utf8Path, entries: &[(&str, &str)]) {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

fn read_zip(path: &Utf8Path) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        entries.push((entry.name().to_string(), content));
    }
    entries.sort();
    entries
}

#[test]
fn test_text_file_cleaned_next_to_input() {
    let ws = Workspace::new();
    let input = ws.root.join("notes.txt");
    fs::write(&input, "ID=\"7\" NAME=\"x\"\n").unwrap();

    let mut file = CleanableFile::new(input.as_str()).unwrap();
    assert_eq!(file.kind(), FileKind::Text);
    assert_eq!(file.output_path, ws.root.join("notes_cleaned.txt"));

    let report = ws.job(EntryFailurePolicy::FailFast).run(&mut file, None).unwrap();

    assert_eq!(report.total_replacements, 4);
    assert_eq!(file.replacement_count, 4);
    assert_eq!(
        fs::read_to_string(ws.root.join("notes_cleaned.txt")).unwrap(),
        "ID= 7  NAME= x \n"
    );
    // Input untouched
    assert_eq!(fs::read_to_string(&input).unwrap(), "ID=\"7\" NAME=\"x\"\n");
}

#[test]
fn test_length_preserved_for_fixed_width_records() {
    let ws = Workspace::new();
    let input = ws.root.join("records.dat");
    let records = "\"AB\"  12\n\"CD\"  34\n\"EF\"  56\n";
    fs::write(&input, records).unwrap();

    let mut file = CleanableFile::new(input.as_str()).unwrap();
    ws.job(EntryFailurePolicy::FailFast).run(&mut file, None).unwrap();

    let cleaned = fs::read(ws.root.join("records_cleaned.dat")).unwrap();
    assert_eq!(cleaned.len(), records.len());
    assert!(!cleaned.contains(&b'"'));
}

#[test]
fn test_archive_with_nested_entries() {
    let ws = Workspace::new();
    let input = ws.root.join("batch.zip");
    write_zip(
        &input,
        &[("a.txt", "\"one\""), ("sub/b.txt", "no quotes"), ("sub/c.txt", "\"")],
    );

    let mut file = CleanableFile::new(input.as_str()).unwrap();
    assert_eq!(file.kind(), FileKind::Archive);

    let mut seen: Vec<EntryProgress> = Vec::new();
    let mut on_progress = |p: &EntryProgress| seen.push(p.clone());
    let report = ws
        .job(EntryFailurePolicy::FailFast)
        .run(&mut file, Some(&mut on_progress))
        .unwrap();

    assert_eq!(report.total_replacements, 3);
    assert_eq!(report.files_cleaned, 3);
    assert_eq!(report.entries.get("a.txt"), Some(&2));
    assert_eq!(report.entries.get("sub/b.txt"), Some(&0));
    assert_eq!(report.entries.get("sub/c.txt"), Some(&1));

    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|p| p.total == 3));
    assert_eq!(seen.last().unwrap().index, 3);

    assert_eq!(
        read_zip(&ws.root.join("batch_cleaned.zip")),
        vec![
            ("a.txt".to_string(), " one ".to_string()),
            ("sub/b.txt".to_string(), "no quotes".to_string()),
            ("sub/c.txt".to_string(), " ".to_string()),
        ]
    );
}

#[test]
fn test_scratch_emptied_after_archive_job() {
    let ws = Workspace::new();
    let input = ws.root.join("one.zip");
    write_zip(&input, &[("notes.txt", "\"a\"")]);

    let mut file = CleanableFile::new(input.as_str()).unwrap();
    let job = ws.job(EntryFailurePolicy::FailFast);
    job.run(&mut file, None).unwrap();

    let archive_cleaner = job.archive_cleaner();
    assert!(!archive_cleaner.original_dir().exists());
    let cleaned_dir = archive_cleaner.cleaned_dir();
    assert!(!cleaned_dir.exists() || fs::read_dir(&cleaned_dir).unwrap().next().is_none());
}

#[test]
fn test_second_archive_does_not_inherit_entries() {
    let ws = Workspace::new();
    let first = ws.root.join("first.zip");
    let second = ws.root.join("second.zip");
    write_zip(&first, &[("old.txt", "\"")]);
    write_zip(&second, &[("new.txt", "\"")]);

    let job = ws.job(EntryFailurePolicy::FailFast);
    job.run(&mut CleanableFile::new(first.as_str()).unwrap(), None)
        .unwrap();
    let report = job
        .run(&mut CleanableFile::new(second.as_str()).unwrap(), None)
        .unwrap();

    assert_eq!(report.entries.len(), 1);
    let names: Vec<String> = read_zip(&ws.root.join("second_cleaned.zip"))
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["new.txt".to_string()]);
}

#[test]
fn test_missing_input_fails_without_output() {
    let ws = Workspace::new();
    let input = ws.root.join("gone.txt");
    fs::write(&input, "x").unwrap();
    let mut file = CleanableFile::new(input.as_str()).unwrap();
    fs::remove_file(&input).unwrap();

    let err = ws
        .job(EntryFailurePolicy::FailFast)
        .run(&mut file, None)
        .unwrap_err();

    assert!(err.is_missing_input());
    assert!(!ws.root.join("gone_cleaned.txt").exists());
}

#[test]
fn test_corrupt_archive_reported() {
    let ws = Workspace::new();
    let input = ws.root.join("broken.zip");
    fs::write(&input, "this is not a zip archive\n".repeat(32)).unwrap();

    let mut file = CleanableFile::new(input.as_str()).unwrap();
    let err = ws
        .job(EntryFailurePolicy::FailFast)
        .run(&mut file, None)
        .unwrap_err();

    assert!(matches!(err, CleanError::ArchiveCorrupt { .. }));
    assert!(!ws.root.join("broken_cleaned.zip").exists());
}

#[test]
fn test_unwritable_output_location() {
    let ws = Workspace::new();
    let input = ws.root.join("notes.txt");
    fs::write(&input, "\"").unwrap();

    let mut file =
        CleanableFile::with_output(input.as_str(), ws.root.join("no/such/dir/out.txt")).unwrap();
    let err = ws
        .job(EntryFailurePolicy::FailFast)
        .run(&mut file, None)
        .unwrap_err();

    assert!(matches!(err, CleanError::OutputUnwritable { .. }));
}

#[test]
fn test_job_on_blocking_pool() {
    let ws = Workspace::new();
    let input = ws.root.join("notes.txt");
    fs::write(&input, "\"q\"").unwrap();
    let job = std::sync::Arc::new(ws.job(EntryFailurePolicy::FailFast));

    let report = tokio_test::block_on(async move {
        tokio::task::spawn_blocking(move || {
            let mut file = CleanableFile::new(input.as_str()).unwrap();
            job.run(&mut file, None)
        })
        .await
        .unwrap()
    })
    .unwrap();

    assert_eq!(report.total_replacements, 2);
}

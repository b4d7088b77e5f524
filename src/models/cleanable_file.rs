use crate::services::error::CleanError;
use crate::services::path_policy;
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use std::fmt;
use std::time::Duration;

/// Kind of input, decided once from the path string at selection time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Text,
    Archive,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Text => write!(f, "text file"),
            FileKind::Archive => write!(f, "zip archive"),
        }
    }
}

/// Per-job descriptor of the file the user selected
///
/// Created on selection, mutated only by the cleaning job, dropped when the
/// job finishes or the selection is reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanableFile {
    pub input_path: Utf8PathBuf,
    pub output_path: Utf8PathBuf,
    kind: FileKind,
    pub replacement_count: u64,
}

impl CleanableFile {
    /// Build a descriptor with the default output path for `input`
    pub fn new(input: impl AsRef<str>) -> Result<Self, CleanError> {
        let input = input.as_ref();
        let (kind, output_path) = path_policy::classify_and_derive_output(input)?;

        Ok(Self {
            input_path: Utf8PathBuf::from(input),
            output_path,
            kind,
            replacement_count: 0,
        })
    }

    /// Build a descriptor with an explicit output path
    ///
    /// The kind still comes from the input path.
    pub fn with_output(
        input: impl AsRef<str>,
        output: impl Into<Utf8PathBuf>,
    ) -> Result<Self, CleanError> {
        let mut file = Self::new(input)?;
        file.output_path = output.into();
        Ok(file)
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }
}

/// An archive entry that could not be cleaned (skip-and-report policy only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub entry: String,
    pub error: String,
}

/// Result of a completed cleaning job
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningReport {
    pub kind: FileKind,
    pub output_path: Utf8PathBuf,
    pub total_replacements: u64,
    pub files_cleaned: usize,
    /// Per-entry replacement counts in archive order; empty for text jobs
    pub entries: IndexMap<String, u64>,
    pub failed_entries: Vec<EntryFailure>,
    pub duration: Duration,
}

impl CleaningReport {
    pub fn has_failures(&self) -> bool {
        !self.failed_entries.is_empty()
    }

    /// Human-readable count, e.g. "1 quote replaced" or "4 quotes replaced"
    pub fn summary(&self) -> String {
        let noun = if self.total_replacements == 1 {
            "quote"
        } else {
            "quotes"
        };
        let mut summary = format!("{} {} replaced", self.total_replacements, noun);

        if self.has_failures() {
            summary.push_str(&format!(
                " ({} entr{} failed)",
                self.failed_entries.len(),
                if self.failed_entries.len() == 1 { "y" } else { "ies" }
            ));
        }

        summary
    }
}

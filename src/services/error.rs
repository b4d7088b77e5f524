use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// Errors that can occur while cleaning a file or archive
///
/// Every component raises the most specific variant it can; the job
/// orchestrator and controller forward them unchanged.
#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Input file {path} not found or unreadable: {source}")]
    InputNotFound {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Input file {0} no longer exists")]
    InputVanished(Utf8PathBuf),

    #[error("Cannot write output {path}: {source}")]
    OutputUnwritable {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Archive {path} is corrupt: {reason}")]
    ArchiveCorrupt { path: Utf8PathBuf, reason: String },

    #[error("Archive {path} could not be read: {source}")]
    ArchiveUnreadable {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("A cleaning job is already in progress")]
    JobInProgress,
}

/// Fieldless discriminant of [`CleanError`], for matching and display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    InputNotFound,
    InputVanished,
    OutputUnwritable,
    IoFailure,
    ArchiveCorrupt,
    ArchiveUnreadable,
    JobInProgress,
}

impl CleanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InputNotFound { .. } => ErrorKind::InputNotFound,
            Self::InputVanished(_) => ErrorKind::InputVanished,
            Self::OutputUnwritable { .. } => ErrorKind::OutputUnwritable,
            Self::IoFailure { .. } => ErrorKind::IoFailure,
            Self::ArchiveCorrupt { .. } => ErrorKind::ArchiveCorrupt,
            Self::ArchiveUnreadable { .. } => ErrorKind::ArchiveUnreadable,
            Self::JobInProgress => ErrorKind::JobInProgress,
        }
    }

    /// True when the selected input is gone and the caller should reset its selection
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::InputNotFound { .. } | Self::InputVanished(_))
    }

    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::IoFailure {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = CleanError::InputVanished("gone.txt".into());
        assert_eq!(err.kind(), ErrorKind::InputVanished);
        assert!(err.is_missing_input());

        let err = CleanError::io("x.txt", io::Error::other("disk on fire"));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(!err.is_missing_input());
    }

    #[test]
    fn test_display_names_path() {
        let err = CleanError::ArchiveCorrupt {
            path: "bundle.zip".into(),
            reason: "invalid Zip archive".to_string(),
        };
        assert!(err.to_string().contains("bundle.zip"));
        assert!(err.to_string().contains("corrupt"));
    }
}

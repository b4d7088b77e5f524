use super::error::CleanError;
use camino::Utf8Path;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// Byte replaced by the cleaner (`"`)
pub const QUOTE: u8 = b'"';

/// Byte written in place of every [`QUOTE`]
pub const REPLACEMENT: u8 = b' ';

/// Size of the buffer each read fills; input is never split on lines
const CHUNK_SIZE: usize = 8 * 1024;

/// Something that can clean one file into another and count replacements
///
/// [`StreamCleaner`] is the production implementation; the archive cleaner
/// runs every extracted entry through this trait.
#[cfg_attr(test, mockall::automock)]
pub trait EntryCleaner: Send + Sync {
    fn clean(&self, input: &Utf8Path, output: &Utf8Path) -> Result<u64, CleanError>;
}

/// Which side of a copy failed
enum StreamFault {
    Read(io::Error),
    Write(io::Error),
}

/// Streams a file through the quote-to-space substitution
///
/// Content is treated as raw bytes. UTF-8 never uses 0x22 inside a multi-byte
/// sequence, so byte-wise substitution is also correct for UTF-8 text.
/// Output length always equals input length.
#[derive(Debug, Clone)]
pub struct StreamCleaner {
    /// Delete the destination when the copy fails part-way through
    remove_partial_output: bool,
}

impl StreamCleaner {
    pub fn new(remove_partial_output: bool) -> Self {
        Self {
            remove_partial_output,
        }
    }

    /// Clean `input` into `output`, returning the number of quotes replaced
    ///
    /// The output is created or truncated. Both files are closed on every
    /// exit path.
    ///
    /// # Errors
    /// - `InvalidArgument` if input and output are the same path or input is not a file
    /// - `InputNotFound` if the input cannot be opened
    /// - `OutputUnwritable` if the output cannot be created
    /// - `IoFailure` if a read or write fails mid-stream
    pub fn clean(&self, input: &Utf8Path, output: &Utf8Path) -> Result<u64, CleanError> {
        if is_same_file(input, output) {
            return Err(CleanError::InvalidArgument(format!(
                "output {output} refers to the input file {input}"
            )));
        }

        let reader = File::open(input).map_err(|source| CleanError::InputNotFound {
            path: input.to_path_buf(),
            source,
        })?;

        let metadata = reader.metadata().map_err(|e| CleanError::io(input, e))?;
        if !metadata.is_file() {
            return Err(CleanError::InvalidArgument(format!(
                "{input} is not a regular file"
            )));
        }

        let writer = File::create(output).map_err(|source| CleanError::OutputUnwritable {
            path: output.to_path_buf(),
            source,
        })?;

        // Both handles are moved in and dropped before any cleanup below
        match transfer(reader, writer) {
            Ok(replaced) => {
                tracing::debug!("Cleaned {} -> {}: {} quote(s)", input, output, replaced);
                Ok(replaced)
            }
            Err(fault) => {
                self.discard_partial_output(output);
                Err(match fault {
                    StreamFault::Read(e) => CleanError::io(input, e),
                    StreamFault::Write(e) => CleanError::io(output, e),
                })
            }
        }
    }

    fn discard_partial_output(&self, output: &Utf8Path) {
        if !self.remove_partial_output {
            tracing::warn!("Leaving partial output in place: {}", output);
            return;
        }

        if let Err(e) = fs::remove_file(output) {
            tracing::warn!("Failed to remove partial output {}: {}", output, e);
        } else {
            tracing::debug!("Removed partial output: {}", output);
        }
    }
}

impl Default for StreamCleaner {
    fn default() -> Self {
        Self::new(true)
    }
}

impl EntryCleaner for StreamCleaner {
    fn clean(&self, input: &Utf8Path, output: &Utf8Path) -> Result<u64, CleanError> {
        StreamCleaner::clean(self, input, output)
    }
}

/// True when `output` names the same file as `input`, however either is spelled
///
/// `..` components, relative paths and symlinks are resolved. An output that
/// does not exist yet is resolved through its parent directory.
pub fn is_same_file(input: &Utf8Path, output: &Utf8Path) -> bool {
    if input == output {
        return true;
    }
    let Ok(input) = input.canonicalize() else {
        return false;
    };
    resolve_output(output).is_some_and(|output| output == input)
}

fn resolve_output(output: &Utf8Path) -> Option<PathBuf> {
    if let Ok(resolved) = output.canonicalize() {
        return Some(resolved);
    }
    let file_name = output.file_name()?;
    let parent = match output.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    parent.canonicalize().ok().map(|parent| parent.join(file_name))
}

/// Clean an arbitrary reader into an arbitrary writer
///
/// Returns the number of quotes replaced. The writer is flushed before returning.
pub fn clean_stream<R: Read, W: Write>(reader: R, writer: W) -> io::Result<u64> {
    transfer(reader, writer).map_err(|fault| match fault {
        StreamFault::Read(e) | StreamFault::Write(e) => e,
    })
}

/// Replace every quote in `chunk` in place and return how many were replaced
pub fn substitute(chunk: &mut [u8]) -> u64 {
    let mut replaced = 0;
    for byte in chunk.iter_mut().filter(|b| **b == QUOTE) {
        *byte = REPLACEMENT;
        replaced += 1;
    }
    replaced
}

fn transfer<R: Read, W: Write>(mut reader: R, mut writer: W) -> Result<u64, StreamFault> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut replaced = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamFault::Read(e)),
        };

        replaced += substitute(&mut buf[..n]);
        writer.write_all(&buf[..n]).map_err(StreamFault::Write)?;
    }

    writer.flush().map_err(StreamFault::Write)?;
    Ok(replaced)
}

//! Append-only record of identifiers that could not be remediated.
//!
//! The file format is two lines per failure: the identifier, then the
//! error detail. Entries are written in the order failures happen and are
//! never read back or rewritten.

use crate::error::{FailureKind, RemediationError};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_FAILURE_LOG: &str = "FailedAccountChanges.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub identifier: String,
    pub kind: FailureKind,
    pub detail: String,
}

impl FailureEntry {
    pub fn new(identifier: &str, error: &RemediationError) -> Self {
        Self {
            identifier: identifier.to_string(),
            kind: error.kind(),
            detail: error.to_string(),
        }
    }
}

#[derive(Debug, Error)]
#[error("Failed to write failure log {path}: {source}")]
pub struct FailureLogError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

pub trait FailureLog {
    fn append(&mut self, entry: &FailureEntry) -> Result<(), FailureLogError>;
}

impl<L: FailureLog + ?Sized> FailureLog for &mut L {
    fn append(&mut self, entry: &FailureEntry) -> Result<(), FailureLogError> {
        (**self).append(entry)
    }
}

/// Failure log backed by a text file opened in append mode.
#[derive(Debug)]
pub struct FileFailureLog {
    path: PathBuf,
    file: File,
}

impl FileFailureLog {
    /// Open `path` for appending, creating it if needed. Existing content is kept.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FailureLogError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| FailureLogError {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FailureLog for FileFailureLog {
    fn append(&mut self, entry: &FailureEntry) -> Result<(), FailureLogError> {
        let record = format!(
            "{}\n{}\n",
            single_line(&entry.identifier),
            single_line(&entry.detail)
        );
        self.file
            .write_all(record.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| FailureLogError {
                path: self.path.clone(),
                source,
            })
    }
}

/// In-memory failure log.
#[derive(Debug, Default)]
pub struct MemoryFailureLog {
    entries: Vec<FailureEntry>,
}

impl MemoryFailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[FailureEntry] {
        &self.entries
    }
}

impl FailureLog for MemoryFailureLog {
    fn append(&mut self, entry: &FailureEntry) -> Result<(), FailureLogError> {
        self.entries.push(entry.clone());
        Ok(())
    }
}

// Keeps each record at exactly two lines.
fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

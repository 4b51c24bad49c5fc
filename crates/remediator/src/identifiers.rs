use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to read user list {path}: {source}")]
pub struct IdentifierListError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// How the run was invoked. Both modes feed the same ordered identifier sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Single(String),
    Multi(Vec<String>),
}

impl Mode {
    pub fn identifiers(&self) -> &[String] {
        match self {
            Mode::Single(identifier) => std::slice::from_ref(identifier),
            Mode::Multi(identifiers) => identifiers,
        }
    }
}

/// Read a user list: one identifier per line, blank lines skipped, order kept.
pub fn load_identifiers(path: impl AsRef<Path>) -> Result<Vec<String>, IdentifierListError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| IdentifierListError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_identifiers(&content))
}

pub fn parse_identifiers(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim_start_matches('\u{feff}').trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ABOUTME: Error types for state file loading, parsing, and writing.
// ABOUTME: Parse errors carry the line number of the offending record.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("invalid state key: {0:?}")]
    InvalidKey(String),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

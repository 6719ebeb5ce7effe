//! Centralized error types for mailindex.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that cross the public boundary of the library.
///
/// Malformed messages are not represented here: they are contained inside
/// ingestion (see [`crate::parser::header::ParseError`]) and only counted.
#[derive(Error, Debug)]
pub enum MailIndexError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The corpus root directory does not exist.
    #[error("Corpus root not found: {0}")]
    RootNotFound(PathBuf),

    /// A caller passed an argument outside its accepted range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The address has never been indexed.
    #[error("Address not found in index: {0}")]
    NotFound(String),

    /// A cutoff time given on the command line could not be understood.
    #[error("Invalid cutoff time '{0}'")]
    InvalidCutoff(String),
}

/// Convenience alias for `Result<T, MailIndexError>`.
pub type Result<T> = std::result::Result<T, MailIndexError>;

impl MailIndexError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

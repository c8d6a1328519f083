//! Error types for the index crate.

use std::io;
use std::path::PathBuf;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A stat, read or write on a tracked path failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory traversal failed while discovering paths.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The tree root is missing or is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A path could not be expressed as a relative, slash-separated name.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A promise string is not in the five-character `VAUDN` form.
    #[error("invalid promise: {0:?}")]
    InvalidPromise(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A snapshot worker terminated before the build completed.
    #[error("snapshot worker terminated unexpectedly")]
    Interrupted,
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the error reports a path that no longer exists.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            Self::Walk(err) => err
                .io_error()
                .is_some_and(|e| e.kind() == io::ErrorKind::NotFound),
            _ => false,
        }
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;

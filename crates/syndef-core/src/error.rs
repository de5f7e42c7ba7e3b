//! Error types for synthdef loading, diffing and export.

use std::path::PathBuf;
use thiserror::Error;

use crate::differ::DiffError;
use crate::graph::GraphError;
use crate::synthdef::LoadError;

/// Errors surfaced by the file-level API of this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    Io {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output
    #[error("failed to write output: {0}")]
    Write(#[source] std::io::Error),

    /// The file is not a valid SCgf synthdef
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The ugen graph is malformed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The structural walk could not complete
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// JSON serialization failed
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Write(source)
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    #[test]
    fn read_file_display() {
        let err = Error::read_file("/a/b.scsyndef", mock_io_err());
        let msg = err.to_string();
        assert!(msg.contains("failed to read file"), "got: {msg}");
        assert!(msg.contains("/a/b.scsyndef"), "got: {msg}");
        assert!(err.source().is_some());
    }

    #[test]
    fn load_errors_display_transparently() {
        let err = Error::from(LoadError::NoDefinitions);
        assert_eq!(err.to_string(), "file contains no synthdefs");
    }

    #[test]
    fn cycle_error_converts() {
        let err = Error::from(DiffError::Cycle { left: 1, right: 2 });
        assert!(matches!(err, Error::Diff(_)));
        assert!(err.to_string().contains("cyclic"), "got: {err}");
    }

    #[test]
    fn bare_io_error_is_a_write_error() {
        let err = Error::from(mock_io_err());
        assert!(matches!(err, Error::Write(_)));
    }
}

//! Error types for artifact persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing local artifacts.
///
/// These are the only errors that end a run: without a writable output
/// directory there is nowhere to put results.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File system error.
    #[error("IO error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The structured record artifact could not be encoded or decoded.
    #[error("invalid record artifact {path}: {source}")]
    Json {
        /// Artifact path.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The structured record artifact does not exist yet.
    #[error("record artifact {path} not found; run the collect stage first")]
    MissingArtifact {
        /// Expected artifact path.
        path: PathBuf,
    },
}

impl StoreError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a JSON error.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

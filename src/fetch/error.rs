//! Error types for the fetch layer.
//!
//! [`FetchError`] describes why one attempt failed; [`FetchFailure`] is the
//! terminal result once every attempt for a unit of work has been used up.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a single fetch or download attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// A configured header value is not a legal HTTP header value.
    #[error("invalid value for header {name}")]
    InvalidHeader {
        /// Header name.
        name: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// File system error while writing a download.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The body was written but the file is empty.
    #[error("downloaded file {path} is empty")]
    EmptyArtifact {
        /// Path of the deleted empty file.
        path: PathBuf,
    },

    /// A resumed download does not match the size the server declared.
    #[error(
        "integrity check failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    Integrity {
        /// Download path that failed verification.
        path: PathBuf,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an empty-artifact error.
    pub fn empty_artifact(path: impl Into<PathBuf>) -> Self {
        Self::EmptyArtifact { path: path.into() }
    }

    /// Creates an integrity mismatch error.
    pub fn integrity(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Integrity {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path, which the source errors don't carry.

/// Terminal failure of one unit of work after all attempts were used.
#[derive(Debug, Error)]
#[error("giving up on {target} after {attempts} attempt(s): {last_error}")]
pub struct FetchFailure {
    /// URL (or other label) of the unit of work.
    pub target: String,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Error from the final attempt.
    #[source]
    pub last_error: FetchError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let error = FetchError::timeout("https://example.com/search");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/search"));
    }

    #[test]
    fn test_http_status_display() {
        let error = FetchError::http_status("https://example.com/file.pdf", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected '503' in: {msg}");
        assert!(msg.contains("https://example.com/file.pdf"), "{msg}");
    }

    #[test]
    fn test_io_display_names_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = FetchError::io(PathBuf::from("/tmp/test.pdf"), io_error);
        assert!(error.to_string().contains("/tmp/test.pdf"));
    }

    #[test]
    fn test_empty_artifact_display() {
        let error = FetchError::empty_artifact("/tmp/zero.pdf");
        assert_eq!(error.to_string(), "downloaded file /tmp/zero.pdf is empty");
    }

    #[test]
    fn test_failure_display_includes_attempts_and_cause() {
        let failure = FetchFailure {
            target: "https://example.com/search".to_string(),
            attempts: 3,
            last_error: FetchError::http_status("https://example.com/search", 500),
        };
        let msg = failure.to_string();
        assert!(msg.contains("after 3 attempt(s)"), "{msg}");
        assert!(msg.contains("HTTP 500"), "{msg}");
    }
}

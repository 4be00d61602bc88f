//! Append-only download log.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{HEADER_RULE_WIDTH, StoreError};
use crate::record::DownloadOutcome;

/// Text log with a count header and one status line per finished record.
///
/// The log has a single writer: the downloader creates it at the start of a
/// run and appends as records finish.
#[derive(Debug, Clone)]
pub struct DownloadLog {
    path: PathBuf,
}

impl DownloadLog {
    /// Creates (or truncates) the log and writes the header for `total` records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the parent directory or file cannot be created.
    pub async fn create(
        path: impl Into<PathBuf>,
        catalog_title: &str,
        total: usize,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        let header = format!(
            "{catalog_title} download log (total {total})\n{}\n\n",
            "=".repeat(HEADER_RULE_WIDTH)
        );
        tokio::fs::write(&path, header)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        Ok(Self { path })
    }

    /// Log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `"<marker>: <title> | <url>"` for a finished record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the line cannot be written.
    pub async fn append(&self, outcome: &DownloadOutcome) -> Result<(), StoreError> {
        let line = format!(
            "{}: {} | {}\n",
            outcome.marker(),
            outcome.record.title(),
            outcome.record.url()
        );
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        debug!(marker = outcome.marker(), url = outcome.record.url(), "download logged");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::DocumentRecord;
    use tempfile::TempDir;

    fn outcome(title: &str, succeeded: bool) -> DownloadOutcome {
        DownloadOutcome {
            record: DocumentRecord::new(title, format!("https://x.org/{title}.pdf"), vec![]),
            succeeded,
            local_path: PathBuf::from(format!("{title}.pdf")),
            already_present: false,
            attempts: 1,
        }
    }

    #[tokio::test]
    async fn test_create_writes_header_and_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("log.txt");
        let log = DownloadLog::create(&path, "AUTOSAR CP", 5).await.unwrap();
        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            raw,
            format!("AUTOSAR CP download log (total 5)\n{}\n\n", "=".repeat(80))
        );
    }

    #[tokio::test]
    async fn test_append_adds_status_lines_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let log = DownloadLog::create(temp_dir.path().join("log.txt"), "C", 2)
            .await
            .unwrap();
        log.append(&outcome("a", true)).await.unwrap();
        log.append(&outcome("b", false)).await.unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = raw.lines().skip(3).collect();
        assert_eq!(
            lines,
            ["success: a | https://x.org/a.pdf", "failure: b | https://x.org/b.pdf"]
        );
    }

    #[tokio::test]
    async fn test_create_truncates_previous_run() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.txt");
        let log = DownloadLog::create(&path, "C", 1).await.unwrap();
        log.append(&outcome("old", true)).await.unwrap();

        DownloadLog::create(&path, "C", 1).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("old"));
    }
}

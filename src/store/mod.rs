//! Store: collection artifacts and the download log.
//!
//! The collector writes two artifacts once per run: a numbered human-readable
//! listing and a structured JSON array of `{title, url, info}` objects. The
//! downloader reads the JSON back into [`DocumentRecord`]s and appends one
//! line per finished record to a [`DownloadLog`].

mod error;
mod log;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

pub use error::StoreError;
pub use log::DownloadLog;

use crate::config::HarvestConfig;
use crate::record::DocumentRecord;

/// Width of the `=` rule under artifact headers.
pub(crate) const HEADER_RULE_WIDTH: usize = 80;

/// Persisted shape of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Document title.
    pub title: String,
    /// Absolute document URL.
    pub url: String,
    /// Attributes joined by `" | "`.
    #[serde(default)]
    pub info: String,
}

impl From<&DocumentRecord> for StoredRecord {
    fn from(record: &DocumentRecord) -> Self {
        Self {
            title: record.title().to_string(),
            url: record.url().to_string(),
            info: record.info(),
        }
    }
}

impl From<StoredRecord> for DocumentRecord {
    fn from(stored: StoredRecord) -> Self {
        DocumentRecord::from_parts(stored.title, stored.url, &stored.info)
    }
}

/// Paths of the artifacts written by [`ArtifactStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifacts {
    /// Human-readable listing.
    pub listing: PathBuf,
    /// Structured JSON records.
    pub records: PathBuf,
}

/// Reads and writes collection artifacts in the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    stem: String,
    catalog_title: String,
    listing_path: PathBuf,
    records_path: PathBuf,
}

impl ArtifactStore {
    /// Creates a store for the configured layout. Nothing is touched on disk.
    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            output_dir: config.storage.output_dir.clone(),
            stem: config.storage.artifact_stem.clone(),
            catalog_title: config.storage.catalog_title.clone(),
            listing_path: config.listing_path(),
            records_path: config.records_path(),
        }
    }

    /// Path of the human-readable listing.
    #[must_use]
    pub fn listing_path(&self) -> &Path {
        &self.listing_path
    }

    /// Path of the structured record artifact.
    #[must_use]
    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    /// Creates the output directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub async fn ensure_output_dir(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| StoreError::io(&self.output_dir, e))
    }

    /// Writes both artifacts for `records`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if either file cannot be written.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn save(&self, records: &[DocumentRecord]) -> Result<SavedArtifacts, StoreError> {
        self.ensure_output_dir().await?;

        let listing = render_listing(&self.catalog_title, records);
        write_file(&self.listing_path, listing.as_bytes()).await?;
        info!(path = %self.listing_path.display(), "record listing saved");

        let stored: Vec<StoredRecord> = records.iter().map(StoredRecord::from).collect();
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| StoreError::json(&self.records_path, e))?;
        write_file(&self.records_path, json.as_bytes()).await?;
        info!(path = %self.records_path.display(), "structured records saved");

        Ok(SavedArtifacts {
            listing: self.listing_path.clone(),
            records: self.records_path.clone(),
        })
    }

    /// Loads records from the structured artifact, in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingArtifact`] when the file does not exist,
    /// [`StoreError::Json`] when it is malformed.
    #[instrument(skip(self), fields(path = %self.records_path.display()))]
    pub async fn load_records(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.records_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::MissingArtifact {
                    path: self.records_path.clone(),
                });
            }
            Err(e) => return Err(StoreError::io(&self.records_path, e)),
        };
        let stored: Vec<StoredRecord> =
            serde_json::from_str(&raw).map_err(|e| StoreError::json(&self.records_path, e))?;
        debug!(count = stored.len(), "records loaded");
        Ok(stored.into_iter().map(DocumentRecord::from).collect())
    }

    /// Saves a raw result page for later inspection as `<stem>_<label>.html`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the capture cannot be written.
    pub async fn capture_page(&self, label: &str, html: &str) -> Result<PathBuf, StoreError> {
        self.ensure_output_dir().await?;
        let path = self.output_dir.join(format!("{}_{label}.html", self.stem));
        write_file(&path, html.as_bytes()).await?;
        debug!(path = %path.display(), "page captured");
        Ok(path)
    }
}

/// Renders the numbered listing with its count header.
#[must_use]
pub fn render_listing(catalog_title: &str, records: &[DocumentRecord]) -> String {
    let mut out = format!(
        "{catalog_title} document list (total {})\n{}\n\n",
        records.len(),
        "=".repeat(HEADER_RULE_WIDTH)
    );
    for (index, record) in records.iter().enumerate() {
        out.push_str(&format!("{}. {}\n\n", index + 1, record.render()));
    }
    out
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| StoreError::io(path, e))
}

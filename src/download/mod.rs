//! Downloader: fetches every persisted record into the download directory.
//!
//! Records are processed one at a time with a randomized pause between them.
//! For each record:
//!
//! - the local filename comes from the URL, or from the title when the URL
//!   has no usable last segment ([`target_filename`]);
//! - an existing non-empty file means the record is done and nothing is fetched;
//! - otherwise the body is streamed into `<name>.part` and renamed on
//!   success, resuming a partial file with a range request when one exists;
//! - any failed attempt (HTTP error, dropped connection, empty body) is
//!   retried up to `max_retries` attempts in total.
//!
//! Each fetched record gets one line in the download log. A record that
//! fails permanently is reported in the summary; the run moves on.

mod filename;
mod progress;
mod transfer;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub use filename::target_filename;

use crate::config::HarvestConfig;
use crate::fetch::{FetchError, HttpClient, Pacer, RetryPolicy};
use crate::record::{DocumentRecord, DownloadOutcome};
use crate::store::{DownloadLog, StoreError};
use crate::user_agent;
use transfer::Transfer;

/// Errors that end a download run.
#[derive(Debug, Error)]
pub enum DownloadRunError {
    /// The download directory or log could not be written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Tally of one download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Records whose file is present at the end, skipped ones included.
    pub succeeded: usize,
    /// Records that were already present and not fetched.
    pub skipped: usize,
    /// Records that failed after all attempts.
    pub failed: usize,
    /// Records processed.
    pub total: usize,
    /// Per-record outcomes in input order.
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadSummary {
    fn record(&mut self, outcome: DownloadOutcome) {
        self.total += 1;
        if outcome.succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        if outcome.already_present {
            self.skipped += 1;
        }
        self.outcomes.push(outcome);
    }
}

/// Sequential, resumable downloader.
#[derive(Debug, Clone)]
pub struct Downloader {
    config: Arc<HarvestConfig>,
    client: HttpClient,
    headers: HeaderMap,
    retry_policy: RetryPolicy,
    idle_timeout: Duration,
}

impl Downloader {
    /// Creates a downloader. Document requests carry the browser headers
    /// without a `Referer`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidHeader`] if a configured header value is illegal.
    pub fn new(config: Arc<HarvestConfig>, client: HttpClient) -> Result<Self, FetchError> {
        let headers = user_agent::browser_headers(&config.http, None)?;
        let retry_policy =
            RetryPolicy::new(config.download.max_retries, config.download.retry_delay);
        let idle_timeout = Duration::from_secs(config.download.timeout_secs);
        Ok(Self {
            config,
            client,
            headers,
            retry_policy,
            idle_timeout,
        })
    }

    /// Downloads every record in order and writes the download log.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadRunError::Store`] when the download directory or the
    /// log cannot be written. Per-record failures are in the summary.
    #[instrument(skip(self, records), fields(total = records.len()))]
    pub async fn download_all(
        &self,
        records: &[DocumentRecord],
    ) -> Result<DownloadSummary, DownloadRunError> {
        let download_dir = &self.config.storage.download_dir;
        tokio::fs::create_dir_all(download_dir)
            .await
            .map_err(|e| StoreError::io(download_dir, e))?;
        let log = DownloadLog::create(
            self.config.download_log_path(),
            &self.config.storage.catalog_title,
            records.len(),
        )
        .await?;

        info!(total = records.len(), "starting downloads");
        let mut pacer = Pacer::new(self.config.download.record_delay);
        let mut summary = DownloadSummary::default();

        for (index, record) in records.iter().enumerate() {
            pacer.pause().await;
            let outcome = self.download_one(record, index + 1, records.len()).await;
            if !outcome.already_present {
                log.append(&outcome).await?;
            }
            summary.record(outcome);
        }

        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            total = summary.total,
            "downloads finished"
        );
        Ok(summary)
    }

    /// Downloads a single record, retrying failed attempts.
    #[instrument(skip(self, record), fields(url = record.url()))]
    pub async fn download_one(
        &self,
        record: &DocumentRecord,
        position: usize,
        total: usize,
    ) -> DownloadOutcome {
        let filename = target_filename(record);
        let target = self.config.storage.download_dir.join(&filename);

        if is_complete(&target).await {
            info!(position, total, file = %filename, "already present, skipping");
            return outcome(record, target, true, true, 0);
        }

        info!(position, total, title = record.title(), file = %filename, "downloading");
        let label = format!("[{position}/{total}] {filename}");
        let transfer = Transfer {
            client: &self.client,
            url: record.url(),
            headers: &self.headers,
            idle_timeout: self.idle_timeout,
            target: &target,
            show_progress: self.config.download.show_progress,
            label: &label,
        };
        let transfer = &transfer;

        match self
            .retry_policy
            .run(record.url(), move |attempt| async move {
                transfer.attempt().await.map(|_| attempt)
            })
            .await
        {
            Ok(attempts) => outcome(record, target, true, false, attempts),
            Err(failure) => {
                warn!(
                    file = %filename,
                    attempts = failure.attempts,
                    error = %failure.last_error,
                    "download failed"
                );
                outcome(record, target, false, false, failure.attempts)
            }
        }
    }
}

async fn is_complete(path: &std::path::Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}

fn outcome(
    record: &DocumentRecord,
    local_path: PathBuf,
    succeeded: bool,
    already_present: bool,
    attempts: u32,
) -> DownloadOutcome {
    DownloadOutcome {
        record: record.clone(),
        succeeded,
        local_path,
        already_present,
        attempts,
    }
}

//! Collector: drives the search pages, accumulates records and persists them.
//!
//! One run moves through these states:
//!
//! 1. Fetch page 1 and read the pagination hints. The result counter sets the
//!    target record count and the page links (or the counter) set the page
//!    count; either falls back to a configured default.
//! 2. Fetch pages 2, 3, ... while `(page <= hinted pages || page <= hard max)`
//!    and fewer records than the target are held. A page that adds no new
//!    record bumps the empty-page counter; a page that does resets it. A run of
//!    `max_consecutive_empty` such pages ends the loop early.
//! 3. If fewer than half the target were found, try each fallback query on
//!    page 1 only, merging new records and stopping once the target is met.
//!    The primary query is restored afterwards.
//! 4. Persist the listing and the JSON artifact once.
//!
//! Every fetch after the first waits a randomized delay. Lost pages and
//! failed debug captures are logged and counted but never abort the run;
//! only an unwritable output directory does.

mod fallback;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, HarvestConfig, QueryParameters};
use crate::extract::{Extractor, PageResult};
use crate::fetch::{Pacer, PageSource};
use crate::record::{DocumentRecord, RecordSet};
use crate::store::{ArtifactStore, SavedArtifacts, StoreError};

use fallback::ScopedParams;

/// Errors that end a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Local artifacts could not be written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where the target record count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    /// Read from the first page's result counter.
    Detected,
    /// The configured default; the counter was missing, zero or unreadable.
    Default,
}

/// Why the paging loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Both the hinted page count and the hard page ceiling were passed.
    HintsExhausted,
    /// The target record count was reached.
    TargetReached,
    /// Too many consecutive pages added nothing.
    EmptyPageRun,
}

/// Outcome of one collection run.
#[derive(Debug, Clone)]
pub struct CollectionReport {
    /// Record count the run aimed for.
    pub target_count: usize,
    /// Where `target_count` came from.
    pub target_source: TargetSource,
    /// Page count the loop used (hinted or default).
    pub total_pages: u32,
    /// Pages fetched successfully, fallback pages included.
    pub pages_fetched: u32,
    /// Pages lost after all retries, fallback pages included.
    pub pages_failed: u32,
    /// Why the paging loop ended.
    pub stop_reason: StopReason,
    /// Whether the fallback queries were tried.
    pub fallback_attempted: bool,
    /// Collected records in insertion order, as persisted.
    pub records: Vec<DocumentRecord>,
    /// Where the records were written.
    pub artifacts: SavedArtifacts,
}

impl CollectionReport {
    /// True when the run ended below its target. Reported, never fatal.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.records.len() < self.target_count
    }
}

#[derive(Debug, Default)]
struct PageTally {
    fetched: u32,
    failed: u32,
}

/// Fetches one page and extracts it, capturing raw HTML when useful.
struct PageReader<'a> {
    source: &'a dyn PageSource,
    extractor: &'a Extractor,
    store: &'a ArtifactStore,
    capture: bool,
}

impl PageReader<'_> {
    /// Returns `None` when the page was lost after retries.
    async fn read(
        &self,
        params: &QueryParameters,
        page: u32,
        capture_label: &str,
        always_capture: bool,
        tally: &mut PageTally,
    ) -> Option<PageResult> {
        let html = match self.source.fetch_page(params, page).await {
            Ok(html) => html,
            Err(failure) => {
                tally.failed += 1;
                warn!(page, error = %failure, "result page lost");
                return None;
            }
        };
        tally.fetched += 1;

        let result = self.extractor.extract_page(&html);
        if self.capture && (always_capture || result.records.is_empty()) {
            match self.store.capture_page(capture_label, &html).await {
                Ok(path) => debug!(page, path = %path.display(), "raw page saved"),
                Err(error) => warn!(page, %error, "could not save raw page"),
            }
        }
        Some(result)
    }
}

/// Runs the pagination state machine against a [`PageSource`].
pub struct Collector {
    config: Arc<HarvestConfig>,
    source: Arc<dyn PageSource>,
    extractor: Extractor,
    store: ArtifactStore,
    params: QueryParameters,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("params", &self.params)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Collector {
    /// Creates a collector using the primary query from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the selector profile or origin is invalid.
    pub fn new(config: Arc<HarvestConfig>, source: Arc<dyn PageSource>) -> Result<Self, ConfigError> {
        let extractor = Extractor::from_config(&config)?;
        let store = ArtifactStore::from_config(&config);
        let params = config.search.params.clone();
        Ok(Self {
            config,
            source,
            extractor,
            store,
            params,
        })
    }

    /// Query parameters used for primary page fetches.
    #[must_use]
    pub fn params(&self) -> &QueryParameters {
        &self.params
    }

    /// Runs one collection and persists the result.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Store`] only when the output directory or an
    /// artifact cannot be written. Lost pages are reflected in the report.
    #[instrument(skip(self))]
    pub async fn collect(&mut self) -> Result<CollectionReport, CollectError> {
        let settings = &self.config.collect;
        self.store.ensure_output_dir().await?;

        let reader = PageReader {
            source: self.source.as_ref(),
            extractor: &self.extractor,
            store: &self.store,
            capture: settings.capture_pages,
        };
        let mut pacer = Pacer::new(settings.page_delay);
        let mut tally = PageTally::default();
        let mut records = RecordSet::new();

        info!(
            default_target = settings.default_target_count,
            "starting collection"
        );

        pacer.pause().await;
        let first = reader.read(&self.params, 1, "page_1", true, &mut tally).await;

        let (target_count, target_source) = match first
            .as_ref()
            .and_then(|result| result.total_count_hint)
            .filter(|&count| count > 0)
        {
            Some(count) => (count, TargetSource::Detected),
            None => (settings.default_target_count, TargetSource::Default),
        };
        let total_pages = first
            .as_ref()
            .and_then(|result| result.total_pages_hint)
            .filter(|&pages| pages > 0)
            .unwrap_or(settings.hard_max_pages);
        info!(target_count, ?target_source, total_pages, "pagination hints read");

        if let Some(result) = first {
            let found = result.records.len();
            records.merge(result.records);
            info!(page = 1, found, total = records.len(), "page processed");
        }

        let mut page: u32 = 2;
        let mut empty_run: u32 = 0;
        let stop_reason = loop {
            if records.len() >= target_count {
                break StopReason::TargetReached;
            }
            if page > total_pages && page > settings.hard_max_pages {
                break StopReason::HintsExhausted;
            }

            pacer.pause().await;
            let label = format!("page_{page}");
            let added = match reader.read(&self.params, page, &label, false, &mut tally).await {
                Some(result) => {
                    let found = result.records.len();
                    let added = records.merge(result.records);
                    info!(page, found, added, total = records.len(), "page processed");
                    added
                }
                None => 0,
            };

            if added == 0 {
                empty_run += 1;
                info!(page, empty_run, "page added no records");
                if empty_run >= settings.max_consecutive_empty {
                    warn!(empty_run, "consecutive empty pages, treating catalog as exhausted");
                    break StopReason::EmptyPageRun;
                }
            } else {
                empty_run = 0;
            }
            page += 1;
        };

        let mut fallback_attempted = false;
        if records.len() < target_count {
            warn!(
                collected = records.len(),
                target_count, "collected fewer records than the target"
            );
            if records.len() * 2 < target_count && !self.config.search.fallback_params.is_empty() {
                fallback_attempted = true;
                let mut scoped = ScopedParams::new(&mut self.params);
                for (index, alternative) in self.config.search.fallback_params.iter().enumerate() {
                    info!(fallback = index + 1, params = ?alternative, "trying alternate query");
                    scoped.replace(alternative.clone());

                    pacer.pause().await;
                    let label = format!("fallback_{}", index + 1);
                    if let Some(result) = reader.read(&scoped, 1, &label, false, &mut tally).await {
                        let found = result.records.len();
                        let added = records.merge(result.records);
                        info!(fallback = index + 1, found, added, total = records.len(), "alternate query processed");
                    }
                    if records.len() >= target_count {
                        break;
                    }
                }
            }
        } else {
            info!(collected = records.len(), "target reached");
        }

        let records = records.into_vec();
        let artifacts = self.store.save(&records).await?;

        Ok(CollectionReport {
            target_count,
            target_source,
            total_pages,
            pages_fetched: tally.fetched,
            pages_failed: tally.failed,
            stop_reason,
            fallback_attempted,
            records,
            artifacts,
        })
    }
}

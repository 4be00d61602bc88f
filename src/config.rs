//! Harvest configuration.
//!
//! Every runtime knob (search origin, query filters, pacing, retry limits,
//! output layout) lives in one [`HarvestConfig`]. It is built once at startup,
//! validated, and then shared read-only by the collector and the downloader.
//! A JSON file may override any subset of the defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::extract::Extractor;
use crate::user_agent;

/// Default number of documents expected when the catalog does not report one.
pub const DEFAULT_TARGET_COUNT: usize = 234;

/// Default page ceiling used when pagination metadata is missing or wrong.
pub const DEFAULT_HARD_MAX_PAGES: u32 = 20;

/// Default number of consecutive empty pages tolerated before giving up.
pub const DEFAULT_MAX_CONSECUTIVE_EMPTY: u32 = 3;

/// Default attempts (including the first) for a single fetch or download.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`HarvestConfig`].
    #[error("failed to parse config: {source}")]
    Json {
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A field holds a value outside its allowed range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Dotted field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A CSS selector in the extraction profile does not parse.
    #[error("invalid selector for `{field}` ({selector}): {reason}")]
    InvalidSelector {
        /// Selector field name.
        field: &'static str,
        /// The selector text.
        selector: String,
        /// Parser message.
        reason: String,
    },

    /// A configured URL does not parse.
    #[error("invalid URL for `{field}`: {url}")]
    InvalidUrl {
        /// URL field name.
        field: &'static str,
        /// The URL text.
        url: String,
    },
}

/// Closed interval of seconds from which pacing and retry delays are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound in seconds.
    pub min_secs: f64,
    /// Upper bound in seconds.
    pub max_secs: f64,
}

impl DelayRange {
    /// A range that never sleeps.
    pub const ZERO: Self = Self {
        min_secs: 0.0,
        max_secs: 0.0,
    };

    /// Creates a range of `min_secs..=max_secs`.
    #[must_use]
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// Returns true when every sample is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.max_secs <= 0.0
    }

    /// Draws a delay uniformly from the range.
    ///
    /// Never panics on a range that skipped [`HarvestConfig::validate`]: a
    /// non-finite bound counts as zero and an inverted range yields its lower
    /// bound.
    #[must_use]
    pub fn sample(&self) -> Duration {
        let lo = finite_or_zero(self.min_secs).max(0.0);
        let hi = finite_or_zero(self.max_secs).max(lo);
        if hi <= 0.0 {
            return Duration::ZERO;
        }
        let secs = if hi > lo {
            rand::thread_rng().gen_range(lo..=hi)
        } else {
            lo
        };
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !self.min_secs.is_finite() || !self.max_secs.is_finite() {
            return Err(ConfigError::Invalid {
                field,
                reason: "bounds must be finite".to_string(),
            });
        }
        if self.min_secs < 0.0 {
            return Err(ConfigError::Invalid {
                field,
                reason: format!("min_secs {} is negative", self.min_secs),
            });
        }
        if self.min_secs > self.max_secs {
            return Err(ConfigError::Invalid {
                field,
                reason: format!(
                    "min_secs {} exceeds max_secs {}",
                    self.min_secs, self.max_secs
                ),
            });
        }
        Ok(())
    }
}

fn finite_or_zero(secs: f64) -> f64 {
    if secs.is_finite() { secs } else { 0.0 }
}

/// Filter mapping plus free-text query sent to the search endpoint.
///
/// Filters are kept in a `BTreeMap` so the rendered query string is stable
/// and two parameter sets compare equal exactly when they render equally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParameters {
    /// Filter key to filter value, e.g. `tx_solr[filter][0]` → `category:R24-11`.
    pub filters: BTreeMap<String, String>,
    /// Free-text query.
    pub query: String,
}

impl QueryParameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a filter.
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Sets the free-text query.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Renders the parameters as ordered key/value pairs, filters first.
    #[must_use]
    pub fn pairs<'a>(&'a self, query_key: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .filters
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.push((query_key, self.query.as_str()));
        pairs
    }
}

/// Where and how the catalog is queried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search endpoint URL.
    pub search_url: String,
    /// Origin that relative document links are resolved against.
    pub origin: String,
    /// Query-string key of the free-text query.
    pub query_key: String,
    /// Query-string key of the page number (only sent for pages after the first).
    pub page_key: String,
    /// Primary query.
    pub params: QueryParameters,
    /// Alternate queries tried, page 1 only, when the primary query under-collects.
    pub fallback_params: Vec<QueryParameters>,
    /// `Referer` header sent with search requests.
    pub referer: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.autosar.org/search".to_string(),
            origin: "https://www.autosar.org/".to_string(),
            query_key: "tx_solr[q]".to_string(),
            page_key: "tx_solr[page]".to_string(),
            params: QueryParameters::new()
                .with_filter("tx_solr[filter][0]", "category:R24-11")
                .with_filter("tx_solr[filter][1]", "platform:CP"),
            fallback_params: vec![
                QueryParameters::new().with_filter("tx_solr[filter][0]", "category:R24-11"),
                QueryParameters::new().with_filter("tx_solr[filter][0]", "platform:CP"),
                QueryParameters::new().with_query("AUTOSAR CP R24-11"),
            ],
            referer: Some("https://www.autosar.org/search".to_string()),
        }
    }
}

/// CSS selectors that locate entries and pagination signals in a result page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One element per catalog entry.
    pub entry: String,
    /// Title link inside an entry.
    pub title_link: String,
    /// Attribute elements inside an entry.
    pub attribute: String,
    /// Numbered pagination links.
    pub pagination_link: String,
    /// Element holding the total result counter text.
    pub result_counter: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            entry: ".results-entry".to_string(),
            title_link: ".results-topic a".to_string(),
            attribute: ".extra-info span".to_string(),
            pagination_link: ".pagination li a".to_string(),
            result_counter: ".results_counter".to_string(),
        }
    }
}

/// Collection loop limits and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Target record count used when the catalog reports none.
    pub default_target_count: usize,
    /// Page ceiling that applies alongside the catalog's own page count.
    pub hard_max_pages: u32,
    /// Consecutive empty pages after which the catalog is treated as exhausted.
    pub max_consecutive_empty: u32,
    /// Page size assumed when deriving a page count from the result counter.
    pub results_per_page: u32,
    /// Attempts per page fetch, including the first.
    pub max_attempts: u32,
    /// Delay between failed page fetch attempts.
    pub retry_delay: DelayRange,
    /// Delay before every page fetch after the first.
    pub page_delay: DelayRange,
    /// Save raw HTML of the first page and of empty pages.
    pub capture_pages: bool,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            default_target_count: DEFAULT_TARGET_COUNT,
            hard_max_pages: DEFAULT_HARD_MAX_PAGES,
            max_consecutive_empty: DEFAULT_MAX_CONSECUTIVE_EMPTY,
            results_per_page: 20,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DelayRange::new(2.0, 5.0),
            page_delay: DelayRange::new(2.0, 5.0),
            capture_pages: true,
        }
    }
}

/// Download retry limits and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Attempts per record, including the first.
    pub max_retries: u32,
    /// Delay between failed attempts for one record.
    pub retry_delay: DelayRange,
    /// Delay before every record after the first.
    pub record_delay: DelayRange,
    /// Whole-request timeout for one download attempt.
    pub timeout_secs: u64,
    /// Draw a byte progress bar when the content length is known.
    pub show_progress: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DelayRange::new(2.0, 5.0),
            record_delay: DelayRange::new(1.0, 3.0),
            timeout_secs: 60,
            show_progress: true,
        }
    }
}

/// On-disk layout of the collection artifacts and downloaded files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the record artifacts and debug page captures.
    pub output_dir: PathBuf,
    /// Directory downloaded files are written to.
    pub download_dir: PathBuf,
    /// File stem shared by the listing, JSON artifact and page captures.
    pub artifact_stem: String,
    /// Catalog name used in artifact headers.
    pub catalog_title: String,
    /// Download log file name inside `download_dir`.
    pub download_log_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            download_dir: PathBuf::from("download_cp"),
            artifact_stem: "autosar_cp_documents".to_string(),
            catalog_title: "AUTOSAR CP".to_string(),
            download_log_name: "download_cp_log.txt".to_string(),
        }
    }
}

/// Header values and client timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// `User-Agent` header.
    pub user_agent: String,
    /// `Accept` header.
    pub accept: String,
    /// `Accept-Language` header.
    pub accept_language: String,
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for search pages.
    pub read_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: user_agent::BROWSER_USER_AGENT.to_string(),
            accept: user_agent::BROWSER_ACCEPT.to_string(),
            accept_language: user_agent::BROWSER_ACCEPT_LANGUAGE.to_string(),
            connect_timeout_secs: 30,
            read_timeout_secs: 30,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Search endpoint and queries.
    pub search: SearchConfig,
    /// Extraction profile.
    pub selectors: SelectorConfig,
    /// Collection loop settings.
    pub collect: CollectConfig,
    /// Download settings.
    pub download: DownloadConfig,
    /// Artifact layout.
    pub storage: StorageConfig,
    /// HTTP headers and timeouts.
    pub http: HttpConfig,
}

impl HarvestConfig {
    /// Parses a JSON document; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] when the text is not valid JSON for this shape.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|source| ConfigError::Json { source })
    }

    /// Reads and parses a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Json`] if it cannot be parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Returns a copy with every pacing and retry delay set to zero.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.collect.retry_delay = DelayRange::ZERO;
        self.collect.page_delay = DelayRange::ZERO;
        self.download.retry_delay = DelayRange::ZERO;
        self.download.record_delay = DelayRange::ZERO;
        self
    }

    /// Path of the human-readable record listing.
    #[must_use]
    pub fn listing_path(&self) -> PathBuf {
        self.storage
            .output_dir
            .join(format!("{}.txt", self.storage.artifact_stem))
    }

    /// Path of the structured record artifact.
    #[must_use]
    pub fn records_path(&self) -> PathBuf {
        self.storage
            .output_dir
            .join(format!("{}.json", self.storage.artifact_stem))
    }

    /// Path of the download log.
    #[must_use]
    pub fn download_log_path(&self) -> PathBuf {
        self.storage
            .download_dir
            .join(&self.storage.download_log_name)
    }

    /// Checks every value the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.search.search_url).map_err(|_| ConfigError::InvalidUrl {
            field: "search.search_url",
            url: self.search.search_url.clone(),
        })?;
        Url::parse(&self.search.origin).map_err(|_| ConfigError::InvalidUrl {
            field: "search.origin",
            url: self.search.origin.clone(),
        })?;
        if self.search.page_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "search.page_key",
                reason: "must not be empty".to_string(),
            });
        }

        if self.collect.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "collect.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.collect.results_per_page == 0 {
            return Err(ConfigError::Invalid {
                field: "collect.results_per_page",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.collect.max_consecutive_empty == 0 {
            return Err(ConfigError::Invalid {
                field: "collect.max_consecutive_empty",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.download.max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "download.max_retries",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.download.timeout_secs == 0 || self.http.read_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "timeouts must be at least 1 second".to_string(),
            });
        }
        if self.storage.artifact_stem.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "storage.artifact_stem",
                reason: "must not be empty".to_string(),
            });
        }

        self.collect.retry_delay.validate("collect.retry_delay")?;
        self.collect.page_delay.validate("collect.page_delay")?;
        self.download.retry_delay.validate("download.retry_delay")?;
        self.download.record_delay.validate("download.record_delay")?;

        Extractor::from_config(self)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        HarvestConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_query_renders_filters_then_query() {
        let config = SearchConfig::default();
        let pairs = config.params.pairs(&config.query_key);
        assert_eq!(
            pairs,
            vec![
                ("tx_solr[filter][0]", "category:R24-11"),
                ("tx_solr[filter][1]", "platform:CP"),
                ("tx_solr[q]", ""),
            ]
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = HarvestConfig::from_json_str(
            r#"{ "collect": { "hard_max_pages": 5 }, "storage": { "download_dir": "files" } }"#,
        )
        .unwrap();
        assert_eq!(config.collect.hard_max_pages, 5);
        assert_eq!(config.collect.max_consecutive_empty, 3);
        assert_eq!(config.storage.download_dir, PathBuf::from("files"));
        assert_eq!(config.storage.output_dir, PathBuf::from("output"));
        assert_eq!(config.search.fallback_params.len(), 3);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = HarvestConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = HarvestConfig::from_json_file(Path::new("/nonexistent/harvest.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_validate_rejects_inverted_delay_range() {
        let mut config = HarvestConfig::default();
        config.collect.page_delay = DelayRange::new(5.0, 2.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("collect.page_delay"), "{err}");
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = HarvestConfig::default();
        config.download.max_retries = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "download.max_retries",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_selector() {
        let mut config = HarvestConfig::default();
        config.selectors.entry = "[[[".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSelector { field: "entry", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_origin() {
        let mut config = HarvestConfig::default();
        config.search.origin = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl {
                field: "search.origin",
                ..
            })
        ));
    }

    #[test]
    fn test_delay_sample_stays_in_range() {
        let range = DelayRange::new(0.01, 0.02);
        for _ in 0..50 {
            let delay = range.sample();
            assert!(delay >= Duration::from_millis(9), "{delay:?}");
            assert!(delay <= Duration::from_millis(21), "{delay:?}");
        }
    }

    #[test]
    fn test_zero_range_never_sleeps() {
        assert_eq!(DelayRange::ZERO.sample(), Duration::ZERO);
        let config = HarvestConfig::default().without_delays();
        assert!(config.collect.page_delay.is_zero());
        assert!(config.download.record_delay.is_zero());
    }

    #[test]
    fn test_unvalidated_range_samples_without_panicking() {
        let infinite = DelayRange::new(0.0, f64::INFINITY);
        assert_eq!(infinite.sample(), Duration::ZERO);

        let nan_min = DelayRange::new(f64::NAN, 0.01);
        assert!(nan_min.sample() <= Duration::from_millis(11));

        let inverted = DelayRange::new(0.02, 0.01);
        assert_eq!(inverted.sample(), Duration::from_secs_f64(0.02));

        let negative = DelayRange::new(-5.0, -1.0);
        assert_eq!(negative.sample(), Duration::ZERO);
    }

    #[test]
    fn test_artifact_paths_follow_storage_layout() {
        let config = HarvestConfig::default();
        assert_eq!(
            config.records_path(),
            PathBuf::from("output/autosar_cp_documents.json")
        );
        assert_eq!(
            config.listing_path(),
            PathBuf::from("output/autosar_cp_documents.txt")
        );
        assert_eq!(
            config.download_log_path(),
            PathBuf::from("download_cp/download_cp_log.txt")
        );
    }
}

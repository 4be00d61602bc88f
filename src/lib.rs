//! Catalog Harvester Core Library
//!
//! Collects the entries of a paginated document catalog from its search
//! endpoint and downloads the referenced files.
//!
//! # Architecture
//!
//! The pipeline has two stages that meet at the persisted record artifact:
//! - [`collect`] - drives result pages through [`fetch`] and [`extract`],
//!   deduplicates into a [`RecordSet`] and persists it via [`store`]
//! - [`download`] - reads the persisted records back and fetches every
//!   document with resumable, retried transfers
//!
//! Supporting modules:
//! - [`config`] - immutable run configuration and its defaults
//! - [`fetch`] - HTTP client, bounded retry and request pacing
//! - [`extract`] - HTML to records and pagination hints
//! - [`record`] - document records and the deduplicating set
//! - [`store`] - record artifacts, page captures and the download log

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod collect;
pub mod config;
pub mod download;
pub mod extract;
pub mod fetch;
pub mod record;
pub mod store;
#[cfg(test)]
pub(crate) mod test_support;
pub mod user_agent;

// Re-export commonly used types
pub use collect::{CollectError, CollectionReport, Collector, StopReason, TargetSource};
pub use config::{ConfigError, DelayRange, HarvestConfig, QueryParameters};
pub use download::{DownloadRunError, DownloadSummary, Downloader, target_filename};
pub use extract::{Extractor, PageResult, ParseAnomaly};
pub use fetch::{
    FetchError, FetchFailure, HttpClient, Pacer, PageSource, RetryDecision, RetryPolicy,
    SearchClient,
};
pub use record::{DocumentRecord, DownloadOutcome, RecordSet};
pub use store::{ArtifactStore, DownloadLog, StoreError};

//! Extractor: turns a raw result page into document records and pagination hints.
//!
//! Extraction is pure and never fails as a whole. Missing structure yields an
//! empty record list or absent hints; a malformed entry is skipped and the
//! rest of the page is still processed.
//!
//! # Example
//!
//! ```
//! use harvester_core::config::HarvestConfig;
//! use harvester_core::extract::Extractor;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = Extractor::from_config(&HarvestConfig::default())?;
//! let html = r#"<div class="results-entry">
//!     <h3 class="results-topic"><a href="/fileadmin/spec.pdf">Spec</a></h3>
//! </div>"#;
//! let records = extractor.extract_records(html);
//! assert_eq!(records[0].url(), "https://www.autosar.org/fileadmin/spec.pdf");
//! # Ok(())
//! # }
//! ```

mod pagination;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub use pagination::PaginationHints;

use crate::config::{ConfigError, HarvestConfig};
use crate::record::DocumentRecord;

/// Everything extracted from one result page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// Records in page order.
    pub records: Vec<DocumentRecord>,
    /// Total page count signalled by the page, if any.
    pub total_pages_hint: Option<u32>,
    /// Total result count signalled by the page, if any.
    pub total_count_hint: Option<usize>,
}

/// Why a single entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAnomaly {
    /// The entry has no title link.
    #[error("entry has no title link")]
    MissingTitleLink,
    /// The title link has no usable `href`.
    #[error("title link has an empty href")]
    MissingHref,
    /// The `href` cannot be turned into an absolute http(s) URL.
    #[error("cannot resolve href {href:?} against the catalog origin")]
    UnresolvableHref {
        /// The raw attribute value.
        href: String,
    },
}

/// Compiled selector profile bound to the catalog origin.
#[derive(Debug, Clone)]
pub struct Extractor {
    entry: Selector,
    title_link: Selector,
    attribute: Selector,
    pagination_link: Selector,
    result_counter: Selector,
    origin: Url,
    results_per_page: u32,
}

impl Extractor {
    /// Compiles the selector profile from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSelector`] for a selector that does not
    /// parse and [`ConfigError::InvalidUrl`] for a bad origin.
    pub fn from_config(config: &HarvestConfig) -> Result<Self, ConfigError> {
        let selectors = &config.selectors;
        let origin = Url::parse(&config.search.origin).map_err(|_| ConfigError::InvalidUrl {
            field: "search.origin",
            url: config.search.origin.clone(),
        })?;
        Ok(Self {
            entry: compile("entry", &selectors.entry)?,
            title_link: compile("title_link", &selectors.title_link)?,
            attribute: compile("attribute", &selectors.attribute)?,
            pagination_link: compile("pagination_link", &selectors.pagination_link)?,
            result_counter: compile("result_counter", &selectors.result_counter)?,
            origin,
            results_per_page: config.collect.results_per_page.max(1),
        })
    }

    /// Parses the page once and extracts both records and hints.
    #[must_use]
    pub fn extract_page(&self, html: &str) -> PageResult {
        let document = Html::parse_document(html);
        let hints = self.hints_from(&document);
        PageResult {
            records: self.records_from(&document),
            total_pages_hint: hints.total_pages,
            total_count_hint: hints.total_count,
        }
    }

    /// Extracts document records in page order.
    #[must_use]
    pub fn extract_records(&self, html: &str) -> Vec<DocumentRecord> {
        self.records_from(&Html::parse_document(html))
    }

    /// Extracts the total page and result count signals.
    #[must_use]
    pub fn extract_pagination_hints(&self, html: &str) -> PaginationHints {
        self.hints_from(&Html::parse_document(html))
    }

    fn records_from(&self, document: &Html) -> Vec<DocumentRecord> {
        let mut records = Vec::new();
        for (index, entry) in document.select(&self.entry).enumerate() {
            match self.record_from_entry(entry) {
                Ok(record) => records.push(record),
                Err(anomaly) => debug!(entry = index, %anomaly, "skipping malformed entry"),
            }
        }
        records
    }

    fn record_from_entry(&self, entry: ElementRef<'_>) -> Result<DocumentRecord, ParseAnomaly> {
        let link = entry
            .select(&self.title_link)
            .next()
            .ok_or(ParseAnomaly::MissingTitleLink)?;

        let title = element_text(link);
        let href = link
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or(ParseAnomaly::MissingHref)?;
        let url = self.resolve_href(href)?;

        let attributes = entry
            .select(&self.attribute)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();

        Ok(DocumentRecord::new(title, url, attributes))
    }

    /// Keeps absolute http(s) links verbatim and resolves everything else
    /// against the catalog origin.
    fn resolve_href(&self, href: &str) -> Result<String, ParseAnomaly> {
        if href.starts_with("http://") || href.starts_with("https://") {
            return Ok(href.to_string());
        }
        match self.origin.join(href) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url.to_string()),
            _ => Err(ParseAnomaly::UnresolvableHref {
                href: href.to_string(),
            }),
        }
    }

    fn hints_from(&self, document: &Html) -> PaginationHints {
        let link_texts = document.select(&self.pagination_link).map(element_text);
        let counter_text = document.select(&self.result_counter).next().map(element_text);
        PaginationHints::infer(link_texts, counter_text.as_deref(), self.results_per_page)
    }
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

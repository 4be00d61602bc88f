//! Document records, the deduplicating record set, and download outcomes.

use std::collections::HashSet;
use std::path::PathBuf;

/// Delimiter between attributes in rendered and persisted records.
pub const ATTRIBUTE_DELIMITER: &str = " | ";

/// One catalog entry: title, absolute URL and ordered auxiliary attributes.
///
/// Records are immutable once built. Two records are duplicates exactly when
/// their rendered `title | url | attributes` lines are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRecord {
    title: String,
    url: String,
    attributes: Vec<String>,
}

impl DocumentRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            attributes,
        }
    }

    /// Rebuilds a record from its persisted form, splitting `info` back into
    /// attributes. An empty `info` means no attributes.
    #[must_use]
    pub fn from_parts(title: impl Into<String>, url: impl Into<String>, info: &str) -> Self {
        let attributes = if info.is_empty() {
            Vec::new()
        } else {
            info.split(ATTRIBUTE_DELIMITER).map(str::to_string).collect()
        };
        Self::new(title, url, attributes)
    }

    /// Document title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Absolute document URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Auxiliary attributes in page order.
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Attributes joined by [`ATTRIBUTE_DELIMITER`].
    #[must_use]
    pub fn info(&self) -> String {
        self.attributes.join(ATTRIBUTE_DELIMITER)
    }

    /// The `title | url | info` line used for identity and the listing.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{}{ATTRIBUTE_DELIMITER}{}{ATTRIBUTE_DELIMITER}{}",
            self.title,
            self.url,
            self.info()
        )
    }
}

/// Insertion-ordered set of records without structural duplicates.
///
/// Grows only by union. The rendered line is the identity key, so order of
/// insertion never affects which records are considered equal.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<DocumentRecord>,
    keys: HashSet<String>,
}

impl RecordSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `record` unless an identical one is present; returns whether it was new.
    pub fn insert(&mut self, record: DocumentRecord) -> bool {
        if self.keys.insert(record.render()) {
            self.records.push(record);
            true
        } else {
            false
        }
    }

    /// Adds every record and returns how many were new.
    pub fn merge<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = DocumentRecord>,
    {
        let mut added = 0;
        for record in records {
            if self.insert(record) {
                added += 1;
            }
        }
        added
    }

    /// Number of distinct records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the set, returning records in insertion order.
    #[must_use]
    pub fn into_vec(self) -> Vec<DocumentRecord> {
        self.records
    }
}

impl FromIterator<DocumentRecord> for RecordSet {
    fn from_iter<T: IntoIterator<Item = DocumentRecord>>(iter: T) -> Self {
        let mut set = Self::new();
        set.merge(iter);
        set
    }
}

/// Final result of downloading one record. Appended to the run's outcome
/// log and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// The record that was processed.
    pub record: DocumentRecord,
    /// Whether a complete, non-empty file is present at `local_path`.
    pub succeeded: bool,
    /// Target path derived for the record.
    pub local_path: PathBuf,
    /// True when the file already existed and nothing was fetched.
    pub already_present: bool,
    /// Fetch attempts made (zero when already present).
    pub attempts: u32,
}

impl DownloadOutcome {
    /// Status marker used in the download log.
    #[must_use]
    pub fn marker(&self) -> &'static str {
        if self.succeeded { "success" } else { "failure" }
    }
}

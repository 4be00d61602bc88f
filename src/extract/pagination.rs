//! Pagination signal inference.
//!
//! Two signals exist on a result page: numbered pagination links and a free
//! text result counter. Links win when present; otherwise the page count is
//! derived from the counter and the assumed page size.
//!
//! The counter is scraped as the first run of digits in its text. A counter
//! such as "1-20 of 234" therefore reports 1; callers fall back to their
//! configured defaults and accept that inaccuracy.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

#[allow(clippy::expect_used)]
static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("counter regex is valid")); // Static pattern, safe to panic

/// Page and result count signals found on a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationHints {
    /// Highest numbered pagination link, or the count-derived page total.
    pub total_pages: Option<u32>,
    /// First number in the result counter.
    pub total_count: Option<usize>,
}

impl PaginationHints {
    /// Infers hints from pagination link texts and the counter text.
    pub fn infer<I>(link_texts: I, counter_text: Option<&str>, results_per_page: u32) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let total_count = counter_text.and_then(parse_counter);
        let from_links = link_texts
            .into_iter()
            .filter_map(|text| parse_page_number(&text))
            .max();
        let total_pages = from_links.or_else(|| {
            total_count.and_then(|count| {
                let per_page = usize::try_from(results_per_page.max(1)).ok()?;
                u32::try_from(count.div_ceil(per_page)).ok()
            })
        });
        trace!(?total_pages, ?total_count, "pagination hints");
        Self {
            total_pages,
            total_count,
        }
    }
}

fn parse_page_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_counter(text: &str) -> Option<usize> {
    FIRST_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

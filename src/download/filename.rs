//! Local filename derivation for downloaded documents.

use std::path::{Component, Path};

use url::Url;

use crate::record::DocumentRecord;

const TITLE_FALLBACK_STEM: &str = "document";

/// Picks the local filename for a record.
///
/// The percent-decoded last URL path segment wins when it is a safe single
/// path component. Otherwise the sanitized title is used with an extension
/// inferred from the URL.
#[must_use]
pub fn target_filename(record: &DocumentRecord) -> String {
    filename_from_url(record.url())
        .unwrap_or_else(|| filename_from_title(record.title(), record.url()))
}

/// Decoded last path segment of `url`, if present and safe to use as-is.
pub(crate) fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    is_safe_filename(&decoded).then_some(decoded)
}

/// `<sanitized title><ext>` where ext is `.zip` for zip URLs and `.pdf` otherwise.
pub(crate) fn filename_from_title(title: &str, url: &str) -> String {
    let stem = sanitize_title(title);
    let stem = if stem.is_empty() {
        TITLE_FALLBACK_STEM.to_string()
    } else {
        stem
    };
    format!("{stem}{}", extension_from_url(url))
}

/// Keeps alphanumerics, spaces, `.`, `_` and `-`, trims, then turns every
/// run of spaces into one underscore.
pub(crate) fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect();

    let mut out = String::with_capacity(kept.len());
    let mut prev_space = false;
    for ch in kept.trim().chars() {
        if ch == ' ' {
            if !prev_space {
                out.push('_');
            }
            prev_space = true;
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out
}

fn extension_from_url(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".zip") { ".zip" } else { ".pdf" }
}

fn is_safe_filename(name: &str) -> bool {
    if name.contains(['/', '\\']) || name.chars().any(char::is_control) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

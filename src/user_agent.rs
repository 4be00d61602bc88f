//! Browser-like header values sent to the catalog and document hosts.
//!
//! The catalog rejects obvious tool traffic, so both stages present the same
//! desktop-browser identity by default. Values can be overridden through
//! [`HttpConfig`](crate::config::HttpConfig).

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};

use crate::config::HttpConfig;
use crate::fetch::FetchError;

/// Default desktop Chrome User-Agent.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default `Accept` header of a top-level navigation.
pub const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
    image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Default `Accept-Language` header.
pub const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7";

/// Builds the header set for a request, adding `Referer` when given.
///
/// # Errors
///
/// Returns [`FetchError::InvalidHeader`] when a configured value contains
/// characters not allowed in an HTTP header.
pub fn browser_headers(http: &HttpConfig, referer: Option<&str>) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, header_value("User-Agent", &http.user_agent)?);
    headers.insert(ACCEPT, header_value("Accept", &http.accept)?);
    headers.insert(
        ACCEPT_LANGUAGE,
        header_value("Accept-Language", &http.accept_language)?,
    );
    if let Some(referer) = referer {
        headers.insert(REFERER, header_value("Referer", referer)?);
    }
    Ok(headers)
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader { name })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_headers_without_referer() {
        let headers = browser_headers(&HttpConfig::default(), None).unwrap();
        assert_eq!(
            headers.get(USER_AGENT).unwrap().to_str().unwrap(),
            BROWSER_USER_AGENT
        );
        assert!(headers.get(ACCEPT).is_some());
        assert!(headers.get(ACCEPT_LANGUAGE).is_some());
        assert!(headers.get(REFERER).is_none());
    }

    #[test]
    fn test_browser_headers_with_referer() {
        let headers =
            browser_headers(&HttpConfig::default(), Some("https://example.org/search")).unwrap();
        assert_eq!(
            headers.get(REFERER).unwrap().to_str().unwrap(),
            "https://example.org/search"
        );
    }

    #[test]
    fn test_user_agent_looks_like_a_browser() {
        assert!(BROWSER_USER_AGENT.starts_with("Mozilla/5.0"));
        assert!(!BROWSER_USER_AGENT.contains("  "));
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let http = HttpConfig {
            user_agent: "bad\nvalue".to_string(),
            ..HttpConfig::default()
        };
        let err = browser_headers(&http, None).unwrap_err();
        assert!(matches!(err, FetchError::InvalidHeader { name: "User-Agent" }));
    }
}

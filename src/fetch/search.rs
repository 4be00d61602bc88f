//! Search endpoint access.
//!
//! [`PageSource`] is the seam between the collector and the network: given
//! query parameters and a page number it yields raw HTML or a terminal
//! [`FetchFailure`]. [`SearchClient`] is the HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::{debug, instrument};
use url::Url;

use super::{FetchError, FetchFailure, HttpClient, RetryPolicy};
use crate::config::{HarvestConfig, QueryParameters};
use crate::user_agent;

/// Source of raw result pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches result page `page` (1-indexed) for `params`.
    ///
    /// Implementations retry internally; an `Err` means the page is lost.
    async fn fetch_page(&self, params: &QueryParameters, page: u32)
    -> Result<String, FetchFailure>;
}

/// Fetches result pages from the configured search endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: HttpClient,
    search_url: Url,
    query_key: String,
    page_key: String,
    headers: HeaderMap,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl SearchClient {
    /// Creates a search client over a shared [`HttpClient`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the search URL does not parse and
    /// [`FetchError::InvalidHeader`] if a header value is illegal.
    pub fn new(client: HttpClient, config: &HarvestConfig) -> Result<Self, FetchError> {
        let search_url = Url::parse(&config.search.search_url)
            .map_err(|_| FetchError::invalid_url(&config.search.search_url))?;
        let headers = user_agent::browser_headers(&config.http, config.search.referer.as_deref())?;
        Ok(Self {
            client,
            search_url,
            query_key: config.search.query_key.clone(),
            page_key: config.search.page_key.clone(),
            headers,
            timeout: Duration::from_secs(config.http.read_timeout_secs),
            retry_policy: RetryPolicy::new(
                config.collect.max_attempts,
                config.collect.retry_delay,
            ),
        })
    }

    /// Builds the request URL for one page.
    ///
    /// The page key is only added after the first page, matching the
    /// catalog's own links.
    #[must_use]
    pub fn page_url(&self, params: &QueryParameters, page: u32) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params.pairs(&self.query_key) {
                query.append_pair(key, value);
            }
            if page > 1 {
                query.append_pair(&self.page_key, &page.to_string());
            }
        }
        url
    }
}

#[async_trait]
impl PageSource for SearchClient {
    #[instrument(skip(self, params))]
    async fn fetch_page(
        &self,
        params: &QueryParameters,
        page: u32,
    ) -> Result<String, FetchFailure> {
        let url = self.page_url(params, page).to_string();
        let url_ref = url.as_str();
        self.retry_policy
            .run(url_ref, move |attempt| async move {
                debug!(page, attempt, "fetching result page");
                self.client
                    .get_text(url_ref, self.headers.clone(), self.timeout)
                    .await
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    fn config_for(uri: &str) -> HarvestConfig {
        let mut config = HarvestConfig::default().without_delays();
        config.search.search_url = format!("{uri}/search");
        config.search.referer = Some(format!("{uri}/search"));
        config
    }

    fn search_client(config: &HarvestConfig) -> SearchClient {
        SearchClient::new(HttpClient::new(&config.http).unwrap(), config).unwrap()
    }

    #[test]
    fn test_first_page_url_has_no_page_key() {
        let config = HarvestConfig::default();
        let client = search_client(&config);
        let url = client.page_url(&config.search.params, 1);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("tx_solr[filter][0]".to_string(), "category:R24-11".to_string()),
                ("tx_solr[filter][1]".to_string(), "platform:CP".to_string()),
                ("tx_solr[q]".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_later_page_url_appends_page_key() {
        let config = HarvestConfig::default();
        let client = search_client(&config);
        let url = client.page_url(&config.search.params, 4);
        assert!(
            url.query_pairs()
                .any(|(k, v)| k == "tx_solr[page]" && v == "4")
        );
    }

    #[test]
    fn test_invalid_search_url_rejected() {
        let mut config = HarvestConfig::default();
        config.search.search_url = "::nope".to_string();
        let err = SearchClient::new(HttpClient::new(&config.http).unwrap(), &config).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_fetch_page_sends_query_and_browser_headers() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("tx_solr[filter][1]", "platform:CP"))
            .and(query_param("tx_solr[page]", "2"))
            .and(header("referer", format!("{}/search", mock_server.uri()).as_str()))
            .and(header("accept-language", user_agent::BROWSER_ACCEPT_LANGUAGE))
            .respond_with(ResponseTemplate::new(200).set_body_string("page two"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = config_for(&mock_server.uri());
        let body = search_client(&config)
            .fetch_page(&config.search.params, 2)
            .await
            .unwrap();
        assert_eq!(body, "page two");
    }

    #[tokio::test]
    async fn test_fetch_page_retries_then_reports_failure() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&mock_server)
            .await;

        let config = config_for(&mock_server.uri());
        let failure = search_client(&config)
            .fetch_page(&config.search.params, 1)
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert!(matches!(
            failure.last_error,
            FetchError::HttpStatus { status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_page_recovers_after_transient_failure() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&mock_server)
            .await;

        let config = config_for(&mock_server.uri());
        let body = search_client(&config)
            .fetch_page(&config.search.params, 1)
            .await
            .unwrap();
        assert_eq!(body, "recovered");
    }
}

//! HTTP client wrapper shared by search page fetches and document downloads.
//!
//! This is the only place that talks to `reqwest`. It normalizes transport
//! errors and non-success statuses into [`FetchError`] so callers never see
//! library-specific error types.

use std::time::Duration;

use reqwest::header::{HeaderMap, RANGE};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, instrument};

use super::FetchError;
use crate::config::HttpConfig;

/// HTTP client with connection pooling and fixed connect timeout.
///
/// Created once per run and cloned cheaply into the components that need it.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Builds a client from the HTTP settings.
    ///
    /// Per-request timeouts are passed to each call so search pages and
    /// downloads can use different limits over the same connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the TLS backend or system proxy
    /// configuration cannot be initialized.
    pub fn new(http: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
            .gzip(true)
            .build()
            .map_err(|source| FetchError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Fetches `url` and returns the body as text. `timeout` bounds the whole
    /// request, body included.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, timeout, or any
    /// non-success status.
    #[instrument(level = "debug", skip(self, headers), fields(url = %url))]
    pub async fn get_text(
        &self,
        url: &str,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let request = self.request(url, headers, None)?.timeout(timeout);
        let response = send(url, request).await?;
        response
            .text()
            .await
            .map_err(|e| FetchError::network(url, e))
    }

    /// Starts a GET whose body the caller streams.
    ///
    /// `idle_timeout` bounds only the wait for the response head. The body has
    /// no overall deadline; the caller limits each read instead, so a large
    /// transfer that keeps making progress is never cut off.
    ///
    /// When `range_start` is given a `Range: bytes=N-` header is sent; the
    /// caller inspects the status (`206` vs `200`) to learn whether the
    /// server honored it.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, timeout, or any
    /// non-success status.
    #[instrument(level = "debug", skip(self, headers), fields(url = %url))]
    pub async fn get_stream(
        &self,
        url: &str,
        headers: HeaderMap,
        range_start: Option<u64>,
        idle_timeout: Duration,
    ) -> Result<Response, FetchError> {
        let request = self.request(url, headers, range_start)?;
        tokio::time::timeout(idle_timeout, send(url, request))
            .await
            .map_err(|_| FetchError::timeout(url))?
    }

    fn request(
        &self,
        url: &str,
        headers: HeaderMap,
        range_start: Option<u64>,
    ) -> Result<RequestBuilder, FetchError> {
        let parsed = url::Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let mut request = self.client.get(parsed).headers(headers);
        if let Some(start) = range_start {
            request = request.header(RANGE, format!("bytes={start}-"));
        }
        Ok(request)
    }
}

async fn send(url: &str, request: RequestBuilder) -> Result<Response, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|e| FetchError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        debug!(status = status.as_u16(), "non-success response");
        return Err(FetchError::http_status(url, status.as_u16()));
    }

    Ok(response)
}

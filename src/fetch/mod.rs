//! Fetcher: single HTTP GETs with bounded, randomized retry.
//!
//! - [`HttpClient`] wraps the HTTP library and normalizes its errors.
//! - [`RetryPolicy`] is the explicit bounded retry loop shared by page
//!   fetches and downloads; [`Pacer`] spaces out consecutive requests.
//! - [`PageSource`] / [`SearchClient`] fetch catalog result pages.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::config::HarvestConfig;
//! use harvester_core::fetch::{HttpClient, PageSource, SearchClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarvestConfig::default();
//! let client = HttpClient::new(&config.http)?;
//! let search = SearchClient::new(client, &config)?;
//! let html = search.fetch_page(&config.search.params, 1).await?;
//! println!("{} bytes", html.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod retry;
mod search;

pub use client::HttpClient;
pub use error::{FetchError, FetchFailure};
pub use retry::{Pacer, RetryDecision, RetryPolicy};
pub use search::{PageSource, SearchClient};

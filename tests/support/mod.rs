//! Helpers shared by the integration test binaries.

#![allow(dead_code)]

use std::net::TcpListener;
use std::path::Path;

use harvester_core::HarvestConfig;
use wiremock::MockServer;

const REQUIRE_ENV: &str = "HARVESTER_REQUIRE_SOCKET_TESTS";

fn socket_tests_required() -> bool {
    std::env::var(REQUIRE_ENV)
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a wiremock server, or returns `None` when localhost binding fails.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return Some(MockServer::start().await);
    }
    assert!(
        !socket_tests_required(),
        "[socket-bound-test] cannot bind localhost socket; unset {REQUIRE_ENV} to allow skipping"
    );
    eprintln!("[socket-bound-test] cannot bind localhost socket. Skipping test.");
    None
}

/// Configuration pointed at `server_uri`, rooted in `dir`, with no delays.
#[must_use]
pub fn config_for(server_uri: &str, dir: &Path) -> HarvestConfig {
    let mut config = HarvestConfig::default().without_delays();
    config.search.search_url = format!("{server_uri}/search");
    config.search.origin = format!("{server_uri}/");
    config.search.referer = None;
    config.storage.output_dir = dir.join("output");
    config.storage.download_dir = dir.join("download");
    config.download.show_progress = false;
    config
}

/// Renders a result page in the catalog's markup.
#[must_use]
pub fn results_page(entries: &[(&str, &str)], pages: &[u32], counter: Option<&str>) -> String {
    let mut html = String::from("<html><body><div class=\"results\">");
    if let Some(counter) = counter {
        html.push_str(&format!("<div class=\"results_counter\">{counter}</div>"));
    }
    for (title, href) in entries {
        html.push_str(&format!(
            "<div class=\"results-entry\"><h3 class=\"results-topic\"><a href=\"{href}\">{title}</a></h3>\
             <div class=\"extra-info\"><span>R24-11</span><span>CP</span></div></div>"
        ));
    }
    html.push_str("<ul class=\"pagination\">");
    for page in pages {
        html.push_str(&format!("<li><a href=\"?p={page}\">{page}</a></li>"));
    }
    html.push_str("</ul></div></body></html>");
    html
}

//! Shared HTTP plumbing for platform resolvers.

use crate::error::{ResolveError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use tracklink_core::Platform;

/// Build a browser-like HTTP client.
///
/// # Errors
/// Returns `ResolveError::Setup` if the client cannot be built.
pub fn build_http_client(timeout_secs: u64, user_agent: &str) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .default_headers(headers)
        .build()
        .map_err(|e| ResolveError::Setup(format!("failed to create HTTP client: {e}")))
}

/// GET a page and return its body, classifying every failure.
pub(crate) async fn fetch_page(
    client: &Client,
    platform: Platform,
    url: &str,
    params: &[(&str, &str)],
) -> Result<String> {
    debug!(%platform, url, "Fetching search page");

    let response = client
        .get(url)
        .query(params)
        .send()
        .await
        .map_err(|e| ResolveError::from_reqwest(platform, &e))?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = parse_retry_after(response.headers());
        return Err(ResolveError::from_status(platform, status, retry_after));
    }

    response
        .text()
        .await
        .map_err(|e| ResolveError::from_reqwest(platform, &e))
}

/// Read a `Retry-After` header given in seconds.
///
/// HTTP-date values are ignored; callers fall back to their own backoff.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

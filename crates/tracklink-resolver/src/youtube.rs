//! YouTube resolver.
//!
//! Scrapes the public search results page: the results are embedded as a
//! JSON blob assigned to `ytInitialData`, and the first plausible `videoId`
//! found in it is taken as the match.

use crate::error::{ResolveError, Result};
use crate::http::{build_http_client, fetch_page};
use crate::normalize::search_variants;
use crate::resolver::{LinkResolver, Resolution};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, info};
use tracklink_core::{Link, Platform, Query, ResolverConfig};
use url::Url;

/// Nesting limit for the `videoId` walk.
const MAX_SEARCH_DEPTH: usize = 10;

fn initial_data_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r#"(?:var\s+ytInitialData|window\["ytInitialData"\])\s*=\s*"#)
            .expect("valid regex")
    })
}

fn video_id_pattern() -> &'static Regex {
    static VIDEO_ID: OnceLock<Regex> = OnceLock::new();
    VIDEO_ID.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid regex"))
}

/// Resolves queries to `https://www.youtube.com/watch?v=<id>` links.
pub struct YouTubeResolver {
    client: Client,
    base_url: Url,
    max_variants: usize,
}

impl YouTubeResolver {
    /// Create a resolver from settings.
    ///
    /// # Errors
    /// Returns `ResolveError::Setup` for an invalid base URL or HTTP client failure.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = build_http_client(config.timeout_secs, &config.user_agent)?;
        Self::with_client(client, &config.youtube_base_url, config.max_variants)
    }

    /// Create a resolver around an existing client.
    pub fn with_client(client: Client, base_url: &str, max_variants: usize) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ResolveError::Setup(format!("invalid YouTube base URL '{base_url}': {e}")))?;
        Ok(Self {
            client,
            base_url,
            max_variants: max_variants.max(1),
        })
    }

    async fn search(&self, term: &str) -> Result<Option<String>> {
        let url = self
            .base_url
            .join("/results")
            .map_err(|e| ResolveError::Setup(e.to_string()))?;
        let html = fetch_page(
            &self.client,
            Platform::YouTube,
            url.as_str(),
            &[("search_query", term), ("hl", "en"), ("gl", "US")],
        )
        .await?;

        Ok(extract_initial_data(&html)
            .and_then(|data| find_video_id(&data, MAX_SEARCH_DEPTH))
            .map(|id| watch_url(&id)))
    }
}

#[async_trait]
impl LinkResolver for YouTubeResolver {
    async fn resolve(&self, query: &Query) -> Result<Resolution> {
        for term in search_variants(&query.track_name, &query.artist_name, self.max_variants) {
            if let Some(url) = self.search(&term).await? {
                info!(row = query.row_index, %url, "Found on YouTube");
                return Ok(Resolution::Found(Link::new(Platform::YouTube, url)));
            }
            debug!(row = query.row_index, term, "No YouTube result for variant");
        }
        Ok(Resolution::NotFound)
    }

    fn name(&self) -> &str {
        "youtube"
    }
}

/// Canonical watch URL for a video id.
#[must_use]
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Whether a string looks like a YouTube video id.
#[must_use]
pub fn is_valid_video_id(id: &str) -> bool {
    video_id_pattern().is_match(id)
}

/// Whether a URL is a canonical watch link with a valid id.
#[must_use]
pub fn is_valid_watch_url(url: &str) -> bool {
    url.strip_prefix("https://www.youtube.com/watch?v=")
        .is_some_and(is_valid_video_id)
}

/// Pull the `ytInitialData` JSON object out of a results page.
///
/// Parses exactly one JSON value starting at the assignment, so trailing
/// script text does not matter.
#[must_use]
pub fn extract_initial_data(html: &str) -> Option<Value> {
    let marker = initial_data_marker().find(html)?;
    let rest = &html[marker.end()..];
    let start = rest.find('{')?;
    serde_json::Deserializer::from_str(&rest[start..])
        .into_iter::<Value>()
        .next()?
        .ok()
}

/// Depth-limited walk for the first valid `videoId`, in document order.
#[must_use]
pub fn find_video_id(value: &Value, max_depth: usize) -> Option<String> {
    if max_depth == 0 {
        return None;
    }

    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("videoId") {
                if is_valid_video_id(id) {
                    return Some(id.clone());
                }
            }
            map.values().find_map(|v| find_video_id(v, max_depth - 1))
        }
        Value::Array(items) => items.iter().find_map(|v| find_video_id(v, max_depth - 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_initial_data() {
        let html = r#"<html><script>var ytInitialData = {"contents":{"videoId":"dQw4w9WgXcQ"}};
            var other = {"x": 1};</script></html>"#;
        let data = extract_initial_data(html).expect("initial data");
        assert_eq!(data["contents"]["videoId"], "dQw4w9WgXcQ");
    }

    #[test]
    fn test_extract_initial_data_window_form() {
        let html = r#"<script>window["ytInitialData"] = {"a": [1, 2]};</script>"#;
        let data = extract_initial_data(html).expect("initial data");
        assert_eq!(data["a"][1], 2);
    }

    #[test]
    fn test_extract_initial_data_missing() {
        assert!(extract_initial_data("<html>no data</html>").is_none());
        assert!(extract_initial_data("var ytInitialData = {broken").is_none());
    }

    #[test]
    fn test_find_video_id_in_document_order() {
        let data = json!({
            "header": {"title": "results"},
            "contents": [
                {"adSlot": {"videoId": "short"}},
                {"videoRenderer": {"videoId": "yKNxeF4KMsY", "title": "Clocks"}},
                {"videoRenderer": {"videoId": "d020hcWA_Wg"}}
            ]
        });
        assert_eq!(find_video_id(&data, MAX_SEARCH_DEPTH).as_deref(), Some("yKNxeF4KMsY"));
    }

    #[test]
    fn test_find_video_id_depth_limit() {
        let mut data = json!({"videoId": "yKNxeF4KMsY"});
        for _ in 0..12 {
            data = json!({ "nested": data });
        }
        assert!(find_video_id(&data, MAX_SEARCH_DEPTH).is_none());
    }

    #[test]
    fn test_video_id_validation() {
        assert!(is_valid_video_id("dQw4w9WgXcQ"));
        assert!(is_valid_video_id("a-b_c-d_e-f"));
        assert!(!is_valid_video_id("too_short"));
        assert!(!is_valid_video_id("has space!!"));
        assert!(is_valid_watch_url(&watch_url("dQw4w9WgXcQ")));
        assert!(!is_valid_watch_url("https://youtu.be/dQw4w9WgXcQ"));
    }

    #[test]
    fn test_invalid_base_url() {
        let client = Client::new();
        assert!(matches!(
            YouTubeResolver::with_client(client, "not a url", 3),
            Err(ResolveError::Setup(_))
        ));
    }
}

//! 4shared resolver.
//!
//! Scrapes the public search page, collects anchors that look like audio
//! files, scores them against the query and keeps the best one.

use crate::error::{ResolveError, Result};
use crate::http::{build_http_client, fetch_page};
use crate::normalize::{normalize_text, search_variants};
use crate::resolver::{LinkResolver, Resolution};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use tracklink_core::{Link, Platform, Query, ResolverConfig};
use url::Url;

/// Result containers, tried in order; the first that matches anything wins.
const ITEM_SELECTORS: &[&str] = &[
    "div.searchItemContainer",
    "div.searchItem",
    "div.item",
    ".search-item",
    ".file-item",
    "tr.searchItem",
];

/// Preferred anchors inside a result container.
const LINK_SELECTORS: &[&str] = &[
    r#"a[href*="/file/"]"#,
    r#"a[href*="/audio/"]"#,
    r#"a[href*="/get/"]"#,
    r#"a[href*="/download/"]"#,
    "a.fileName",
    "a.fileLink",
];

const AUDIO_HREF_PATTERNS: &[&str] = &[
    "/file/", "/audio/", "/get/", "/download/", ".mp3", ".m4a", ".wav", ".flac",
];
const AUDIO_TEXT_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".wav", ".flac", ".aac", ".ogg"];
const NON_AUDIO_HREF_PATTERNS: &[&str] = &[
    "/folder/", "/album/", "/playlist/", "javascript:", "mailto:", "#",
];
const SCORED_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".wav", ".flac", ".aac"];
const PENALIZED_TERMS: &[&str] = &["remix", "karaoke", "instrumental", "cover", "live"];

/// A scored link found on a search page.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Link target as found in the page
    pub href: String,
    /// Anchor text
    pub title: String,
    /// Match score, never negative
    pub relevance: f64,
}

/// Resolves queries to 4shared file links.
pub struct FourSharedResolver {
    client: Client,
    base_url: Url,
    max_variants: usize,
}

impl FourSharedResolver {
    /// Create a resolver from settings.
    ///
    /// # Errors
    /// Returns `ResolveError::Setup` for an invalid base URL or HTTP client failure.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = build_http_client(config.timeout_secs, &config.user_agent)?;
        Self::with_client(client, &config.fourshared_base_url, config.max_variants)
    }

    /// Create a resolver around an existing client.
    pub fn with_client(client: Client, base_url: &str, max_variants: usize) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ResolveError::Setup(format!("invalid 4shared base URL '{base_url}': {e}"))
        })?;
        Ok(Self {
            client,
            base_url,
            max_variants: max_variants.max(1),
        })
    }

    async fn search(&self, term: &str, query: &Query) -> Result<Option<String>> {
        let url = self
            .base_url
            .join("/web/q")
            .map_err(|e| ResolveError::Setup(e.to_string()))?;
        let html = fetch_page(&self.client, Platform::FourShared, url.as_str(), &[("query", term)])
            .await?;

        let candidates = find_candidates(&html, &query.track_name, &query.artist_name);
        debug!(term, count = candidates.len(), "Scored 4shared candidates");

        Ok(best_candidate(&candidates).and_then(|c| absolute_url(&self.base_url, &c.href)))
    }
}

#[async_trait]
impl LinkResolver for FourSharedResolver {
    async fn resolve(&self, query: &Query) -> Result<Resolution> {
        for term in search_variants(&query.track_name, &query.artist_name, self.max_variants) {
            if let Some(url) = self.search(&term, query).await? {
                info!(row = query.row_index, %url, "Found on 4shared");
                return Ok(Resolution::Found(Link::new(Platform::FourShared, url)));
            }
        }
        Ok(Resolution::NotFound)
    }

    fn name(&self) -> &str {
        "4shared"
    }
}

fn anchor_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

fn candidate_from(anchor: &ElementRef<'_>, track: &str, artist: &str) -> Option<Candidate> {
    let href = anchor.value().attr("href")?;
    let title = anchor_text(anchor);
    looks_like_audio_link(href, &title).then(|| Candidate {
        href: href.to_string(),
        relevance: relevance(&title, track, artist),
        title,
    })
}

fn candidate_in_item(item: &ElementRef<'_>, track: &str, artist: &str) -> Option<Candidate> {
    let preferred = LINK_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .filter_map(|selector| item.select(&selector).next())
        .find_map(|anchor| candidate_from(&anchor, track, artist));
    if preferred.is_some() {
        return preferred;
    }

    let anchors = Selector::parse("a[href]").ok()?;
    item.select(&anchors)
        .find_map(|anchor| candidate_from(&anchor, track, artist))
}

/// Collect audio-looking links from a search results page.
///
/// Result containers are tried first (one link per container); when none
/// yield anything, every anchor in the document is considered.
#[must_use]
pub fn find_candidates(html: &str, track: &str, artist: &str) -> Vec<Candidate> {
    let document = Html::parse_document(html);

    let mut candidates = Vec::new();
    for selector in ITEM_SELECTORS.iter().filter_map(|s| Selector::parse(s).ok()) {
        let items: Vec<ElementRef<'_>> = document.select(&selector).collect();
        if items.is_empty() {
            continue;
        }
        candidates.extend(
            items
                .iter()
                .filter_map(|item| candidate_in_item(item, track, artist)),
        );
        break;
    }

    if candidates.is_empty() {
        if let Ok(anchors) = Selector::parse("a[href]") {
            candidates.extend(
                document
                    .select(&anchors)
                    .filter_map(|anchor| candidate_from(&anchor, track, artist)),
            );
        }
    }

    candidates
}

/// Highest-scoring candidate; ties go to the earliest in page order.
#[must_use]
pub fn best_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().fold(None, |best: Option<&Candidate>, c| match best {
        Some(b) if b.relevance >= c.relevance => Some(b),
        _ => Some(c),
    })
}

/// Heuristic filter for anchors that point at audio files.
#[must_use]
pub fn looks_like_audio_link(href: &str, text: &str) -> bool {
    if href.is_empty() {
        return false;
    }

    let href = href.to_lowercase();
    if AUDIO_HREF_PATTERNS.iter().any(|p| href.contains(p)) {
        return true;
    }

    let text_lower = text.to_lowercase();
    if AUDIO_TEXT_EXTENSIONS.iter().any(|ext| text_lower.contains(ext)) {
        return true;
    }

    if NON_AUDIO_HREF_PATTERNS.iter().any(|p| href.contains(p)) {
        return false;
    }

    text.trim().chars().count() > 3
}

/// Score how well an anchor title matches the query.
#[must_use]
pub fn relevance(title: &str, track: &str, artist: &str) -> f64 {
    if title.is_empty() {
        return 0.0;
    }

    let title = normalize_text(title);
    let track = normalize_text(track);
    let artist = normalize_text(artist);

    let mut score = 0.0;
    if !track.is_empty() && title.contains(&track) {
        score += 0.5;
    }
    if !artist.is_empty() && title.contains(&artist) {
        score += 0.3;
    }
    if SCORED_EXTENSIONS.iter().any(|ext| title.contains(ext)) {
        score += 0.2;
    }
    for term in PENALIZED_TERMS {
        if title.contains(term) {
            score -= 0.1;
        }
    }

    f64::max(0.0, score)
}

/// Make a page-relative link absolute against the site root.
#[must_use]
pub fn absolute_url(base: &Url, href: &str) -> Option<String> {
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    base.join(href).ok().map(String::from)
}

//! Query cleanup and search variant generation.

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Trailing qualifiers that narrow a search too much; everything from the
/// first occurrence onward is dropped from the track title.
const NOISE_TERMS: &[&str] = &[
    "feat",
    "featuring",
    "ft",
    "remix",
    "edit",
    "mix",
    "version",
    "remaster",
    "remastered",
    "radio edit",
    "extended",
    "club mix",
    "acoustic",
    "live",
    "demo",
    "instrumental",
    "karaoke",
];

fn bracketed() -> &'static Regex {
    static BRACKETED: OnceLock<Regex> = OnceLock::new();
    BRACKETED.get_or_init(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("valid regex"))
}

fn noise_suffix() -> &'static Regex {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    NOISE.get_or_init(|| {
        let alternatives: Vec<String> = NOISE_TERMS.iter().map(|t| regex::escape(t)).collect();
        Regex::new(&format!(r"(?i)\b(?:{})\b.*", alternatives.join("|"))).expect("valid regex")
    })
}

fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Strip accents, lowercase and trim.
///
/// ```
/// use tracklink_resolver::normalize_text;
/// assert_eq!(normalize_text("  Canção  "), "cancao");
/// ```
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

fn collapse_whitespace(text: &str) -> String {
    whitespace().replace_all(text, " ").trim().to_string()
}

/// Build the primary search string for a track/artist pair.
///
/// Bracketed segments are removed from both fields, the track is cut at the
/// first noise term, and the result is normalized. Returns an empty string
/// when either input is empty.
#[must_use]
pub fn clean_query(track_name: &str, artist_name: &str) -> String {
    if track_name.trim().is_empty() || artist_name.trim().is_empty() {
        return String::new();
    }

    let track = bracketed().replace_all(track_name.trim(), "");
    let track = noise_suffix().replace(&track, "");
    let artist = bracketed().replace_all(artist_name.trim(), "");

    let track = normalize_text(&collapse_whitespace(&track));
    let artist = normalize_text(&collapse_whitespace(&artist));

    format!("{track} {artist}").trim().to_string()
}

/// Ordered, de-duplicated search strings to try for one query.
#[must_use]
pub fn search_variants(track_name: &str, artist_name: &str, max: usize) -> Vec<String> {
    let mut candidates = Vec::with_capacity(3);
    candidates.push(clean_query(track_name, artist_name));

    let track = normalize_text(track_name);
    let artist = normalize_text(artist_name);
    if !track.is_empty() && !artist.is_empty() {
        candidates.push(format!("{artist} {track}"));
    }
    if track.chars().count() > 3 {
        candidates.push(track);
    }

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants.truncate(max);
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents() {
        assert_eq!(normalize_text("Águas de Março"), "aguas de marco");
        assert_eq!(normalize_text("BEYONCÉ"), "beyonce");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_clean_query_removes_brackets_and_noise() {
        assert_eq!(
            clean_query("Clocks (Live in Sydney) [2003]", "Coldplay"),
            "clocks coldplay"
        );
        assert_eq!(
            clean_query("Get Lucky feat. Pharrell Williams", "Daft Punk"),
            "get lucky daft punk"
        );
        assert_eq!(
            clean_query("Blue Monday - Radio Edit", "New Order (UK)"),
            "blue monday - new order"
        );
    }

    #[test]
    fn test_noise_terms_match_whole_words_only() {
        // "mixtape" and "edition" must survive; "live" inside "oliver" too
        assert_eq!(clean_query("Mixtape Oliver", "Band"), "mixtape oliver band");
        assert_eq!(clean_query("First Edition", "Band"), "first edition band");
    }

    #[test]
    fn test_clean_query_empty_inputs() {
        assert_eq!(clean_query("", "Artist"), "");
        assert_eq!(clean_query("Track", "   "), "");
    }

    #[test]
    fn test_search_variants_order_and_dedup() {
        let variants = search_variants("Clocks (Remastered)", "Coldplay", 3);
        assert_eq!(
            variants,
            vec![
                "clocks coldplay".to_string(),
                "coldplay clocks (remastered)".to_string(),
                "clocks (remastered)".to_string(),
            ]
        );

        // short track title is not searched alone
        let variants = search_variants("Yes", "Yes", 3);
        assert_eq!(variants, vec!["yes yes".to_string()]);
    }

    #[test]
    fn test_search_variants_respects_max() {
        let variants = search_variants("Garota de Ipanema", "Tom Jobim", 1);
        assert_eq!(variants, vec!["garota de ipanema tom jobim".to_string()]);
    }
}

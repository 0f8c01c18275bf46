//! Recognized header schemas.

use serde::{Deserialize, Serialize};

/// Header layout of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderSchema {
    /// Exportify playlist export: `Track Name`, `Artist Name(s)`
    Exportify,
    /// Portuguese hand-written sheet: `Música`, `Artista`
    Manual,
}

/// Column positions of the two required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    /// Detected schema
    pub schema: HeaderSchema,
    /// Index of the track column
    pub track: usize,
    /// Index of the artist column
    pub artist: usize,
}

impl HeaderSchema {
    /// Schemas in detection order.
    pub const ALL: [HeaderSchema; 2] = [HeaderSchema::Exportify, HeaderSchema::Manual];

    /// Header label of the track column.
    #[must_use]
    pub fn track_header(&self) -> &'static str {
        match self {
            Self::Exportify => "Track Name",
            Self::Manual => "Música",
        }
    }

    /// Header label of the artist column.
    #[must_use]
    pub fn artist_header(&self) -> &'static str {
        match self {
            Self::Exportify => "Artist Name(s)",
            Self::Manual => "Artista",
        }
    }

    /// Find the first schema whose two columns are both present.
    #[must_use]
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Option<ColumnMap> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| normalize_header(h.as_ref()))
            .collect();
        let position = |label: &str| {
            let wanted = normalize_header(label);
            normalized.iter().position(|h| *h == wanted)
        };

        Self::ALL.into_iter().find_map(|schema| {
            Some(ColumnMap {
                schema,
                track: position(schema.track_header())?,
                artist: position(schema.artist_header())?,
            })
        })
    }
}

/// Trim, drop a UTF-8 byte order mark, and lowercase.
fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_exportify_among_other_columns() {
        let headers = ["Spotify ID", "Artist Name(s)", "Album Name", "Track Name"];
        let map = HeaderSchema::detect(&headers).expect("exportify headers");
        assert_eq!(map.schema, HeaderSchema::Exportify);
        assert_eq!(map.track, 3);
        assert_eq!(map.artist, 1);
    }

    #[test]
    fn test_detect_is_case_insensitive() {
        let headers = ["MÚSICA", " artista "];
        let map = HeaderSchema::detect(&headers).expect("manual headers");
        assert_eq!(map.schema, HeaderSchema::Manual);
        assert_eq!((map.track, map.artist), (0, 1));
    }

    #[test]
    fn test_detect_strips_bom() {
        let headers = ["\u{feff}Track Name", "Artist Name(s)"];
        assert!(HeaderSchema::detect(&headers).is_some());
    }

    #[test]
    fn test_detect_requires_both_columns() {
        assert!(HeaderSchema::detect(&["Track Name", "Artista"]).is_none());
        assert!(HeaderSchema::detect(&["Song", "Artist"]).is_none());
        assert!(HeaderSchema::detect::<&str>(&[]).is_none());
    }
}

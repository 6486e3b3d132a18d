//! Search success: can the recommended track be found in a real catalog?
//!
//! The catalog lookup itself lives in the runtime; this module decides
//! whether a lookup is worth attempting and which queries to send.

use serde::{Deserialize, Serialize};

use crate::payload::ParseResult;

/// Artist and title of a track to verify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackQuery {
    pub title: String,
    pub artist: String,
}

impl TrackQuery {
    /// Build a query from a parsed payload.
    ///
    /// `None` for malformed payloads, blank artist or title, and titles
    /// containing "unknown" in any case. Those can never score.
    pub fn from_parsed(parsed: &ParseResult) -> Option<Self> {
        let first = parsed.first()?;
        Self::new(first.track_title()?, first.artist_name()?)
    }

    pub fn new(title: &str, artist: &str) -> Option<Self> {
        let (title, artist) = (title.trim(), artist.trim());
        if title.is_empty() || artist.is_empty() || title.to_lowercase().contains("unknown") {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            artist: artist.to_string(),
        })
    }

    /// Field-qualified query, tried first.
    pub fn strict(&self) -> String {
        format!("track:{} artist:{}", self.title, self.artist)
    }

    /// Free-text query, tried only when the strict one finds nothing.
    pub fn loose(&self) -> String {
        format!("{} {}", self.title, self.artist)
    }

    /// Queries in the order they should be sent.
    pub fn queries(&self) -> [String; 2] {
        [self.strict(), self.loose()]
    }
}

/// Outcome of verifying one recommendation against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchVerdict {
    /// Payload malformed or track blank/unknown; nothing was looked up.
    NotSearchable,
    /// No catalog configured; valid tracks pass.
    CatalogUnavailable,
    /// A query returned a hit.
    Found { query: String },
    /// Both queries came back empty.
    NotFound,
    /// The lookup itself failed.
    LookupFailed { error: String },
}

impl SearchVerdict {
    pub fn score(&self) -> u8 {
        match self {
            SearchVerdict::Found { .. } | SearchVerdict::CatalogUnavailable => 1,
            SearchVerdict::NotSearchable
            | SearchVerdict::NotFound
            | SearchVerdict::LookupFailed { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_query_shapes() {
        let query = TrackQuery::new("Nuvole Bianche", "Ludovico Einaudi").unwrap();
        assert_eq!(query.strict(), "track:Nuvole Bianche artist:Ludovico Einaudi");
        assert_eq!(query.loose(), "Nuvole Bianche Ludovico Einaudi");
        assert_eq!(query.queries()[0], query.strict());
    }

    #[test]
    fn test_unsearchable_titles() {
        assert!(TrackQuery::new("", "Artist").is_none());
        assert!(TrackQuery::new("Song", "  ").is_none());
        assert!(TrackQuery::new("Unknown Track", "Artist").is_none());
        assert!(TrackQuery::new("The UNKNOWN", "Artist").is_none());
    }

    #[test]
    fn test_from_malformed_payload() {
        assert!(TrackQuery::from_parsed(&ParseResult::parse("{}")).is_none());
    }

    #[test]
    fn test_verdict_scores() {
        assert_eq!(SearchVerdict::CatalogUnavailable.score(), 1);
        assert_eq!(SearchVerdict::Found { query: "q".into() }.score(), 1);
        assert_eq!(SearchVerdict::NotFound.score(), 0);
        assert_eq!(SearchVerdict::LookupFailed { error: "boom".into() }.score(), 0);
    }

    proptest! {
        #[test]
        fn unknown_titles_never_searchable(
            prefix in "[a-zA-Z ]{0,8}",
            unknown in "(?i)unknown",
            suffix in "[a-zA-Z ]{0,8}",
            artist in "[a-zA-Z]{1,10}",
        ) {
            let title = format!("{prefix}{unknown}{suffix}");
            prop_assert!(TrackQuery::new(&title, &artist).is_none());
        }

        #[test]
        fn blank_titles_never_searchable(title in "[ \t]{0,4}", artist in "[a-zA-Z]{1,10}") {
            prop_assert!(TrackQuery::new(&title, &artist).is_none());
        }
    }
}

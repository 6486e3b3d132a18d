//! Request-side types: the flat caller record and the normalized context
//! and preference records derived from it.

use serde::{Deserialize, Serialize};

/// Location used when the caller supplies none.
pub const DEFAULT_LOCATION: &str = "home";

/// Noise level used when the caller supplies none.
pub const DEFAULT_NOISE_LEVEL: &str = "moderate";

/// Goal used when the caller supplies none.
pub const DEFAULT_GOAL: &str = "neutral";

/// Stand-in clock value. Not derived from wall time.
pub const FIXED_CURRENT_TIME: &str = "14:00";

/// Where the listener is and what they are trying to do.
///
/// All fields are lower-cased at construction and never change for the
/// lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub location: String,
    pub noise_level: String,
    pub goal: String,
    pub current_time: String,
}

impl Default for ContextRecord {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            noise_level: DEFAULT_NOISE_LEVEL.to_string(),
            goal: DEFAULT_GOAL.to_string(),
            current_time: FIXED_CURRENT_TIME.to_string(),
        }
    }
}

/// Listener taste. Both lists are empty when the caller has no preference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    #[serde(default)]
    pub preferred_genres: Vec<String>,

    #[serde(default)]
    pub preferred_artists: Vec<String>,
}

impl PreferenceRecord {
    /// True when neither genres nor artists were given.
    pub fn is_empty(&self) -> bool {
        self.preferred_genres.is_empty() && self.preferred_artists.is_empty()
    }
}

/// An artist preference as callers send it: a single name or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtistInput {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for ArtistInput {
    fn from(value: &str) -> Self {
        ArtistInput::One(value.to_string())
    }
}

impl From<String> for ArtistInput {
    fn from(value: String) -> Self {
        ArtistInput::One(value)
    }
}

impl From<Vec<String>> for ArtistInput {
    fn from(value: Vec<String>) -> Self {
        ArtistInput::Many(value)
    }
}

/// Flat input record accepted by the recommendation bridge.
///
/// Every field is optional. Missing context fields fall back to
/// [`DEFAULT_LOCATION`], [`DEFAULT_NOISE_LEVEL`] and [`DEFAULT_GOAL`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeInput {
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub decibel: Option<String>,

    #[serde(default)]
    pub goal: Option<String>,

    #[serde(default)]
    pub user_pref: Option<String>,

    #[serde(default)]
    pub user_artist: Option<ArtistInput>,
}

impl BridgeInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn decibel(mut self, decibel: impl Into<String>) -> Self {
        self.decibel = Some(decibel.into());
        self
    }

    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn user_pref(mut self, genre: impl Into<String>) -> Self {
        self.user_pref = Some(genre.into());
        self
    }

    pub fn user_artist(mut self, artist: impl Into<ArtistInput>) -> Self {
        self.user_artist = Some(artist.into());
        self
    }

    /// Build the normalized context record.
    pub fn context(&self) -> ContextRecord {
        ContextRecord {
            location: normalized_or(self.location.as_deref(), DEFAULT_LOCATION),
            noise_level: normalized_or(self.decibel.as_deref(), DEFAULT_NOISE_LEVEL),
            goal: normalized_or(self.goal.as_deref(), DEFAULT_GOAL),
            current_time: FIXED_CURRENT_TIME.to_string(),
        }
    }

    /// Build the preference record.
    ///
    /// Absent, blank and `None`/`none` values become empty lists rather than a
    /// list holding the sentinel. Genres are lower-cased; artist names keep
    /// their casing.
    pub fn preference(&self) -> PreferenceRecord {
        let preferred_genres = self
            .user_pref
            .as_deref()
            .filter(|genre| !is_absent(genre))
            .map(|genre| vec![genre.trim().to_lowercase()])
            .unwrap_or_default();

        let preferred_artists = match &self.user_artist {
            Some(ArtistInput::One(artist)) if !is_absent(artist) => vec![artist.trim().to_string()],
            Some(ArtistInput::Many(artists)) => artists
                .iter()
                .filter(|artist| !is_absent(artist))
                .map(|artist| artist.trim().to_string())
                .collect(),
            _ => Vec::new(),
        };

        PreferenceRecord {
            preferred_genres,
            preferred_artists,
        }
    }
}

/// Blank, `None` and `none` all mean "no value" in caller records.
pub fn is_absent(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "None" || value == "none"
}

fn normalized_or(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_lowercase(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let input = BridgeInput::new();
        let context = input.context();
        assert_eq!(context.location, "home");
        assert_eq!(context.noise_level, "moderate");
        assert_eq!(context.goal, "neutral");
        assert_eq!(context.current_time, FIXED_CURRENT_TIME);
        assert!(input.preference().is_empty());
    }

    #[test]
    fn test_context_is_lower_cased() {
        let input = BridgeInput::new()
            .location("Library")
            .decibel("SILENT")
            .goal("Focus");
        let context = input.context();
        assert_eq!(context.location, "library");
        assert_eq!(context.noise_level, "silent");
        assert_eq!(context.goal, "focus");
    }

    #[test]
    fn test_none_sentinel_becomes_empty_list() {
        let input = BridgeInput::new().user_pref("None").user_artist("none");
        let preference = input.preference();
        assert!(preference.preferred_genres.is_empty());
        assert!(preference.preferred_artists.is_empty());
    }

    #[test]
    fn test_preference_values_wrapped_in_lists() {
        let input = BridgeInput::new()
            .user_pref("Heavy Metal")
            .user_artist("Metallica");
        let preference = input.preference();
        assert_eq!(preference.preferred_genres, vec!["heavy metal"]);
        assert_eq!(preference.preferred_artists, vec!["Metallica"]);
    }

    #[test]
    fn test_artist_sequence_kept() {
        let input = BridgeInput::new().user_artist(vec![
            "IU".to_string(),
            "None".to_string(),
            "Radiohead".to_string(),
        ]);
        assert_eq!(input.preference().preferred_artists, vec!["IU", "Radiohead"]);
    }

    #[test]
    fn test_deserialize_flat_record() {
        let input: BridgeInput = serde_json::from_str(
            r#"{"location": "gym", "user_artist": ["A", "B"], "goal": "active"}"#,
        )
        .unwrap();
        assert_eq!(input.context().location, "gym");
        assert_eq!(input.context().noise_level, "moderate");
        assert_eq!(input.preference().preferred_artists.len(), 2);
    }
}

//! Fixed recommendation taxonomy and primary tag parsing.
//!
//! The taxonomy is shared between the prompts that ask the model for a
//! recommendation and the harness that inspects what came back.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// `goal_genre_vibe`. The genre segment may contain hyphens (`k-pop`, `lo-fi`).
    static ref PRIMARY_TAG_PATTERN: Regex =
        Regex::new(r"^([a-z]+)_([a-z0-9]+(?:-[a-z0-9]+)*)_([a-z]+)$").unwrap();
}

/// Places a listener can be.
pub const LOCATIONS: [&str; 7] = [
    "cafe",
    "library",
    "co-working",
    "moving",
    "gym",
    "home",
    "park",
];

/// Listener goals. The goal is also the primary tag prefix.
pub const GOALS: [&str; 7] = [
    "focus",
    "relax",
    "sleep",
    "active",
    "anger",
    "consolation",
    "neutral",
];

/// Genres allowed in the middle segment of a primary tag.
pub const GENRES: [&str; 17] = [
    "pop",
    "k-pop",
    "rock",
    "hip-hop",
    "r-nb",
    "jazz",
    "indie",
    "folk",
    "electronic",
    "classical",
    "ballad",
    "acoustic",
    "soundtrack",
    "ambient",
    "lo-fi",
    "new-age",
    "piano",
];

/// Vibes allowed in the last segment of a primary tag.
pub const VIBES: [&str; 6] = [
    "calm",
    "groovy",
    "intense",
    "dreamy",
    "uplifting",
    "melancholy",
];

/// How strict a location is about lyrics and energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationClass {
    /// Library, co-working: no distracting vocals.
    Strict,
    /// Cafe, home, park: humming and light vocals are fine.
    Casual,
    /// Gym, moving: rhythm is required.
    Active,
}

impl LocationClass {
    pub fn of(location: &str) -> Option<Self> {
        match location {
            "library" | "co-working" => Some(Self::Strict),
            "cafe" | "home" | "park" => Some(Self::Casual),
            "gym" | "moving" => Some(Self::Active),
            _ => None,
        }
    }

    /// Vibes that suit this class of location.
    pub fn vibes(&self) -> &'static [&'static str] {
        match self {
            Self::Strict => &["calm", "melancholy"],
            Self::Casual => &["groovy", "uplifting", "dreamy"],
            Self::Active => &["intense", "groovy"],
        }
    }
}

/// Genres the prompt steers toward for a goal.
pub fn genres_for_goal(goal: &str) -> &'static [&'static str] {
    match goal {
        "focus" | "sleep" => &["classical", "ambient", "lo-fi", "piano", "soundtrack", "new-age"],
        "relax" | "consolation" => &["acoustic", "ballad", "r-nb", "jazz", "indie", "folk"],
        "active" | "anger" => &["pop", "k-pop", "rock", "hip-hop", "electronic"],
        _ => &[],
    }
}

/// True when `value` is one of the known goals.
pub fn is_known_goal(value: &str) -> bool {
    GOALS.contains(&value)
}

/// True when `value` is one of the known locations.
pub fn is_known_location(value: &str) -> bool {
    LOCATIONS.contains(&value)
}

/// A parsed `goal_genre_vibe` label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryTag {
    pub goal: String,
    pub genre: String,
    pub vibe: String,
}

impl PrimaryTag {
    /// Parse a tag. Case is ignored; surrounding whitespace is trimmed.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        let captures = PRIMARY_TAG_PATTERN.captures(&normalized)?;
        Some(Self {
            goal: captures[1].to_string(),
            genre: captures[2].to_string(),
            vibe: captures[3].to_string(),
        })
    }

    /// Whether the tag prefix equals the requested goal.
    pub fn matches_goal(&self, goal: &str) -> bool {
        self.goal == goal.trim().to_lowercase()
    }

    /// Whether genre and vibe come from the fixed option lists.
    pub fn is_in_taxonomy(&self) -> bool {
        GENRES.contains(&self.genre.as_str()) && VIBES.contains(&self.vibe.as_str())
    }
}

impl std::fmt::Display for PrimaryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.goal, self.genre, self.vibe)
    }
}

//! Recommendation payload parsing.
//!
//! The runtime treats the recommender's output as an opaque string. This
//! module turns that string into a [`ParseResult`]: either a non-empty list
//! of well-shaped records or the raw text together with the reason it was
//! rejected. Scorers match on the result instead of probing JSON keys.

mod extract;
mod recommendation;

pub use extract::{
    extract_json_array, extract_json_object, slice_delimited, strip_code_fences, ExtractError,
};
pub use recommendation::{
    AudioFeatures, Recommendation, RecommendationMeta, TrackInfo, REQUIRED_KEYS,
};

use serde_json::Value;
use thiserror::Error;

/// Label used wherever a malformed payload needs a track name.
pub const PARSING_FAILED: &str = "Parsing Failed";

/// Why a payload was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedReason {
    #[error("{0}")]
    Unparseable(#[from] ExtractError),

    #[error("payload is not a list")]
    NotAList,

    #[error("payload list is empty")]
    EmptyList,

    #[error("first record is missing keys: {}", .0.join(", "))]
    MissingKeys(Vec<&'static str>),
}

/// A payload that could not be used, kept verbatim for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedPayload {
    pub raw: String,
    pub reason: MalformedReason,
}

/// A non-empty list whose first record carries every required key.
///
/// Only the first record is validated; the rest are kept in `value` as sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationList {
    first: Recommendation,
    len: usize,
    value: Value,
}

impl RecommendationList {
    pub fn first(&self) -> &Recommendation {
        &self.first
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The parsed JSON, exactly as extracted.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Every record in the list that has the required shape.
    pub fn records(&self) -> Vec<Recommendation> {
        self.value
            .as_array()
            .map(|items| items.iter().filter_map(Recommendation::from_value).collect())
            .unwrap_or_default()
    }
}

/// Outcome of parsing a recommender payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    Valid(RecommendationList),
    Malformed(MalformedPayload),
}

impl ParseResult {
    /// Parse raw recommender output. Never fails; rejection is a variant.
    pub fn parse(raw: &str) -> Self {
        let malformed = |reason: MalformedReason| {
            ParseResult::Malformed(MalformedPayload {
                raw: raw.to_string(),
                reason,
            })
        };

        let value = match extract_json_array(raw) {
            Ok(value) => value,
            Err(e) => return malformed(e.into()),
        };

        let Some(items) = value.as_array() else {
            return malformed(MalformedReason::NotAList);
        };
        let Some(head) = items.first() else {
            return malformed(MalformedReason::EmptyList);
        };

        match Recommendation::from_value(head) {
            Some(first) => ParseResult::Valid(RecommendationList {
                first,
                len: items.len(),
                value,
            }),
            None => malformed(MalformedReason::MissingKeys(Recommendation::missing_keys(head))),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ParseResult::Valid(_))
    }

    /// First record of a valid payload.
    pub fn first(&self) -> Option<&Recommendation> {
        match self {
            ParseResult::Valid(list) => Some(list.first()),
            ParseResult::Malformed(_) => None,
        }
    }

    /// Reasoning text of the first record, if any was written.
    pub fn reasoning(&self) -> Option<&str> {
        self.first()
            .map(Recommendation::reasoning)
            .filter(|text| !text.trim().is_empty())
    }

    pub fn primary_tag(&self) -> Option<&str> {
        self.first().and_then(Recommendation::primary_tag)
    }

    /// `"<artist> - <title>"` or [`PARSING_FAILED`].
    pub fn recommended_track_label(&self) -> String {
        match self.first() {
            Some(first) => first.track_label(),
            None => PARSING_FAILED.to_string(),
        }
    }

    /// The extracted JSON for valid payloads, the raw text otherwise.
    pub fn to_display_value(&self) -> Value {
        match self {
            ParseResult::Valid(list) => list.value().clone(),
            ParseResult::Malformed(payload) => Value::String(payload.raw.clone()),
        }
    }
}

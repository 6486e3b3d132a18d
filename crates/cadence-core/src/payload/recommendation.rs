//! Recommendation payload records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level keys every recommendation record must carry.
pub const REQUIRED_KEYS: [&str; 3] = ["recommendation_meta", "track_info", "target_audio_features"];

/// Why a track was picked and how it is labelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationMeta {
    #[serde(default)]
    pub reasoning: String,

    /// `goal_genre_vibe`; `None` when the model left it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_tag: Option<String>,
}

/// The recommended track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_title: Option<String>,
}

/// Audio feature targets. Tempo in BPM, the rest in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    #[serde(default)]
    pub min_tempo: Option<i64>,
    #[serde(default)]
    pub max_tempo: Option<i64>,
    #[serde(default)]
    pub target_energy: Option<f64>,
    #[serde(default)]
    pub target_instrumentalness: Option<f64>,
    #[serde(default)]
    pub target_valence: Option<f64>,
    #[serde(default)]
    pub target_acousticness: Option<f64>,
}

/// One recommendation record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation_meta: RecommendationMeta,
    pub track_info: TrackInfo,
    pub target_audio_features: AudioFeatures,
}

impl Recommendation {
    /// Names of required keys missing from a JSON record.
    pub fn missing_keys(value: &Value) -> Vec<&'static str> {
        match value.as_object() {
            Some(object) => REQUIRED_KEYS
                .iter()
                .copied()
                .filter(|key| !object.contains_key(*key))
                .collect(),
            None => REQUIRED_KEYS.to_vec(),
        }
    }

    /// Build a record from loosely-typed JSON.
    ///
    /// Returns `None` unless all [`REQUIRED_KEYS`] are present. Inside the
    /// sub-records anything goes: scalars are stringified, numeric strings
    /// become numbers and unusable values are dropped, so a record that has
    /// the right shape is never rejected for its field types.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if REQUIRED_KEYS.iter().any(|key| !object.contains_key(*key)) {
            return None;
        }

        let meta = sub_record(object, "recommendation_meta");
        let track = sub_record(object, "track_info");
        let features = sub_record(object, "target_audio_features");

        Some(Self {
            recommendation_meta: RecommendationMeta {
                reasoning: text(meta, "reasoning").unwrap_or_default(),
                primary_tag: text(meta, "primary_tag"),
            },
            track_info: TrackInfo {
                artist_name: text(track, "artist_name"),
                track_title: text(track, "track_title"),
            },
            target_audio_features: AudioFeatures {
                min_tempo: number(features, "min_tempo").map(|n| n.round() as i64),
                max_tempo: number(features, "max_tempo").map(|n| n.round() as i64),
                target_energy: number(features, "target_energy"),
                target_instrumentalness: number(features, "target_instrumentalness"),
                target_valence: number(features, "target_valence"),
                target_acousticness: number(features, "target_acousticness"),
            },
        })
    }

    pub fn reasoning(&self) -> &str {
        &self.recommendation_meta.reasoning
    }

    pub fn primary_tag(&self) -> Option<&str> {
        self.recommendation_meta.primary_tag.as_deref()
    }

    pub fn artist_name(&self) -> Option<&str> {
        self.track_info.artist_name.as_deref()
    }

    pub fn track_title(&self) -> Option<&str> {
        self.track_info.track_title.as_deref()
    }

    /// `"<artist> - <title>"`, with `Unknown` for missing parts.
    pub fn track_label(&self) -> String {
        format!(
            "{} - {}",
            self.artist_name().unwrap_or("Unknown"),
            self.track_title().unwrap_or("Unknown")
        )
    }
}

fn sub_record<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    object.get(key).and_then(Value::as_object)
}

fn text(record: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    match record?.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn number(record: Option<&Map<String, Value>>, key: &str) -> Option<f64> {
    let value = match record?.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

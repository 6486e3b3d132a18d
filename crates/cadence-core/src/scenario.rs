//! Evaluation scenarios loaded from a CSV file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{is_absent, BridgeInput};

const UTF8_BOM: &str = "\u{feff}";

/// Errors from loading scenarios.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenario file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed scenario row: {0}")]
    Csv(#[from] csv::Error),
}

/// One row of the scenario table.
///
/// Headers: `ID, Location, Decibel, Goal, User Pref, User Artist,
/// Evaluation Criteria`. Empty cells deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,

    #[serde(rename = "Location", default)]
    pub location: Option<String>,

    #[serde(rename = "Decibel", default)]
    pub decibel: Option<String>,

    #[serde(rename = "Goal", default)]
    pub goal: Option<String>,

    #[serde(rename = "User Pref", default)]
    pub user_pref: Option<String>,

    #[serde(rename = "User Artist", default)]
    pub user_artist: Option<String>,

    #[serde(rename = "Evaluation Criteria", default)]
    pub evaluation_criteria: String,
}

impl ScenarioRecord {
    /// The flat record sent to the recommender.
    pub fn bridge_input(&self) -> BridgeInput {
        BridgeInput {
            location: self.location.clone(),
            decibel: self.decibel.clone(),
            goal: self.goal.clone(),
            user_pref: self.user_pref.clone(),
            user_artist: self.user_artist.clone().map(Into::into),
        }
    }

    /// The row id, or its position when the row has none.
    pub fn label(&self, idx: usize) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => idx.to_string(),
        }
    }

    /// `<Location>-<Goal>` as written in the file.
    pub fn context_label(&self) -> String {
        format!(
            "{}-{}",
            self.location.as_deref().unwrap_or(""),
            self.goal.as_deref().unwrap_or("")
        )
    }

    /// Short context description handed to the judge.
    pub fn input_summary(&self) -> String {
        let pref = self
            .user_pref
            .as_deref()
            .filter(|pref| !is_absent(pref))
            .unwrap_or("None");
        format!(
            "Location: {}, Goal: {}, Pref: {}",
            self.location.as_deref().unwrap_or(""),
            self.goal.as_deref().unwrap_or(""),
            pref
        )
    }
}

/// Load scenarios from a CSV file.
pub fn load_scenarios(path: impl AsRef<Path>) -> Result<Vec<ScenarioRecord>, ScenarioError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_scenarios(&text)
}

/// Parse scenarios from CSV text. A leading byte-order mark is ignored.
pub fn parse_scenarios(text: &str) -> Result<Vec<ScenarioRecord>, ScenarioError> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut scenarios = Vec::new();
    for row in reader.deserialize::<ScenarioRecord>() {
        scenarios.push(row?);
    }
    tracing::debug!(count = scenarios.len(), "Loaded scenarios");
    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIOS: &str = "\u{feff}ID,Location,Decibel,Goal,User Pref,User Artist,Evaluation Criteria
1,library,silent,focus,Heavy Metal,Metallica,Should resolve the metal preference against a silent library
2,gym,loud,active,None,,High-energy tracks with a strong beat
";

    #[test]
    fn test_parse_with_bom() {
        let scenarios = parse_scenarios(SCENARIOS).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].id.as_deref(), Some("1"));
        assert_eq!(scenarios[0].user_artist.as_deref(), Some("Metallica"));
        assert_eq!(scenarios[1].user_artist, None);
        assert_eq!(scenarios[1].context_label(), "gym-active");
    }

    #[test]
    fn test_bridge_input_drops_none_sentinel() {
        let scenarios = parse_scenarios(SCENARIOS).unwrap();
        let input = scenarios[1].bridge_input();
        assert!(input.preference().is_empty());
        assert_eq!(input.context().goal, "active");
        assert_eq!(scenarios[1].input_summary(), "Location: gym, Goal: active, Pref: None");
    }

    #[test]
    fn test_label_falls_back_to_position() {
        let record = ScenarioRecord::default();
        assert_eq!(record.label(7), "7");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIOS.as_bytes()).unwrap();
        let scenarios = load_scenarios(file.path()).unwrap();
        assert_eq!(scenarios[0].label(0), "1");
    }

    #[test]
    fn test_missing_file() {
        let err = load_scenarios("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, ScenarioError::Io { .. }));
    }
}

//! Deterministic KPI scorers.
//!
//! Each submodule owns one quality dimension. None of them performs I/O:
//! embeddings, judge replies and catalog hits are produced by the runtime
//! and handed in as plain values.

mod accuracy;
mod consistency;
mod diversity;
mod search;
mod stability;

pub use accuracy::{
    cosine_similarity, judged_score, semantic_score, AccuracyScore, AccuracyWeights,
};
pub use consistency::ConsistencyTally;
pub use diversity::{DiversityPool, MISSING_TITLE};
pub use search::{SearchVerdict, TrackQuery};
pub use stability::stability_score;

use serde::{Deserialize, Serialize};

/// The five quality dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kpi {
    Accuracy,
    Stability,
    SearchSuccess,
    Consistency,
    Diversity,
}

impl Kpi {
    pub const ALL: [Kpi; 5] = [
        Kpi::Accuracy,
        Kpi::Stability,
        Kpi::SearchSuccess,
        Kpi::Consistency,
        Kpi::Diversity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Kpi::Accuracy => "Accuracy",
            Kpi::Stability => "Stability",
            Kpi::SearchSuccess => "Search Success",
            Kpi::Consistency => "Consistency",
            Kpi::Diversity => "Diversity",
        }
    }

    /// Whether the KPI is scored per scenario (as opposed to run-wide).
    pub fn is_per_scenario(&self) -> bool {
        !matches!(self, Kpi::Diversity)
    }
}

impl std::fmt::Display for Kpi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kpi_labels() {
        assert_eq!(Kpi::SearchSuccess.to_string(), "Search Success");
        assert!(!Kpi::Diversity.is_per_scenario());
        assert_eq!(Kpi::ALL.iter().filter(|k| k.is_per_scenario()).count(), 4);
    }
}

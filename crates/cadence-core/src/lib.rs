//! # cadence-core
//!
//! Deterministic building blocks of the Cadence music recommender and its
//! evaluation harness.
//!
//! This crate never touches the network. It provides:
//! - Caller input normalization ([`BridgeInput`] into [`ContextRecord`] and
//!   [`PreferenceRecord`])
//! - Lenient parsing of recommender output into a [`ParseResult`]
//! - The KPI scorers (stability, accuracy weighting, consistency, diversity,
//!   search query shaping)
//! - Scenario loading and CSV report writing
//!
//! ## Example
//!
//! ```rust
//! use cadence_core::{metrics::stability_score, ParseResult};
//!
//! let raw = r#"[{"recommendation_meta": {"reasoning": "calm piano"},
//!               "track_info": {"artist_name": "Yiruma", "track_title": "Kiss the Rain"},
//!               "target_audio_features": {}}]"#;
//! let parsed = ParseResult::parse(raw);
//! assert_eq!(stability_score(&parsed), 1);
//! assert_eq!(parsed.recommended_track_label(), "Yiruma - Kiss the Rain");
//! ```

pub mod metrics;
pub mod payload;
pub mod report;
pub mod scenario;
pub mod taxonomy;
pub mod types;

pub use metrics::{
    AccuracyScore, AccuracyWeights, ConsistencyTally, DiversityPool, Kpi, SearchVerdict,
    TrackQuery,
};
pub use payload::{
    MalformedPayload, MalformedReason, ParseResult, Recommendation, RecommendationList,
    PARSING_FAILED,
};
pub use report::{EvaluationReport, KpiSummary, ReportError, ScoreRecord};
pub use scenario::{load_scenarios, parse_scenarios, ScenarioError, ScenarioRecord};
pub use taxonomy::PrimaryTag;
pub use types::{ArtistInput, BridgeInput, ContextRecord, PreferenceRecord};

//! Runtime configuration.
//!
//! Loaded from YAML. Every field has a default, so an empty document is a
//! valid configuration. Durations are human-readable strings such as
//! `"90s"` or `"500ms"`.
//!
//! ```yaml
//! llm:
//!   agent_model: gpt-4o-mini
//!   judge_model: gpt-4o
//! orchestrator:
//!   step_limit: 20
//!   call_timeout: 2m
//! evaluation:
//!   consistency_stride: 5
//! retry:
//!   max_attempts: 3
//! ```

use std::path::Path;
use std::time::Duration;

use cadence_core::AccuracyWeights;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub llm: LlmConfig,
    pub orchestrator: OrchestratorConfig,
    pub evaluation: EvaluationConfig,
    pub retry: RetryPolicy,
    pub catalog: CatalogConfig,
}

/// Model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type in the registry.
    pub provider: String,

    /// Override for OpenAI-compatible endpoints.
    pub base_url: Option<String>,

    /// Model for the planner, replanner and sub-agent.
    pub agent_model: String,

    /// Temperature for the loop's model calls.
    pub temperature: f32,

    /// Model for the accuracy judge.
    pub judge_model: String,

    /// Model for the semantic accuracy sub-score.
    pub embedding_model: String,

    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: None,
            agent_model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            judge_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            max_tokens: None,
        }
    }
}

impl LlmConfig {
    /// JSON config handed to the provider factory.
    pub fn provider_config(&self) -> serde_json::Value {
        match &self.base_url {
            Some(url) => serde_json::json!({ "base_url": url }),
            None => serde_json::json!({}),
        }
    }
}

/// Plan-execute-judge loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Ceiling on stage invocations per run.
    pub step_limit: usize,

    /// Timeout for each planner, sub-agent and replanner call.
    #[serde(with = "duration_serde")]
    pub call_timeout: Duration,

    /// Model turns the sub-agent may take for one task.
    pub executor_max_steps: usize,

    /// Snippets returned by one web search.
    pub search_max_results: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            step_limit: 20,
            call_timeout: Duration::from_secs(120),
            executor_max_steps: 6,
            search_max_results: 5,
        }
    }
}

/// Evaluation harness settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Consistency is measured for every n-th scenario.
    pub consistency_stride: usize,

    /// Fresh recommender runs per consistency check.
    pub consistency_reruns: usize,

    pub semantic_weight: f64,
    pub judged_weight: f64,

    /// Timeout for each scoring call.
    #[serde(with = "duration_serde")]
    pub call_timeout: Duration,

    pub detail_report: String,
    pub summary_report: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            consistency_stride: 5,
            consistency_reruns: 2,
            semantic_weight: 0.3,
            judged_weight: 0.7,
            call_timeout: Duration::from_secs(60),
            detail_report: "final_kpi_report.csv".to_string(),
            summary_report: "summary_report.csv".to_string(),
        }
    }
}

impl EvaluationConfig {
    pub fn accuracy_weights(&self) -> AccuracyWeights {
        AccuracyWeights {
            semantic: self.semantic_weight,
            judged: self.judged_weight,
        }
    }
}

/// Track catalog settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// When false, every well-formed track counts as found.
    pub enabled: bool,

    /// Market code passed to the catalog search.
    pub market: Option<String>,

    pub cache_capacity: u64,

    #[serde(with = "duration_serde")]
    pub cache_ttl: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            market: None,
            cache_capacity: 1_000,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        // planning + one execute/judge pair
        if self.orchestrator.step_limit < 3 {
            return invalid("orchestrator.step_limit must be at least 3");
        }
        if self.orchestrator.executor_max_steps == 0 {
            return invalid("orchestrator.executor_max_steps must be positive");
        }
        if self.evaluation.consistency_stride == 0 {
            return invalid("evaluation.consistency_stride must be positive");
        }
        let weights = [self.evaluation.semantic_weight, self.evaluation.judged_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return invalid("accuracy weights must be finite and non-negative");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1");
        }
        if self.retry.min_delay > self.retry.max_delay {
            return invalid("retry.min_delay must not exceed retry.max_delay");
        }
        Ok(())
    }
}

/// Serde adapter for `"90s"`-style durations.
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

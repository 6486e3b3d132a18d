//! Token usage accounting per loop stage.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::providers::TokenUsage;

/// Which part of the system issued a model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageStage {
    Planning,
    Executing,
    Judging,
    Scoring,
}

impl std::fmt::Display for UsageStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UsageStage::Planning => "planning",
            UsageStage::Executing => "executing",
            UsageStage::Judging => "judging",
            UsageStage::Scoring => "scoring",
        })
    }
}

/// Accumulated LLM usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Total tokens used
    pub total_tokens: u64,

    /// Prompt/input tokens
    pub prompt_tokens: u64,

    /// Completion/output tokens
    pub completion_tokens: u64,

    /// Number of LLM calls made
    pub llm_calls: u64,

    /// Estimated cost in USD
    pub estimated_cost: f64,
}

impl LlmUsage {
    /// Add token usage from a provider response.
    pub fn add(&mut self, usage: &TokenUsage, model: &str) {
        self.prompt_tokens += u64::from(usage.prompt_tokens);
        self.completion_tokens += u64::from(usage.completion_tokens);
        self.total_tokens += u64::from(usage.total());
        self.llm_calls += 1;
        self.estimated_cost += Self::estimate_cost(usage, model);
    }

    pub fn merge(&mut self, other: &LlmUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.llm_calls += other.llm_calls;
        self.estimated_cost += other.estimated_cost;
    }

    fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
        // USD per million tokens
        let (input_rate, output_rate) = match model {
            m if m.contains("gpt-4o-mini") => (0.15, 0.6),
            m if m.contains("gpt-4o") => (2.5, 10.0),
            m if m.contains("text-embedding-3-small") => (0.02, 0.0),
            m if m.contains("text-embedding-3-large") => (0.13, 0.0),
            _ => (0.15, 0.6),
        };

        let input_cost = (f64::from(usage.prompt_tokens) / 1_000_000.0) * input_rate;
        let output_cost = (f64::from(usage.completion_tokens) / 1_000_000.0) * output_rate;
        input_cost + output_cost
    }
}

/// Usage broken down by stage, plus the total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub by_stage: BTreeMap<UsageStage, LlmUsage>,
    pub total: LlmUsage,
}

/// Shared usage tracker. Cheap to record into from concurrent runs.
#[derive(Debug, Default)]
pub struct UsageTracker {
    by_stage: RwLock<BTreeMap<UsageStage, LlmUsage>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, stage: UsageStage, usage: &TokenUsage, model: &str) {
        self.by_stage
            .write()
            .entry(stage)
            .or_default()
            .add(usage, model);
    }

    pub fn snapshot(&self) -> UsageReport {
        let by_stage = self.by_stage.read().clone();
        let mut total = LlmUsage::default();
        for usage in by_stage.values() {
            total.merge(usage);
        }
        UsageReport { by_stage, total }
    }

    pub fn reset(&self) {
        self.by_stage.write().clear();
    }
}

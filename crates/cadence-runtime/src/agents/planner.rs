use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{AgentError, PlannerAgent};
use crate::judgment::{OutputContract, StructuredJudgment};
use crate::prompts;
use crate::state::RunState;

#[derive(Debug, Deserialize)]
struct PlanReply {
    steps: Vec<String>,
}

/// Planner backed by a structured judgment.
pub struct LlmPlanner {
    judgment: StructuredJudgment,
}

impl LlmPlanner {
    pub fn new(judgment: StructuredJudgment) -> Self {
        Self { judgment }
    }
}

#[async_trait]
impl PlannerAgent for LlmPlanner {
    async fn plan(&self, state: &RunState) -> Result<Vec<String>, AgentError> {
        let reply: PlanReply = self
            .judgment
            .structured(OutputContract::Plan, prompts::planner_messages(state))
            .await?;

        let steps: Vec<String> = reply
            .steps
            .into_iter()
            .map(|step| step.trim().to_string())
            .filter(|step| !step.is_empty())
            .collect();
        tracing::info!(steps = steps.len(), "Plan created");
        Ok(steps)
    }
}

//! Agent traits and common types.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::judgment::JudgmentError;
use crate::state::RunState;

/// Errors from agents.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Judgment failed: {0}")]
    Judgment(#[from] JudgmentError),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// What the replanner decided after reviewing the evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Final payload; the run ends.
    Respond(String),
    /// A new plan replacing the current one. May be empty when the
    /// judgment filled neither field.
    Replan(Vec<String>),
}

/// Produces the initial plan.
#[async_trait]
pub trait PlannerAgent: Send + Sync {
    /// Ordered search tasks for this run.
    ///
    /// Failure is fatal to the run; there is no fallback plan.
    async fn plan(&self, state: &RunState) -> Result<Vec<String>, AgentError>;
}

/// Reviews past steps and either answers or re-plans.
#[async_trait]
pub trait ReplannerAgent: Send + Sync {
    async fn replan(&self, state: &RunState) -> Result<Decision, AgentError>;
}

/// Carries out one task and reports back in text.
///
/// Tool failures are handled inside the executor and never surface here.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &str, state: &RunState) -> Result<String, AgentError>;
}

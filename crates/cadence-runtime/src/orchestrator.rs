//! Plan-execute-judge orchestration loop.
//!
//! ```text
//! Planning -> Executing -> Judging -> Executing -> Judging -> ... -> Terminal
//! ```
//!
//! - Planning runs exactly once and installs the first plan.
//! - Executing runs the head of the current plan through the sub-agent and
//!   appends the result to the past-step log.
//! - Judging either sets the response (terminal) or replaces the plan.
//!
//! The step ceiling counts stage invocations. An execute/judge pair only
//! starts when both fit under the ceiling, so the two counts stay equal.
//! Running out of steps, or reaching Executing with an empty plan, ends the
//! run without a response. Neither is an error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::agents::{
    AgentError, Decision, LlmPlanner, LlmReplanner, PlannerAgent, ReplannerAgent, SearchExecutor,
    TaskExecutor,
};
use crate::config::{OrchestratorConfig, RuntimeConfig};
use crate::judgment::StructuredJudgment;
use crate::providers::{CompletionConfig, LlmProvider};
use crate::state::RunState;
use crate::tools::SearchTool;
use crate::usage::{UsageStage, UsageTracker};

/// Loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    Executing,
    Judging,
    Terminal,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Planning => "planning",
            Stage::Executing => "executing",
            Stage::Judging => "judging",
            Stage::Terminal => "terminal",
        })
    }
}

/// Errors that end a run.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("{stage} failed: {source}")]
    Agent {
        stage: Stage,
        #[source]
        source: AgentError,
    },

    #[error("{stage} timed out after {timeout:?}")]
    Timeout { stage: Stage, timeout: Duration },

    #[error("Orchestrator not configured: {0}")]
    NotConfigured(String),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The replanner produced a response.
    Responded,
    /// The step ceiling left no room for another execute/judge pair.
    StepLimitReached,
    /// Executing found an empty plan.
    PlanExhausted,
}

/// Final state of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: RunState,
    pub status: RunStatus,
    /// Stage invocations used.
    pub steps: usize,
}

impl RunOutcome {
    pub fn response(&self) -> Option<&str> {
        self.state.response()
    }
}

/// Drives one run at a time; holds no per-run state, so one instance can
/// serve concurrent runs.
pub struct Orchestrator {
    planner: Arc<dyn PlannerAgent>,
    replanner: Arc<dyn ReplannerAgent>,
    executor: Arc<dyn TaskExecutor>,
    step_limit: usize,
    call_timeout: Duration,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }

    /// Run to a response or to the ceiling.
    pub async fn run(&self, mut state: RunState) -> Result<RunOutcome, OrchestratorError> {
        let mut steps = 0usize;
        let mut stage = Stage::Planning;

        loop {
            match stage {
                Stage::Planning => {
                    if steps + 1 > self.step_limit {
                        return Ok(self.finish(state, RunStatus::StepLimitReached, steps));
                    }
                    steps += 1;
                    let plan = self.call(Stage::Planning, self.planner.plan(&state)).await?;
                    tracing::debug!(stage = %stage, step = steps, plan = ?plan, "Plan installed");
                    state.install_plan(plan);
                    stage = Stage::Executing;
                }
                Stage::Executing => {
                    if steps + 2 > self.step_limit {
                        return Ok(self.finish(state, RunStatus::StepLimitReached, steps));
                    }
                    let Some(task) = state.next_task().map(str::to_string) else {
                        return Ok(self.finish(state, RunStatus::PlanExhausted, steps));
                    };
                    steps += 1;
                    tracing::info!(stage = %stage, step = steps, task = %task, "Executing task");
                    let result = self
                        .call(Stage::Executing, self.executor.execute(&task, &state))
                        .await?;
                    state.record_step(task, result);
                    stage = Stage::Judging;
                }
                Stage::Judging => {
                    steps += 1;
                    let decision = self
                        .call(Stage::Judging, self.replanner.replan(&state))
                        .await?;
                    match decision {
                        Decision::Respond(response) => {
                            state.respond(response);
                            stage = Stage::Terminal;
                        }
                        Decision::Replan(plan) => {
                            tracing::debug!(stage = %stage, step = steps, plan = ?plan, "Re-planned");
                            state.install_plan(plan);
                            stage = Stage::Executing;
                        }
                    }
                }
                Stage::Terminal => {
                    return Ok(self.finish(state, RunStatus::Responded, steps));
                }
            }
        }
    }

    async fn call<T, F>(&self, stage: Stage, future: F) -> Result<T, OrchestratorError>
    where
        F: Future<Output = Result<T, AgentError>>,
    {
        match tokio::time::timeout(self.call_timeout, future).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => {
                tracing::warn!(stage = %stage, error = %source, "Stage failed");
                Err(OrchestratorError::Agent { stage, source })
            }
            Err(_) => {
                tracing::warn!(stage = %stage, timeout = ?self.call_timeout, "Stage timed out");
                Err(OrchestratorError::Timeout {
                    stage,
                    timeout: self.call_timeout,
                })
            }
        }
    }

    fn finish(&self, state: RunState, status: RunStatus, steps: usize) -> RunOutcome {
        match status {
            RunStatus::Responded => tracing::info!(steps, "Run finished with a response"),
            _ => tracing::warn!(steps, status = ?status, "Run ended without a response"),
        }
        RunOutcome {
            state,
            status,
            steps,
        }
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    planner: Option<Arc<dyn PlannerAgent>>,
    replanner: Option<Arc<dyn ReplannerAgent>>,
    executor: Option<Arc<dyn TaskExecutor>>,
    step_limit: usize,
    call_timeout: Duration,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            planner: None,
            replanner: None,
            executor: None,
            step_limit: defaults.step_limit,
            call_timeout: defaults.call_timeout,
        }
    }

    pub fn planner(mut self, planner: Arc<dyn PlannerAgent>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn replanner(mut self, replanner: Arc<dyn ReplannerAgent>) -> Self {
        self.replanner = Some(replanner);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn config(self, config: &OrchestratorConfig) -> Self {
        self.step_limit(config.step_limit)
            .call_timeout(config.call_timeout)
    }

    /// Model-backed planner, replanner and sub-agent sharing one provider.
    pub fn llm_agents(
        self,
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchTool>,
        config: &RuntimeConfig,
        usage: Arc<UsageTracker>,
    ) -> Self {
        let completion = CompletionConfig {
            model: config.llm.agent_model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            ..CompletionConfig::default()
        };
        let judgment = |stage: UsageStage| {
            StructuredJudgment::new(provider.clone(), completion.clone())
                .with_usage(usage.clone(), stage)
                .with_retry(config.retry.clone())
        };

        let executor = SearchExecutor::new(judgment(UsageStage::Executing), search)
            .with_max_steps(config.orchestrator.executor_max_steps)
            .with_max_results(config.orchestrator.search_max_results)
            .with_retry(config.retry.clone());

        self.planner(Arc::new(LlmPlanner::new(judgment(UsageStage::Planning))))
            .replanner(Arc::new(LlmReplanner::new(judgment(UsageStage::Judging))))
            .executor(Arc::new(executor))
            .config(&config.orchestrator)
    }

    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        let missing = |role: &str| OrchestratorError::NotConfigured(format!("No {} set", role));
        Ok(Orchestrator {
            planner: self.planner.ok_or_else(|| missing("planner"))?,
            replanner: self.replanner.ok_or_else(|| missing("replanner"))?,
            executor: self.executor.ok_or_else(|| missing("executor"))?,
            step_limit: self.step_limit,
            call_timeout: self.call_timeout,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

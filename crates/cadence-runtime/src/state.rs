//! State carried through one plan-execute-judge run.

use cadence_core::{BridgeInput, ContextRecord, PreferenceRecord};
use serde::{Deserialize, Serialize};

/// One finished sub-task and the sub-agent's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastStep {
    pub task: String,
    pub result: String,
}

/// Everything the stages of one run read and write.
///
/// Owned by a single run; concurrent runs each build their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Natural-language instruction seeding the run.
    pub input: String,
    pub context: ContextRecord,
    pub preference: PreferenceRecord,
    plan: Vec<String>,
    past_steps: Vec<PastStep>,
    response: Option<String>,
}

impl RunState {
    pub fn new(
        input: impl Into<String>,
        context: ContextRecord,
        preference: PreferenceRecord,
    ) -> Self {
        Self {
            input: input.into(),
            context,
            preference,
            plan: Vec::new(),
            past_steps: Vec::new(),
            response: None,
        }
    }

    /// Build from the flat caller record.
    pub fn from_bridge_input(instruction: impl Into<String>, input: &BridgeInput) -> Self {
        Self::new(instruction, input.context(), input.preference())
    }

    pub fn plan(&self) -> &[String] {
        &self.plan
    }

    pub fn past_steps(&self) -> &[PastStep] {
        &self.past_steps
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    /// Replace the plan. Plans are never merged.
    pub fn install_plan(&mut self, plan: Vec<String>) {
        self.plan = plan;
    }

    /// The task to execute next.
    ///
    /// Always the head of the latest plan, so a re-plan discards whatever
    /// remained of the previous one.
    pub fn next_task(&self) -> Option<&str> {
        self.plan.first().map(String::as_str)
    }

    /// Append a finished step. The log only grows.
    pub fn record_step(&mut self, task: impl Into<String>, result: impl Into<String>) {
        self.past_steps.push(PastStep {
            task: task.into(),
            result: result.into(),
        });
    }

    /// Set the final payload. The run is terminal from here on.
    pub fn respond(&mut self, response: impl Into<String>) {
        self.response = Some(response.into());
    }

    pub fn is_terminal(&self) -> bool {
        self.response.is_some()
    }

    pub fn context_json(&self) -> String {
        serde_json::to_string(&self.context).unwrap_or_default()
    }

    pub fn preference_json(&self) -> String {
        serde_json::to_string(&self.preference).unwrap_or_default()
    }
}

//! Adapter between flat caller records and the orchestration loop.

use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::BridgeInput;

use crate::orchestrator::{Orchestrator, OrchestratorError, RunOutcome};
use crate::prompts::SEED_INSTRUCTION;
use crate::state::RunState;

/// Returned when a run ends without a response.
pub const NO_RESPONSE_PAYLOAD: &str = r#"{"error": "No response generated within limit"}"#;

/// Anything that turns a caller record into a recommendation payload.
///
/// Never fails: problems are reported inside the returned string.
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, input: &BridgeInput) -> String;
}

/// `{"error": "<message>"}`
pub fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Runs the orchestration loop for one caller record.
///
/// Every call builds its own [`RunState`], so concurrent calls share
/// nothing but the read-only orchestrator.
pub struct RecommendationBridge {
    orchestrator: Arc<Orchestrator>,
}

impl RecommendationBridge {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// The full run outcome, for callers that want more than the payload.
    pub async fn run(&self, input: &BridgeInput) -> Result<RunOutcome, OrchestratorError> {
        let state = RunState::from_bridge_input(SEED_INSTRUCTION, input);
        self.orchestrator.run(state).await
    }
}

#[async_trait]
impl Recommender for RecommendationBridge {
    async fn recommend(&self, input: &BridgeInput) -> String {
        match self.run(input).await {
            Ok(outcome) => match outcome.response() {
                Some(response) => response.to_string(),
                None => NO_RESPONSE_PAYLOAD.to_string(),
            },
            Err(e) => {
                tracing::error!(error = %e, "Recommendation run failed");
                error_payload(&e.to_string())
            }
        }
    }
}

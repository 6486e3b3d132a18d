use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::traits::{AgentError, Decision, ReplannerAgent};
use crate::judgment::{OutputContract, StructuredJudgment};
use crate::prompts;
use crate::state::RunState;

/// Replanner reply: a final response, a new plan, or (in violation of the
/// contract) neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Act {
    #[serde(default)]
    pub response: Option<JsonValue>,

    #[serde(default)]
    pub plan: Option<Vec<String>>,
}

impl Act {
    /// A populated response wins over the plan.
    ///
    /// A response that arrives as a JSON list or object is re-serialized;
    /// an empty string counts as not populated.
    pub fn into_decision(self) -> Decision {
        let response = match self.response {
            Some(JsonValue::String(text)) if !text.trim().is_empty() => Some(text),
            Some(value @ (JsonValue::Array(_) | JsonValue::Object(_))) => Some(value.to_string()),
            _ => None,
        };

        match response {
            Some(text) => Decision::Respond(text),
            None => Decision::Replan(self.plan.unwrap_or_default()),
        }
    }
}

/// Replanner backed by a structured judgment.
pub struct LlmReplanner {
    judgment: StructuredJudgment,
}

impl LlmReplanner {
    pub fn new(judgment: StructuredJudgment) -> Self {
        Self { judgment }
    }
}

#[async_trait]
impl ReplannerAgent for LlmReplanner {
    async fn replan(&self, state: &RunState) -> Result<Decision, AgentError> {
        let act: Act = self
            .judgment
            .structured(OutputContract::Act, prompts::replanner_messages(state))
            .await?;

        let decision = act.into_decision();
        match &decision {
            Decision::Respond(text) => tracing::info!(chars = text.len(), "Replanner responded"),
            Decision::Replan(plan) if plan.is_empty() => {
                tracing::warn!("Replanner returned neither response nor plan")
            }
            Decision::Replan(plan) => tracing::info!(steps = plan.len(), "Replanner revised plan"),
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn act(value: JsonValue) -> Act {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_string_response_wins() {
        let decision = act(json!({"response": "[{}]", "plan": ["more"]})).into_decision();
        assert_eq!(decision, Decision::Respond("[{}]".to_string()));
    }

    #[test]
    fn test_structured_response_reserialized() {
        let decision = act(json!({"response": [{"track_info": {"track_title": "Clair de Lune"}}]}))
            .into_decision();
        match decision {
            Decision::Respond(text) => {
                let back: JsonValue = serde_json::from_str(&text).unwrap();
                assert_eq!(back[0]["track_info"]["track_title"], "Clair de Lune");
            }
            other => panic!("expected Respond, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_response_falls_through_to_plan() {
        let decision = act(json!({"response": "  ", "plan": ["search again"]})).into_decision();
        assert_eq!(decision, Decision::Replan(vec!["search again".to_string()]));
    }

    #[test]
    fn test_neither_field_is_empty_plan() {
        assert_eq!(act(json!({})).into_decision(), Decision::Replan(Vec::new()));
        assert_eq!(
            act(json!({"response": null, "plan": null})).into_decision(),
            Decision::Replan(Vec::new())
        );
    }
}

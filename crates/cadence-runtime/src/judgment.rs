//! Structured judgment calls.
//!
//! A judgment is a model call that answers either in free text or in JSON
//! conforming to an [`OutputContract`]. Replies go through the same lenient
//! extraction as recommendation payloads (code fences stripped, outermost
//! braces sliced) before they are validated and decoded.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use cadence_core::payload::{extract_json_object, ExtractError};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, ResponseFormat,
};
use crate::retry::{RetryPolicy, Transient};
use crate::usage::{UsageStage, UsageTracker};

const PLAN_SCHEMA_JSON: &str = include_str!("../schemas/plan.schema.json");
const ACT_SCHEMA_JSON: &str = include_str!("../schemas/act.schema.json");

static PLAN_VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
static ACT_VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from judgment calls.
#[derive(Error, Debug)]
pub enum JudgmentError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Reply is not JSON: {0}")]
    Extract(#[from] ExtractError),

    #[error("Reply violates the {name} contract: {}", .errors.join("; "))]
    Schema {
        name: &'static str,
        errors: Vec<String>,
    },

    #[error("Failed to decode reply: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl Transient for JudgmentError {
    fn is_retryable(&self) -> bool {
        match self {
            JudgmentError::Provider(e) => e.is_retryable(),
            JudgmentError::Timeout(_) => true,
            _ => false,
        }
    }
}

/// JSON contracts a judgment reply can be held to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContract {
    /// `{"steps": [string, ...]}`
    Plan,
    /// `{"response": string|null, "plan": [string]|null}`
    Act,
}

impl OutputContract {
    pub fn name(&self) -> &'static str {
        match self {
            OutputContract::Plan => "plan",
            OutputContract::Act => "act",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            OutputContract::Plan => PLAN_SCHEMA_JSON,
            OutputContract::Act => ACT_SCHEMA_JSON,
        }
    }

    /// The schema document, as sent to the model.
    pub fn schema(&self) -> JsonValue {
        // Embedded at compile time and covered by tests.
        serde_json::from_str(self.source()).unwrap_or(JsonValue::Null)
    }

    pub fn response_format(&self) -> ResponseFormat {
        ResponseFormat::JsonSchema {
            name: self.name().to_string(),
            schema: self.schema(),
        }
    }

    fn validator(&self) -> Result<&'static jsonschema::Validator, String> {
        let cell = match self {
            OutputContract::Plan => &PLAN_VALIDATOR,
            OutputContract::Act => &ACT_VALIDATOR,
        };
        let source = self.source();
        let compiled = cell.get_or_init(|| {
            let schema: JsonValue = serde_json::from_str(source)
                .map_err(|e| format!("Invalid schema JSON: {}", e))?;
            jsonschema::options()
                .build(&schema)
                .map_err(|e| format!("Failed to compile schema: {}", e))
        });
        compiled.as_ref().map_err(Clone::clone)
    }

    /// Validate a reply, collecting every violation.
    pub fn validate(&self, value: &JsonValue) -> Result<(), Vec<String>> {
        let validator = self.validator().map_err(|e| vec![e])?;
        let errors: Vec<String> = validator
            .iter_errors(value)
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A model bound to a completion config, a retry policy and a usage stage.
pub struct StructuredJudgment {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    usage: Arc<UsageTracker>,
    stage: UsageStage,
    retry: RetryPolicy,
}

impl StructuredJudgment {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self {
            provider,
            config,
            usage: Arc::new(UsageTracker::new()),
            stage: UsageStage::Judging,
            retry: RetryPolicy::default(),
        }
    }

    /// Record usage into `tracker` under `stage`.
    pub fn with_usage(mut self, tracker: Arc<UsageTracker>, stage: UsageStage) -> Self {
        self.usage = tracker;
        self.stage = stage;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Raw completion with retries and usage accounting.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, JudgmentError> {
        let provider = &self.provider;
        let response = self
            .retry
            .run("llm_complete", || {
                let messages = messages.clone();
                async move { provider.complete(messages, config).await }
            })
            .await?;

        self.usage.record(self.stage, &response.usage, &response.model);
        tracing::debug!(
            stage = %self.stage,
            model = %response.model,
            tokens = response.usage.total(),
            "LLM call completed"
        );
        Ok(response)
    }

    /// Free-text reply.
    pub async fn text(&self, messages: Vec<ChatMessage>) -> Result<String, JudgmentError> {
        Ok(self.complete(messages, &self.config).await?.content)
    }

    /// Any JSON object.
    pub async fn json_object(&self, messages: Vec<ChatMessage>) -> Result<JsonValue, JudgmentError> {
        let config = self
            .config
            .clone()
            .with_response_format(ResponseFormat::JsonObject);
        let reply = self.complete(messages, &config).await?;
        Ok(extract_json_object(&reply.content)?)
    }

    /// JSON validated against `contract` and decoded into `T`.
    pub async fn structured<T: DeserializeOwned>(
        &self,
        contract: OutputContract,
        messages: Vec<ChatMessage>,
    ) -> Result<T, JudgmentError> {
        let config = self
            .config
            .clone()
            .with_response_format(contract.response_format());
        let reply = self.complete(messages, &config).await?;
        decode_reply(contract, &reply.content)
    }
}

/// Extract, validate and decode one reply.
pub fn decode_reply<T: DeserializeOwned>(
    contract: OutputContract,
    raw: &str,
) -> Result<T, JudgmentError> {
    let value = extract_json_object(raw)?;
    contract
        .validate(&value)
        .map_err(|errors| JudgmentError::Schema {
            name: contract.name(),
            errors,
        })?;
    Ok(serde_json::from_value(value)?)
}

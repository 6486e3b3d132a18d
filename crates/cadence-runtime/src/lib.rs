//! # cadence-runtime
//!
//! The model-backed half of Cadence: the plan-execute-judge recommendation
//! loop, the Bridge that callers use to run it, and the five-KPI
//! evaluation harness.
//!
//! Every external capability (language model, web search, track catalog)
//! sits behind a trait and is injected at construction, so tests run the
//! whole loop against deterministic fakes. Concrete HTTP clients are
//! behind the `openai`, `tavily` and `spotify` features.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cadence_core::BridgeInput;
//! use cadence_runtime::{Orchestrator, RecommendationBridge, Recommender, RuntimeConfig};
//!
//! let config = RuntimeConfig::default();
//! let orchestrator = Orchestrator::builder()
//!     .config(&config.orchestrator)
//!     .llm_agents(provider, search, &config, usage)
//!     .build()?;
//! let bridge = RecommendationBridge::new(Arc::new(orchestrator));
//!
//! let payload = bridge
//!     .recommend(&BridgeInput::new().location("library").goal("focus"))
//!     .await;
//! ```

pub mod agents;
pub mod bridge;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod evaluator;
pub mod judgment;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod retry;
pub mod secrets;
pub mod state;
pub mod tools;
pub mod usage;

pub use agents::{AgentError, Decision, PlannerAgent, ReplannerAgent, TaskExecutor};
pub use bridge::{RecommendationBridge, Recommender, NO_RESPONSE_PAYLOAD};
pub use cache::CachedCatalog;
pub use catalog::{CatalogError, CatalogSearch, CatalogTrack, TrackVerifier};
pub use config::{ConfigError, RuntimeConfig};
pub use evaluator::{EvaluationOutcome, Evaluator, ProgressReporter, SilentProgress};
pub use judgment::{JudgmentError, OutputContract, StructuredJudgment};
pub use orchestrator::{Orchestrator, OrchestratorError, RunOutcome, RunStatus, Stage};
pub use providers::{LlmProvider, ProviderError, ProviderRegistry};
pub use retry::RetryPolicy;
pub use state::{PastStep, RunState};
pub use tools::{SearchTool, ToolError};
pub use usage::{UsageReport, UsageStage, UsageTracker};

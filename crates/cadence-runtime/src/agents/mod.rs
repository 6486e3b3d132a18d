//! The three roles of the recommendation loop.

mod executor;
mod planner;
mod replanner;
mod traits;

pub use executor::SearchExecutor;
pub use planner::LlmPlanner;
pub use replanner::{Act, LlmReplanner};
pub use traits::{AgentError, Decision, PlannerAgent, ReplannerAgent, TaskExecutor};

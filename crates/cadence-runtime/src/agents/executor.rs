use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{AgentError, TaskExecutor};
use crate::judgment::StructuredJudgment;
use crate::prompts;
use crate::providers::{ChatMessage, ToolCall};
use crate::retry::RetryPolicy;
use crate::state::RunState;
use crate::tools::{query_argument, render_hits, SearchTool, ToolError};

/// Tool-using sub-agent.
///
/// Alternates between asking the model for its next move and running the
/// searches it requests, until the model answers in text or the step budget
/// runs out. The last turn is offered no tools, which forces an answer.
pub struct SearchExecutor {
    judgment: StructuredJudgment,
    tool: Arc<dyn SearchTool>,
    max_steps: usize,
    max_results: usize,
    retry: RetryPolicy,
}

impl SearchExecutor {
    pub fn new(judgment: StructuredJudgment, tool: Arc<dyn SearchTool>) -> Self {
        Self {
            judgment,
            tool,
            max_steps: 6,
            max_results: 5,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run one tool call. Failures come back as text for the model to read.
    async fn run_tool(&self, call: &ToolCall) -> String {
        match self.try_tool(call).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                format!("Tool error: {}", e)
            }
        }
    }

    async fn try_tool(&self, call: &ToolCall) -> Result<String, ToolError> {
        if call.name != self.tool.name() {
            return Err(ToolError::UnknownTool(call.name.clone()));
        }
        let query = query_argument(&call.arguments)?;
        let tool = &self.tool;
        let max_results = self.max_results;
        let hits = self
            .retry
            .run("web_search", || async move { tool.search(query, max_results).await })
            .await?;
        tracing::debug!(query, hits = hits.len(), "Search finished");
        Ok(render_hits(&hits))
    }
}

#[async_trait]
impl TaskExecutor for SearchExecutor {
    async fn execute(&self, task: &str, state: &RunState) -> Result<String, AgentError> {
        let mut messages = prompts::executor_messages(task, state);
        let with_tools = self
            .judgment
            .config()
            .clone()
            .with_tools(vec![self.tool.definition()]);
        let without_tools = self.judgment.config().clone();

        let mut answer = String::new();
        for step in 0..self.max_steps {
            let last = step + 1 == self.max_steps;
            let config = if last { &without_tools } else { &with_tools };
            let reply = self.judgment.complete(messages.clone(), config).await?;

            if !reply.wants_tools() {
                return Ok(reply.content);
            }

            tracing::debug!(step, calls = reply.tool_calls.len(), "Sub-agent requested tools");
            answer = reply.content.clone();
            messages.push(ChatMessage::assistant_tool_calls(
                reply.content,
                reply.tool_calls.clone(),
            ));
            for call in &reply.tool_calls {
                let output = self.run_tool(call).await;
                messages.push(ChatMessage::tool_result(&call.id, output));
            }
        }

        tracing::warn!(task, "Sub-agent step budget exhausted");
        Ok(answer)
    }
}

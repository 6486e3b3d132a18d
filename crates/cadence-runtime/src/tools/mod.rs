//! Tools the search sub-agent can call.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::providers::ToolDefinition;
use crate::retry::Transient;
use crate::secrets::CredentialError;

#[cfg(feature = "tavily")]
mod tavily;

#[cfg(feature = "tavily")]
pub use tavily::{TavilySearch, TAVILY_API_KEY_ENV};

/// Name the web search tool is offered under.
pub const WEB_SEARCH_TOOL: &str = "web_search";

/// Errors from tool calls.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Search request failed: {0}")]
    Http(String),

    #[error("Search API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Search tool not configured: {0}")]
    NotConfigured(String),
}

impl From<CredentialError> for ToolError {
    fn from(err: CredentialError) -> Self {
        ToolError::NotConfigured(err.to_string())
    }
}

impl Transient for ToolError {
    fn is_retryable(&self) -> bool {
        match self {
            ToolError::Http(_) | ToolError::Timeout(_) => true,
            ToolError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// One search result snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Free-text search over the web. Best effort, not authoritative.
#[async_trait]
pub trait SearchTool: Send + Sync {
    /// Up to `max_results` snippets for `query`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError>;

    fn name(&self) -> &str {
        WEB_SEARCH_TOOL
    }

    /// How the tool is described to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Search the web for music, artists, tracks and listening guides. \
                          Returns short result snippets."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query"}
                },
                "required": ["query"]
            }),
        }
    }
}

/// Pull the `query` argument out of a tool call.
pub fn query_argument(arguments: &serde_json::Value) -> Result<&str, ToolError> {
    arguments
        .get("query")
        .and_then(|q| q.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments("missing 'query' string".to_string()))
}

/// Render hits as the tool message the model reads.
pub fn render_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results.".to_string();
    }
    serde_json::to_string(hits).unwrap_or_else(|_| "No results.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_argument() {
        assert_eq!(query_argument(&json!({"query": " lo-fi "})).unwrap(), "lo-fi");
        assert!(query_argument(&json!({"query": ""})).is_err());
        assert!(query_argument(&json!({"q": "x"})).is_err());
    }

    #[test]
    fn test_render_hits() {
        assert_eq!(render_hits(&[]), "No results.");
        let hits = vec![SearchHit {
            title: "Best study music".into(),
            url: "https://example.com".into(),
            content: "Nujabes - Aruarian Dance".into(),
        }];
        assert!(render_hits(&hits).contains("Aruarian Dance"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ToolError::Api { status: 429, message: String::new() }.is_retryable());
        assert!(ToolError::Http("reset".into()).is_retryable());
        assert!(!ToolError::InvalidArguments("x".into()).is_retryable());
    }
}

//! Tavily web search.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{SearchHit, SearchTool, ToolError};
use crate::secrets::{ApiCredential, CredentialSource};

/// Environment variable holding the Tavily API key.
pub const TAVILY_API_KEY_ENV: &str = "TAVILY_API_KEY";

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com/search";

pub struct TavilySearch {
    credential: ApiCredential,
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for TavilySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearch")
            .field("credential", &self.credential)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credential(ApiCredential::new(
            api_key,
            CredentialSource::Programmatic,
            "Tavily API key",
        ))
    }

    fn with_credential(credential: ApiCredential) -> Self {
        Self {
            credential,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Result<Self, ToolError> {
        let credential = ApiCredential::from_env(TAVILY_API_KEY_ENV, "Tavily API key")?;
        Ok(Self::with_credential(credential))
    }

    /// Build from `{"api_key"?, "endpoint"?}`, falling back to the environment.
    pub fn from_config(config: &JsonValue) -> Result<Self, ToolError> {
        let credential =
            ApiCredential::from_config_or_env(config, "api_key", TAVILY_API_KEY_ENV, "Tavily API key")?;
        let mut tool = Self::with_credential(credential);
        if let Some(endpoint) = config["endpoint"].as_str() {
            tool.endpoint = endpoint.to_string();
        }
        Ok(tool)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl From<TavilyResult> for SearchHit {
    fn from(result: TavilyResult) -> Self {
        SearchHit {
            title: result.title,
            url: result.url,
            content: result.content,
        }
    }
}

#[async_trait]
impl SearchTool for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        tracing::debug!(query, max_results, "Tavily search");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.credential.expose())
            .timeout(self.timeout)
            .json(&SearchRequest { query, max_results })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout(self.timeout)
                } else {
                    ToolError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ToolError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Http(e.to_string()))?;
        Ok(body
            .results
            .into_iter()
            .take(max_results)
            .map(SearchHit::from)
            .collect())
    }
}

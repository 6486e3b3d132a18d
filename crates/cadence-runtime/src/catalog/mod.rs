//! Track catalog lookup for the search-success KPI.
//!
//! A catalog answers "does a track matching this query exist?". Only the
//! first hit of a limit-1 search is ever looked at.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cadence_core::{ParseResult, SearchVerdict, TrackQuery};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::{RetryPolicy, Transient};
use crate::secrets::CredentialError;

#[cfg(feature = "spotify")]
mod spotify;

#[cfg(feature = "spotify")]
pub use spotify::{SpotifyCatalog, SPOTIFY_CLIENT_ID_ENV, SPOTIFY_CLIENT_SECRET_ENV};

/// Errors from catalog lookups.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Http(String),

    #[error("Catalog API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Catalog authentication failed: {0}")]
    Auth(String),

    #[error("Catalog not configured: {0}")]
    NotConfigured(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl From<CredentialError> for CatalogError {
    fn from(err: CredentialError) -> Self {
        CatalogError::NotConfigured(err.to_string())
    }
}

impl Transient for CatalogError {
    fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Http(_) | CatalogError::Timeout(_) => true,
            CatalogError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// The first match of a catalog search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
}

/// Black-box track search.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// First track matching `query`, if any.
    async fn search_track(&self, query: &str) -> Result<Option<CatalogTrack>, CatalogError>;

    fn name(&self) -> &str;
}

/// Checks recommended tracks against an optional catalog.
#[derive(Clone)]
pub struct TrackVerifier {
    catalog: Option<Arc<dyn CatalogSearch>>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl TrackVerifier {
    pub fn new(catalog: Option<Arc<dyn CatalogSearch>>) -> Self {
        Self {
            catalog,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_catalog(&self) -> bool {
        self.catalog.is_some()
    }

    /// Strict query first, the loose one only when the strict one finds nothing.
    pub async fn verify(&self, parsed: &ParseResult) -> SearchVerdict {
        let Some(query) = TrackQuery::from_parsed(parsed) else {
            return SearchVerdict::NotSearchable;
        };
        let Some(catalog) = &self.catalog else {
            return SearchVerdict::CatalogUnavailable;
        };

        for q in query.queries() {
            match self.lookup(catalog.as_ref(), &q).await {
                Ok(Some(track)) => {
                    tracing::debug!(query = %q, track_id = %track.id, "Catalog hit");
                    return SearchVerdict::Found { query: q };
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(query = %q, error = %e, "Catalog lookup failed");
                    return SearchVerdict::LookupFailed {
                        error: e.to_string(),
                    };
                }
            }
        }
        SearchVerdict::NotFound
    }

    async fn lookup(
        &self,
        catalog: &dyn CatalogSearch,
        query: &str,
    ) -> Result<Option<CatalogTrack>, CatalogError> {
        let timeout = self.timeout;
        self.retry
            .run("catalog_search", || async move {
                tokio::time::timeout(timeout, catalog.search_track(query))
                    .await
                    .map_err(|_| CatalogError::Timeout(timeout))?
            })
            .await
    }
}

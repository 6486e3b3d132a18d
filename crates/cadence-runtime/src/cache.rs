//! Caching layer for catalog lookups.
//!
//! The same track is verified many times over an evaluation run (once per
//! scenario and again for every consistency re-run). Results are kept in
//! memory keyed by the exact query string. Failed lookups are not cached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::catalog::{CatalogError, CatalogSearch, CatalogTrack};

/// Catalog wrapper memoizing successful lookups, misses included.
pub struct CachedCatalog {
    inner: Arc<dyn CatalogSearch>,
    cache: Cache<String, Option<CatalogTrack>>,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn CatalogSearch>, max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl CatalogSearch for CachedCatalog {
    async fn search_track(&self, query: &str) -> Result<Option<CatalogTrack>, CatalogError> {
        if let Some(hit) = self.cache.get(query).await {
            tracing::trace!(query, "Catalog cache hit");
            return Ok(hit);
        }

        let result = self.inner.search_track(query).await?;
        self.cache.insert(query.to_string(), result.clone()).await;
        Ok(result)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

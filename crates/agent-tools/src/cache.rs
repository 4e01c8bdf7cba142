//! Response cache for market-data lookups

use cached::{Cached, TimedCache};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for a provider response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Ticker symbol
    pub symbol: String,
    /// Operation name (e.g. "history", "fundamentals")
    pub endpoint: String,
    /// Extra parameters, already rendered
    pub params: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(
        symbol: impl Into<String>,
        endpoint: impl Into<String>,
        params: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            endpoint: endpoint.into(),
            params: params.into(),
        }
    }
}

/// Shared time-bounded cache of JSON-encoded responses
#[derive(Clone)]
pub struct ResponseCache {
    cache: Arc<RwLock<TimedCache<CacheKey, serde_json::Value>>>,
}

impl ResponseCache {
    /// Create a cache whose entries expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Cached value for `key`, if present and fresh
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let mut cache = self.cache.write().await;
        let value = cache.cache_get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    /// Store a value
    pub async fn insert<T: Serialize>(&self, key: CacheKey, value: &T) {
        if let Ok(json) = serde_json::to_value(value) {
            let mut cache = self.cache.write().await;
            let _ = cache.cache_set(key, json);
        }
    }

    /// Return the cached value or run `fetcher` and cache its success
    pub async fn get_or_fetch<T, F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!("Cache hit for {:?}", key);
            return Ok(value);
        }

        tracing::debug!("Cache miss for {:?}", key);
        let value = fetcher().await?;
        self.insert(key, &value).await;
        Ok(value)
    }

    /// Drop every entry
    pub async fn clear(&self) {
        self.cache.write().await.cache_clear();
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        self.cache.read().await.cache_size()
    }

    /// Whether the cache holds nothing
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

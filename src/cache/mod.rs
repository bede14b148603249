//! Cache layer
//!
//! In-process caching backed by moka. The only cached values today are
//! rendered block documents, see `services::content`.
//!
//! ```rust,ignore
//! use nucms::cache::{create_cache, CacheLayer};
//! use nucms::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set("key", &"value").await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// Entries expire after the TTL the cache was built with.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache, replacing any previous value
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()>;
}

/// Create the cache described by the configuration.
pub fn create_cache(config: &CacheConfig) -> Arc<MemoryCache> {
    tracing::info!(
        "Using in-memory cache (capacity {}, ttl {}s)",
        config.max_capacity,
        config.ttl_seconds
    );
    Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        Duration::from_secs(config.ttl_seconds),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_cache_from_config() {
        let config = CacheConfig {
            max_capacity: 10,
            ttl_seconds: 5,
        };
        let cache = create_cache(&config);

        assert!(format!("{:?}", cache).contains("5s"));
        cache.set("answer", &42u32).await.unwrap();
        assert_eq!(cache.get::<u32>("answer").await.unwrap(), Some(42));
    }
}

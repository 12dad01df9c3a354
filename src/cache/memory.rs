//! In-process state cache

use super::{ExpiringCache, StateCache};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// [`StateCache`] backed by an in-memory expiring map
#[derive(Clone, Default)]
pub struct MemoryStateCache {
    entries: Arc<RwLock<ExpiringCache<String, Value>>>,
}

impl MemoryStateCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateCache for MemoryStateCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let mut entries = self.entries.write().await;
        Ok(entries.get(&key.to_string()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value, ttl);
        tracing::trace!(key, ttl_secs = ttl.as_secs(), "Cached state blob");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryStateCache::new();
        cache
            .set("k", json!({"bankroll": "100"}), Duration::from_secs(60))
            .await
            .unwrap();

        let value = cache.get("k").await.unwrap();
        assert_eq!(value, Some(json!({"bankroll": "100"})));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let cache = MemoryStateCache::new();
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_never_visible() {
        let cache = MemoryStateCache::new();
        cache.set("k", json!(1), Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let cache = MemoryStateCache::new();
        tokio_test::block_on(async {
            cache.set("k", json!(1), Duration::from_secs(60)).await.unwrap();
            cache.set("k", json!(2), Duration::from_secs(60)).await.unwrap();
            assert_eq!(cache.get("k").await.unwrap(), Some(json!(2)));
        });
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = MemoryStateCache::new();
        let other = cache.clone();
        cache.set("k", json!(7), Duration::from_secs(60)).await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), Some(json!(7)));
    }
}

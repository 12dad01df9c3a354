//! Caching module
//!
//! Rule-result memoization and persisted strategy state

mod expiring;
mod memory;

pub use expiring::ExpiringCache;
pub use memory::MemoryStateCache;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Trait for key-value stores holding serialized component state
#[async_trait]
pub trait StateCache: Send + Sync {
    /// Fetch a value, `None` if absent or expired
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;
    /// Store a value for `ttl`
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> anyhow::Result<()>;
}

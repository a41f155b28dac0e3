use async_trait::async_trait;
use std::time::Duration;

/// Default validity window for fetched price histories.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Key-value cache with a fixed time-to-live chosen at construction.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send + Sync,
{
    /// Returns the value if present and younger than the TTL.
    async fn get(&self, key: &K) -> Option<V>;

    /// Stores `value`, replacing any previous entry and restarting its TTL.
    async fn set(&self, key: K, value: V);

    async fn invalidate(&self, key: &K);

    async fn clear(&self);
}

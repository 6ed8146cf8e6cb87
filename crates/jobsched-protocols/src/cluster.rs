//! Shared cluster cache trait.

use async_trait::async_trait;

use crate::error::CacheError;

/// A key/value cache shared by every node of the cluster.
///
/// Used by the engine as a mutual-exclusion token store, a liveness record
/// and a cancellation flag store. Entries are expected to expire after a
/// configurable time unless refreshed by another `put`.
#[async_trait]
pub trait ClusterCache: Send + Sync {
    /// Get the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Store `value` only if `key` holds no live value.
    ///
    /// Returns `true` when the value was stored.
    async fn put_if_absent(&self, key: &str, value: String) -> Result<bool, CacheError>;

    /// Remove the value stored under `key`.
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// All keys currently holding a live value.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;
}

//! In-process cluster cache with per-entry expiry.
//!
//! Suitable for a single node, or for several engines sharing one instance
//! inside a process (tests, embedded deployments).

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use jobsched_protocols::{CacheError, ClusterCache};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// A [`ClusterCache`] backed by a concurrent map.
///
/// With a TTL configured, every `put` (re)starts the entry's expiry clock;
/// expired entries behave as absent and are dropped lazily.
#[derive(Debug, Default)]
pub struct MemoryClusterCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Option<Duration>,
}

impl MemoryClusterCache {
    /// Create a cache whose entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache whose entries expire `ttl` after their last write.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Some(ttl),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Drop all expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_live(now));
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.value().is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, value: String) -> CacheEntry {
        CacheEntry {
            value,
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        }
    }
}

#[async_trait]
impl ClusterCache for MemoryClusterCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), CacheError> {
        let entry = self.entry(value);
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: String) -> Result<bool, CacheError> {
        let now = Instant::now();
        let fresh = self.entry(value);
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    Ok(false)
                } else {
                    occupied.insert(fresh);
                    Ok(true)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

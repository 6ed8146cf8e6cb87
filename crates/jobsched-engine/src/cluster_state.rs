//! Typed view over the shared cluster cache.
//!
//! Per job type three entries are kept:
//!
//! | key                          | value                        | meaning                     |
//! |------------------------------|------------------------------|-----------------------------|
//! | `jobsched:running:{type}`    | [`ClusterRecord`] JSON       | mutual-exclusion token      |
//! | `jobsched:completed:{type}`  | [`ClusterRecord`] JSON       | latest completed run        |
//! | `jobsched:cancel:{type}`     | id of the requesting node    | cancellation requested      |
//!
//! The running entry is taken with put-if-absent and kept alive by the
//! heartbeat. There are no fencing tokens: if a refresh is delayed past the
//! cache expiry another node may acquire the type and run it concurrently.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use jobsched_protocols::{ClusterCache, JobType, Progress};

use crate::error::EngineError;

const RUNNING_PREFIX: &str = "jobsched:running:";
const COMPLETED_PREFIX: &str = "jobsched:completed:";
const CANCEL_PREFIX: &str = "jobsched:cancel:";

/// A progress record as shared with the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub node_id: String,
    pub progress: Progress,
}

/// Cluster-shared running, completed and cancellation state per job type.
#[derive(Clone)]
pub struct ClusterJobState {
    cache: Arc<dyn ClusterCache>,
    node_id: String,
}

impl ClusterJobState {
    pub fn new(cache: Arc<dyn ClusterCache>, node_id: impl Into<String>) -> Self {
        Self {
            cache,
            node_id: node_id.into(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Take the mutual-exclusion token for `job_type`.
    pub async fn try_acquire(&self, job_type: JobType, progress: &Progress) -> Result<bool, EngineError> {
        let value = self.encode(progress)?;
        Ok(self.cache.put_if_absent(&running_key(job_type), value).await?)
    }

    /// Refresh the liveness record of a type this node runs.
    ///
    /// Returns `false` without writing when another node holds the token.
    /// An expired token is taken back only if no other node took it first.
    pub async fn refresh(&self, job_type: JobType, progress: &Progress) -> Result<bool, EngineError> {
        let key = running_key(job_type);
        let value = self.encode(progress)?;
        match self.read(&key).await?.map(|r| r.node_id) {
            Some(owner) if owner != self.node_id => Ok(false),
            Some(_) => {
                self.cache.put(&key, value).await?;
                Ok(true)
            }
            None => Ok(self.cache.put_if_absent(&key, value).await?),
        }
    }

    /// Give the token back, if this node holds it.
    pub async fn release(&self, job_type: JobType) -> Result<(), EngineError> {
        let key = running_key(job_type);
        match self.read(&key).await? {
            Some(record) if record.node_id != self.node_id => {
                warn!(
                    job_type = %job_type,
                    owner = %record.node_id,
                    "Cluster token is held by another node, not releasing"
                );
            }
            Some(_) => self.cache.invalidate(&key).await?,
            None => {}
        }
        Ok(())
    }

    pub async fn is_running(&self, job_type: JobType) -> Result<bool, EngineError> {
        Ok(self.cache.get(&running_key(job_type)).await?.is_some())
    }

    pub async fn running_types(&self) -> Result<Vec<JobType>, EngineError> {
        self.types_with_prefix(RUNNING_PREFIX).await
    }

    pub async fn completed_types(&self) -> Result<Vec<JobType>, EngineError> {
        self.types_with_prefix(COMPLETED_PREFIX).await
    }

    pub async fn running_record(&self, job_type: JobType) -> Result<Option<ClusterRecord>, EngineError> {
        self.read(&running_key(job_type)).await
    }

    pub async fn completed_record(&self, job_type: JobType) -> Result<Option<ClusterRecord>, EngineError> {
        self.read(&completed_key(job_type)).await
    }

    /// Publish a completed record unless the cluster already holds one that
    /// completed at the same time or later.
    pub async fn publish_completed_if_newer(
        &self,
        job_type: JobType,
        progress: &Progress,
    ) -> Result<bool, EngineError> {
        let Some(local) = progress.completed_at() else {
            return Ok(false);
        };
        let key = completed_key(job_type);
        let remote = self.read(&key).await?.and_then(|r| r.progress.completed_at());
        if remote.is_some_and(|remote| remote >= local) {
            return Ok(false);
        }
        self.cache.put(&key, self.encode(progress)?).await?;
        Ok(true)
    }

    pub async fn request_cancel(&self, job_type: JobType) -> Result<(), EngineError> {
        self.cache.put(&cancel_key(job_type), self.node_id.clone()).await?;
        Ok(())
    }

    pub async fn is_cancel_requested(&self, job_type: JobType) -> Result<bool, EngineError> {
        Ok(self.cache.get(&cancel_key(job_type)).await?.is_some())
    }

    pub async fn clear_cancel(&self, job_type: JobType) -> Result<(), EngineError> {
        self.cache.invalidate(&cancel_key(job_type)).await?;
        Ok(())
    }

    fn encode(&self, progress: &Progress) -> Result<String, EngineError> {
        let record = ClusterRecord {
            node_id: self.node_id.clone(),
            progress: progress.clone(),
        };
        Ok(serde_json::to_string(&record)?)
    }

    async fn read(&self, key: &str) -> Result<Option<ClusterRecord>, EngineError> {
        match self.cache.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn types_with_prefix(&self, prefix: &str) -> Result<Vec<JobType>, EngineError> {
        let mut types: Vec<JobType> = self
            .cache
            .keys()
            .await?
            .iter()
            .filter_map(|key| key.strip_prefix(prefix))
            .filter_map(|name| JobType::from_str(name).ok())
            .collect();
        types.sort();
        types.dedup();
        Ok(types)
    }
}

fn running_key(job_type: JobType) -> String {
    format!("{RUNNING_PREFIX}{}", job_type.as_str())
}

fn completed_key(job_type: JobType) -> String {
    format!("{COMPLETED_PREFIX}{}", job_type.as_str())
}

fn cancel_key(job_type: JobType) -> String {
    format!("{CANCEL_PREFIX}{}", job_type.as_str())
}

/// The record with the later completion time; `local` on ties.
pub(crate) fn later_completed(local: Option<Progress>, remote: Option<Progress>) -> Option<Progress> {
    match (local, remote) {
        (Some(local), Some(remote)) => {
            if remote.completed_at() > local.completed_at() {
                Some(remote)
            } else {
                Some(local)
            }
        }
        (local, remote) => local.or(remote),
    }
}

#[cfg(test)]
#[path = "cluster_state_tests.rs"]
mod tests;

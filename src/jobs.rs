//! Job bodies registered by the daemon.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use jobsched_core::{JobRegistry, RegistryError, run_stage, run_stage_with};
use jobsched_engine::ClusterJobState;
use jobsched_protocols::{
    ClusterCache, FailurePolicy, Job, JobConfiguration, JobError, JobProgress, JobType,
};

/// Register the built-in bodies for every job type.
pub(crate) fn register_builtin_jobs(
    registry: &JobRegistry,
    cache: Arc<dyn ClusterCache>,
    node_id: &str,
) -> Result<(), RegistryError> {
    registry.register(Arc::new(ProbeJob::new(cache, node_id)))?;
    for job_type in JobType::ALL.iter().copied().filter(|t| *t != JobType::Probe) {
        registry.register(Arc::new(LogOnlyJob { job_type }))?;
    }
    Ok(())
}

/// Checks that the cluster cache is usable from this node and reports which
/// node holds each running token.
pub(crate) struct ProbeJob {
    cache: Arc<dyn ClusterCache>,
    cluster: ClusterJobState,
    node_id: String,
}

impl ProbeJob {
    pub(crate) fn new(cache: Arc<dyn ClusterCache>, node_id: &str) -> Self {
        Self {
            cluster: ClusterJobState::new(cache.clone(), node_id),
            cache,
            node_id: node_id.to_string(),
        }
    }

    async fn round_trip(&self) -> Result<(), JobError> {
        let key = format!("jobsched:probe:{}", self.node_id);
        let value = Utc::now().to_rfc3339();
        self.cache.put(&key, value.clone()).await.map_err(JobError::failed)?;
        let read = self.cache.get(&key).await.map_err(JobError::failed)?;
        self.cache.invalidate(&key).await.map_err(JobError::failed)?;
        match read {
            Some(read) if read == value => Ok(()),
            other => Err(JobError::failed(format!("read back {other:?}, wrote {value}"))),
        }
    }

    async fn holder(&self, job_type: JobType) -> Result<Option<String>, JobError> {
        let record = self
            .cluster
            .running_record(job_type)
            .await
            .map_err(JobError::failed)?
            .ok_or_else(|| JobError::failed(format!("{job_type} token expired")))?;
        Ok(Some(format!("held by {}", record.node_id)))
    }
}

#[async_trait]
impl Job for ProbeJob {
    fn job_type(&self) -> JobType {
        JobType::Probe
    }

    async fn execute(
        &self,
        _configuration: &JobConfiguration,
        progress: Arc<dyn JobProgress>,
    ) -> Result<(), JobError> {
        progress.starting_process("Cluster probe");

        run_stage_with(
            progress.as_ref(),
            "Cache round trip",
            FailurePolicy::Fail,
            self.round_trip(),
        )
        .await?;

        let running = self.cluster.running_types().await.map_err(JobError::failed)?;
        let count = running.len();
        let completed = run_stage(
            progress.as_ref(),
            "Inspect running tokens",
            FailurePolicy::SkipItem,
            running,
            |job_type| job_type.to_string(),
            |job_type| self.holder(job_type),
        )
        .await;
        if !completed {
            return Err(JobError::Cancelled);
        }

        progress.completed_process(Some(&format!("{count} running tokens inspected")));
        Ok(())
    }
}

/// Placeholder body for job types whose business logic lives outside the
/// scheduler: logs the run and its parameters.
pub(crate) struct LogOnlyJob {
    job_type: JobType,
}

#[async_trait]
impl Job for LogOnlyJob {
    fn job_type(&self) -> JobType {
        self.job_type
    }

    async fn execute(
        &self,
        configuration: &JobConfiguration,
        progress: Arc<dyn JobProgress>,
    ) -> Result<(), JobError> {
        if !configuration.parameters_match_type() {
            return Err(JobError::InvalidParameters(format!(
                "parameters do not belong to {}",
                self.job_type
            )));
        }
        progress.starting_process(&format!("{} run", self.job_type));
        let parameters = match &configuration.parameters {
            Some(p) => serde_json::to_string(p).map_err(JobError::failed)?,
            None => "none".to_string(),
        };
        info!(
            uid = %configuration.uid,
            job_type = %self.job_type,
            parameters = %parameters,
            "No body installed for job type, recording run only"
        );
        progress.completed_process(None);
        Ok(())
    }
}

//! Periodic reconciliation of local state with the cluster.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use jobsched_protocols::{JobType, Progress};

use crate::engine::EngineInner;

/// Spawn the heartbeat loop; it ends when the engine shuts down.
pub(crate) fn spawn(inner: Arc<EngineInner>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(inner.heartbeat_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = inner.shutdown.cancelled() => {
                    debug!("Heartbeat stopped");
                    break;
                }
                _ = interval.tick() => beat(&inner).await,
            }
        }
    })
}

/// One heartbeat cycle.
///
/// For every type running here: honor a cluster cancellation request, or
/// refresh the liveness record. Then publish every local completed record
/// that is newer than the cluster's.
pub(crate) async fn beat(inner: &EngineInner) {
    let running: Vec<JobType> = inner.running.iter().map(|e| *e.key()).collect();
    for job_type in running {
        match inner.cluster.is_cancel_requested(job_type).await {
            Ok(true) => cancel_requested(inner, job_type).await,
            Ok(false) => refresh(inner, job_type).await,
            Err(e) => warn!(job_type = %job_type, "Failed to read cancellation flag: {}", e),
        }
    }

    let completed: Vec<(JobType, Progress)> = inner
        .completed
        .iter()
        .map(|e| (*e.key(), e.value().clone()))
        .collect();
    for (job_type, record) in completed {
        match inner.cluster.publish_completed_if_newer(job_type, &record).await {
            Ok(true) => debug!(job_type = %job_type, "Published completed progress"),
            Ok(false) => {}
            Err(e) => warn!(job_type = %job_type, "Failed to publish completed progress: {}", e),
        }
    }
}

async fn cancel_requested(inner: &EngineInner, job_type: JobType) {
    let interrupted = inner
        .running
        .get(&job_type)
        .is_some_and(|handle| handle.interrupt());
    info!(job_type = %job_type, interrupted, "Cluster cancellation request received");
    if let Err(e) = inner.cluster.clear_cancel(job_type).await {
        warn!(job_type = %job_type, "Failed to clear cancellation flag: {}", e);
    }
}

async fn refresh(inner: &EngineInner, job_type: JobType) {
    let Some((uid, snapshot)) = inner
        .active
        .get(&job_type)
        .map(|run| (run.uid.clone(), run.progress.snapshot()))
    else {
        return;
    };

    match inner.cluster.refresh(job_type, &snapshot).await {
        Ok(true) => {
            let now = Utc::now();
            inner.update_state(&uid, |c| c.last_alive = Some(now));
        }
        Ok(false) => warn!(
            job_type = %job_type,
            "Cluster token of a local run is held by another node"
        ),
        Err(e) => warn!(job_type = %job_type, "Failed to refresh liveness record: {}", e),
    }
}

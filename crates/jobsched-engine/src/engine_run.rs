//! Submission handshake and the run wrapper around job bodies.

use std::sync::{Arc, Weak};

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{OnceCell, oneshot};
use tracing::{debug, error, info, warn};

use jobsched_core::{NotifierJobProgress, RecordingJobProgress, RunOutcome};
use jobsched_protocols::{JobConfiguration, JobError, JobProgress, JobStatus};

use crate::engine::{ActiveRun, EngineInner};
use crate::handle::TaskHandle;
use crate::task_scheduler::Runnable;

/// Receives a task's own cancel handle once the submitter recorded it.
///
/// The receiver is consumed on the first fire; later fires of a recurring
/// trigger reuse the resolved handle.
pub(crate) struct HandleSlot {
    receiver: Mutex<Option<oneshot::Receiver<TaskHandle>>>,
    handle: OnceCell<TaskHandle>,
}

impl HandleSlot {
    fn new(receiver: oneshot::Receiver<TaskHandle>) -> Self {
        Self {
            receiver: Mutex::new(Some(receiver)),
            handle: OnceCell::new(),
        }
    }

    async fn resolve(&self) -> Option<TaskHandle> {
        self.handle
            .get_or_try_init(|| async {
                let receiver = self.receiver.lock().take().ok_or(())?;
                receiver.await.map_err(|_| ())
            })
            .await
            .ok()
            .cloned()
    }
}

impl EngineInner {
    /// Wrap the run of `configuration` into a task for the scheduler.
    ///
    /// The task waits for its own handle on the returned sender before it
    /// touches any state, so the submitter must send the handle after it
    /// recorded it.
    pub(crate) fn prepare(
        self: &Arc<Self>,
        configuration: JobConfiguration,
    ) -> (Runnable, oneshot::Sender<TaskHandle>) {
        let (sender, receiver) = oneshot::channel();
        let slot = Arc::new(HandleSlot::new(receiver));
        let engine: Weak<EngineInner> = Arc::downgrade(self);
        let configuration = Arc::new(configuration);

        let task: Runnable = Arc::new(move || {
            let engine = engine.clone();
            let slot = slot.clone();
            let configuration = configuration.clone();
            async move {
                if let Some(engine) = engine.upgrade() {
                    engine.run(&configuration, &slot).await;
                }
            }
            .boxed()
        });
        (task, sender)
    }

    async fn run(self: &Arc<Self>, submitted: &JobConfiguration, slot: &HandleSlot) {
        let job_type = submitted.job_type;
        let Some(handle) = slot.resolve().await else {
            warn!(job_type = %job_type, uid = %submitted.uid, "No cancel handle available, aborting run");
            return;
        };

        if !handle.is_recurring() {
            self.scheduled.remove_if(&job_type, |_, h| h.same(&handle));
        }

        let Some(job) = self.registry.get(job_type) else {
            warn!(job_type = %job_type, "No job registered for type, skipping run");
            return;
        };

        match self.running.entry(job_type) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_done() && !occupied.get().same(&handle) {
                    debug!(job_type = %job_type, uid = %submitted.uid, "Already running locally, skipping run");
                    return;
                }
                occupied.insert(handle.clone());
            }
            Entry::Vacant(vacant) => {
                vacant.insert(handle.clone());
            }
        }

        let configuration = self.current(submitted);
        let token = handle.run_token();
        let tracker: Arc<dyn JobProgress> =
            Arc::new(NotifierJobProgress::new(self.notifier.clone(), &configuration));
        let progress = Arc::new(RecordingJobProgress::new(&configuration, token.clone(), tracker));

        match self.cluster.try_acquire(job_type, &progress.snapshot()).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(job_type = %job_type, uid = %configuration.uid, "Running on another node, skipping run");
                self.running.remove_if(&job_type, |_, h| h.same(&handle));
                return;
            }
            Err(e) => {
                warn!(job_type = %job_type, "Failed to acquire cluster token, skipping run: {}", e);
                self.running.remove_if(&job_type, |_, h| h.same(&handle));
                return;
            }
        }
        if let Err(e) = self.cluster.clear_cancel(job_type).await {
            warn!(job_type = %job_type, "Failed to clear stale cancellation flag: {}", e);
        }

        self.active.insert(
            job_type,
            ActiveRun {
                uid: configuration.uid.clone(),
                progress: progress.clone(),
            },
        );
        let started_at = Utc::now();
        self.update_state(&configuration.uid, |c| {
            c.job_status = JobStatus::Running;
            c.last_executed = Some(started_at);
            c.last_alive = Some(started_at);
        });
        info!(job_type = %job_type, uid = %configuration.uid, node_id = %self.node_id, "Job started");

        let body_configuration = self.current(&configuration);
        let body_progress: Arc<dyn JobProgress> = progress.clone();
        let result = tokio::spawn(async move { job.execute(&body_configuration, body_progress).await }).await;

        let (mut status, failure) = match result {
            Ok(Ok(())) => (JobStatus::Completed, None),
            Ok(Err(JobError::Cancelled)) if handle.is_interrupted() || token.is_cancelled() => {
                (JobStatus::Running, None)
            }
            Ok(Err(JobError::Cancelled)) => {
                (JobStatus::Failed, Some("Aborted after a failed stage".to_string()))
            }
            Ok(Err(e)) => {
                error!(job_type = %job_type, uid = %configuration.uid, "Job failed: {}", e);
                (JobStatus::Failed, Some(e.to_string()))
            }
            Err(e) => {
                error!(job_type = %job_type, uid = %configuration.uid, "Job panicked: {}", e);
                (JobStatus::Failed, Some(format!("Job panicked: {e}")))
            }
        };

        self.cleanup(&configuration, &handle, &progress, &mut status, failure).await;
    }

    /// Reconcile state after a run, whatever its outcome.
    async fn cleanup(
        &self,
        configuration: &JobConfiguration,
        handle: &TaskHandle,
        progress: &RecordingJobProgress,
        status: &mut JobStatus,
        failure: Option<String>,
    ) {
        let job_type = configuration.job_type;
        if handle.is_interrupted() && matches!(*status, JobStatus::Running | JobStatus::Completed) {
            *status = JobStatus::Stopped;
        }

        let outcome = match (*status, failure) {
            (JobStatus::Failed, Some(error)) => RunOutcome::Failed(error),
            (JobStatus::Failed, None) => RunOutcome::Failed("Job failed".to_string()),
            (JobStatus::Stopped | JobStatus::Running, _) => RunOutcome::Cancelled,
            _ => RunOutcome::Succeeded,
        };
        let record = progress.finish(outcome);
        self.completed.insert(job_type, record.clone());
        self.active.remove(&job_type);

        let final_status = *status;
        let pending = handle.is_recurring() && !handle.is_cancelled();
        let finished_at = Utc::now();
        self.update_state(&configuration.uid, |c| {
            c.last_executed_status = final_status;
            c.last_finished = Some(finished_at);
            c.job_status = if pending { JobStatus::Scheduled } else { final_status };
        });

        self.running.remove_if(&job_type, |_, h| h.same(handle));

        if let Err(e) = self.cluster.release(job_type).await {
            warn!(job_type = %job_type, "Failed to release cluster token: {}", e);
        }
        if let Err(e) = self.cluster.publish_completed_if_newer(job_type, &record).await {
            warn!(job_type = %job_type, "Failed to publish completed progress: {}", e);
        }

        info!(job_type = %job_type, uid = %configuration.uid, status = ?final_status, "Job finished");

        let mut finished = self.current(configuration);
        if !configuration.has_identity() {
            finished.last_executed_status = final_status;
            finished.last_finished = Some(finished_at);
            finished.job_status = final_status;
        }
        for listener in &self.listeners {
            listener.on_run_finished(&finished).await;
        }
    }
}

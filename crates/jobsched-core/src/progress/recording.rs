//! Progress sink that records the run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use jobsched_protocols::{FailurePolicy, JobConfiguration, JobProgress, Progress};

/// How a job body finished, as observed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed(String),
    Cancelled,
}

/// Builds the [`Progress`] record of one run.
///
/// Every event is applied to the record and then forwarded to the inner
/// tracker (usually a [`NotifierJobProgress`](super::NotifierJobProgress)).
/// Cancellation is requested when the run token is cancelled or after a
/// failure whose policy resolves to [`FailurePolicy::Fail`].
pub struct RecordingJobProgress {
    name: String,
    job_id: Option<String>,
    user_id: Option<String>,
    record: Mutex<Progress>,
    token: CancellationToken,
    aborted: AtomicBool,
    skip_stage: AtomicBool,
    tracker: Arc<dyn JobProgress>,
}

impl RecordingJobProgress {
    pub fn new(
        configuration: &JobConfiguration,
        token: CancellationToken,
        tracker: Arc<dyn JobProgress>,
    ) -> Self {
        let name = if configuration.name.trim().is_empty() {
            configuration.job_type.to_string()
        } else {
            configuration.name.clone()
        };
        Self {
            name,
            job_id: configuration.has_identity().then(|| configuration.uid.clone()),
            user_id: configuration.executed_by.clone(),
            record: Mutex::new(Progress::new()),
            token,
            aborted: AtomicBool::new(false),
            skip_stage: AtomicBool::new(false),
            tracker,
        }
    }

    /// Copy of the record as it is right now.
    pub fn snapshot(&self) -> Progress {
        self.record.lock().clone()
    }

    /// Whether a failure aborted the run.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Close every open node according to `outcome` and return the final record.
    ///
    /// A body that never reported anything still gets a closed process, so
    /// the record always carries a completion time.
    pub fn finish(&self, outcome: RunOutcome) -> Progress {
        self.ensure_process();
        let was_open = {
            let mut record = self.record.lock();
            let now = Utc::now();
            let was_open = record.open_process().is_some();
            match &outcome {
                RunOutcome::Succeeded => record.complete_process(None, now),
                RunOutcome::Failed(error) => record.fail_process(error, now),
                RunOutcome::Cancelled => record.cancel_process(now),
            }
            was_open
        };
        if was_open {
            match &outcome {
                RunOutcome::Succeeded => self.tracker.completed_process(None),
                RunOutcome::Failed(error) => self.tracker.failed_process(error),
                RunOutcome::Cancelled => self.tracker.failed_process("Job was cancelled"),
            }
        }
        self.snapshot()
    }

    fn ensure_process(&self) {
        let started = {
            let mut record = self.record.lock();
            if record.open_process().is_some() || record.is_complete() {
                false
            } else {
                record.start_process(&self.name, self.job_id.clone(), self.user_id.clone(), Utc::now());
                true
            }
        };
        if started {
            self.tracker.starting_process(&self.name);
        }
    }

    fn abort(&self, reason: &str) {
        if !self.aborted.swap(true, Ordering::SeqCst) {
            debug!(job = %self.name, "Run aborted by failure policy: {}", reason);
        }
    }
}

impl JobProgress for RecordingJobProgress {
    fn is_cancellation_requested(&self) -> bool {
        self.token.is_cancelled() || self.is_aborted()
    }

    fn is_skip_current_stage(&self) -> bool {
        self.skip_stage.load(Ordering::SeqCst)
    }

    fn starting_process(&self, description: &str) {
        self.record
            .lock()
            .start_process(description, self.job_id.clone(), self.user_id.clone(), Utc::now());
        self.tracker.starting_process(description);
    }

    fn completed_process(&self, summary: Option<&str>) {
        self.record.lock().complete_process(summary, Utc::now());
        self.tracker.completed_process(summary);
    }

    fn failed_process(&self, error: &str) {
        self.record.lock().fail_process(error, Utc::now());
        self.tracker.failed_process(error);
    }

    fn starting_stage(&self, description: &str, work_items: Option<usize>, on_failure: FailurePolicy) {
        self.ensure_process();
        self.skip_stage.store(false, Ordering::SeqCst);
        self.record
            .lock()
            .start_stage(description, work_items, on_failure, Utc::now());
        self.tracker.starting_stage(description, work_items, on_failure);
    }

    fn completed_stage(&self, summary: Option<&str>) {
        self.record.lock().complete_stage(summary, Utc::now());
        self.tracker.completed_stage(summary);
    }

    fn failed_stage(&self, error: &str) {
        let policy = {
            let mut record = self.record.lock();
            let policy = record
                .open_stage()
                .map(|s| s.on_failure.resolve(FailurePolicy::Fail));
            record.fail_stage(error, Utc::now());
            policy
        };
        if matches!(policy, Some(FailurePolicy::Fail | FailurePolicy::SkipItemOutlier)) {
            self.abort(error);
        }
        self.tracker.failed_stage(error);
    }

    fn starting_work_item(&self, description: &str, on_failure: FailurePolicy) {
        if !self.record.lock().start_item(description, on_failure, Utc::now()) {
            debug!(job = %self.name, "Work item '{}' reported outside of a stage", description);
        }
        self.tracker.starting_work_item(description, on_failure);
    }

    fn completed_work_item(&self, summary: Option<&str>) {
        self.record.lock().complete_item(summary, Utc::now());
        self.tracker.completed_work_item(summary);
    }

    fn failed_work_item(&self, error: &str) {
        let policy = {
            let mut record = self.record.lock();
            let policy = record.open_stage().and_then(|stage| {
                let stage_policy = stage.on_failure.resolve(FailurePolicy::Fail);
                stage
                    .items
                    .last()
                    .filter(|i| !i.node.is_complete())
                    .map(|i| i.on_failure.resolve(stage_policy))
            });
            record.fail_item(error, Utc::now());
            policy
        };
        match policy {
            Some(FailurePolicy::Fail) => self.abort(error),
            Some(FailurePolicy::SkipStage) => self.skip_stage.store(true, Ordering::SeqCst),
            _ => {}
        }
        self.tracker.failed_work_item(error);
    }
}

#[cfg(test)]
#[path = "recording_tests.rs"]
mod tests;

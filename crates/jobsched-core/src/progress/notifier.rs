//! Progress sink forwarding events to a [`Notifier`].

use std::sync::Arc;

use jobsched_protocols::{
    FailurePolicy, JobConfiguration, JobProgress, JobType, Notification, NotificationLevel,
    Notifier,
};

/// Turns progress events into human readable notifications keyed by job.
///
/// Process events are `info`/`error`, stage events `info`/`warn` and work
/// item events `debug`/`warn`. Process completion and failure are flagged
/// as the final message of the run.
pub struct NotifierJobProgress {
    notifier: Arc<dyn Notifier>,
    job_uid: String,
    job_type: JobType,
}

impl NotifierJobProgress {
    pub fn new(notifier: Arc<dyn Notifier>, configuration: &JobConfiguration) -> Self {
        Self {
            notifier,
            job_uid: configuration.uid.clone(),
            job_type: configuration.job_type,
        }
    }

    fn send(&self, level: NotificationLevel, message: String, completed: bool) {
        let mut notification = Notification::new(self.job_uid.clone(), self.job_type, level, message);
        if completed {
            notification = notification.completed();
        }
        self.notifier.notify(notification);
    }
}

fn with_summary(prefix: &str, summary: Option<&str>) -> String {
    match summary {
        Some(s) if !s.is_empty() => format!("{prefix}: {s}"),
        _ => prefix.to_string(),
    }
}

impl JobProgress for NotifierJobProgress {
    fn is_cancellation_requested(&self) -> bool {
        false
    }

    fn starting_process(&self, description: &str) {
        self.send(NotificationLevel::Info, format!("Process started: {description}"), false);
    }

    fn completed_process(&self, summary: Option<&str>) {
        self.send(NotificationLevel::Info, with_summary("Process completed", summary), true);
    }

    fn failed_process(&self, error: &str) {
        self.send(NotificationLevel::Error, format!("Process failed: {error}"), true);
    }

    fn starting_stage(&self, description: &str, work_items: Option<usize>, _on_failure: FailurePolicy) {
        let message = match work_items {
            Some(n) => format!("Stage started: {description} ({n} items)"),
            None => format!("Stage started: {description}"),
        };
        self.send(NotificationLevel::Info, message, false);
    }

    fn completed_stage(&self, summary: Option<&str>) {
        self.send(NotificationLevel::Info, with_summary("Stage completed", summary), false);
    }

    fn failed_stage(&self, error: &str) {
        self.send(NotificationLevel::Warn, format!("Stage failed: {error}"), false);
    }

    fn starting_work_item(&self, description: &str, _on_failure: FailurePolicy) {
        self.send(NotificationLevel::Debug, format!("Item started: {description}"), false);
    }

    fn completed_work_item(&self, summary: Option<&str>) {
        self.send(NotificationLevel::Debug, with_summary("Item completed", summary), false);
    }

    fn failed_work_item(&self, error: &str) {
        self.send(NotificationLevel::Warn, format!("Item failed: {error}"), false);
    }
}

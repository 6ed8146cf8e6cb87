//! Notification channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job_type::JobType;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A human readable message about a running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub job_uid: String,
    pub job_type: JobType,
    pub level: NotificationLevel,
    pub message: String,
    /// Set on the final message of a run.
    pub completed: bool,
    pub time: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        job_uid: impl Into<String>,
        job_type: JobType,
        level: NotificationLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_uid: job_uid.into(),
            job_type,
            level,
            message: message.into(),
            completed: false,
            time: Utc::now(),
        }
    }

    /// Mark this as the final message of a run.
    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }
}

/// Receives start, progress, completion and error messages keyed by job.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

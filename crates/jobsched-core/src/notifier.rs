//! Notification channels.

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use jobsched_protocols::{Notification, NotificationLevel, Notifier};

/// Emits notifications as `tracing` events with target `jobsched::notify`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        let job_type = n.job_type.as_str();
        match n.level {
            NotificationLevel::Debug => {
                debug!(target: "jobsched::notify", job_uid = %n.job_uid, job_type, completed = n.completed, "{}", n.message)
            }
            NotificationLevel::Info => {
                info!(target: "jobsched::notify", job_uid = %n.job_uid, job_type, completed = n.completed, "{}", n.message)
            }
            NotificationLevel::Warn => {
                warn!(target: "jobsched::notify", job_uid = %n.job_uid, job_type, completed = n.completed, "{}", n.message)
            }
            NotificationLevel::Error => {
                error!(target: "jobsched::notify", job_uid = %n.job_uid, job_type, completed = n.completed, "{}", n.message)
            }
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Notifications of one job.
    pub fn for_job(&self, job_uid: &str) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.job_uid == job_uid)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().push(notification);
    }
}

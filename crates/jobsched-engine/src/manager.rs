//! The scheduling manager contract.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use jobsched_protocols::{JobConfiguration, JobType, Progress};

/// Public operations for scheduling, executing, stopping and inspecting jobs.
///
/// None of these calls runs a job body on the caller's task; they only
/// update bookkeeping and submit or cancel handles. Expected failures are
/// reported as `false`, never as errors.
#[async_trait]
pub trait SchedulingManager: Send + Sync {
    /// Install or replace the trigger for the configuration's job type.
    ///
    /// A previous pending trigger of the type is cancelled. A run in
    /// progress is not affected. If the previous one-shot trigger already
    /// started, the replacement is dropped and `false` returned.
    async fn schedule(&self, configuration: &JobConfiguration) -> bool;

    /// One-shot trigger at `start_time`, with the replacement semantics of
    /// [`schedule`](Self::schedule).
    async fn schedule_with_start_time(
        &self,
        configuration: &JobConfiguration,
        start_time: DateTime<Utc>,
    ) -> bool;

    /// Withdraw the pending trigger of the configuration's job type.
    async fn unschedule(&self, configuration: &JobConfiguration) -> bool;

    /// Request cancellation of a running execution of the configuration's
    /// job type on this node.
    ///
    /// Returns `true` when nothing is running or the interrupt was accepted,
    /// `false` when the configuration has no identity.
    async fn stop(&self, configuration: &JobConfiguration) -> bool;

    /// Best-effort check whether a trigger is pending.
    async fn is_scheduled(&self, _configuration: &JobConfiguration) -> bool {
        false
    }

    /// Submit the configuration for immediate execution.
    ///
    /// Returns `false` if a job of the same type is running anywhere in the
    /// cluster. Acceptance does not guarantee this submission wins against
    /// a concurrently fired trigger of the same type; the loser is dropped.
    async fn execute_now(&self, configuration: &JobConfiguration) -> bool;

    /// Cooperative cluster-wide cancellation of a running job type.
    ///
    /// Returns `false` when the type is not running anywhere.
    async fn cancel(&self, job_type: JobType) -> bool;

    /// Whether a job of the type is running on this node or in the cluster.
    async fn is_running(&self, job_type: JobType) -> bool;

    /// Job types running on this node or reported by the cluster.
    async fn running_types(&self) -> BTreeSet<JobType>;

    /// Job types with a completed record, locally or in the cluster.
    async fn completed_types(&self) -> BTreeSet<JobType>;

    /// Progress of the running job of a type, local record first.
    async fn running_progress(&self, job_type: JobType) -> Option<Progress>;

    /// Progress of the most recently completed run of a type.
    ///
    /// When the local and the cluster record disagree the one with the later
    /// completion time wins.
    async fn completed_progress(&self, job_type: JobType) -> Option<Progress>;
}

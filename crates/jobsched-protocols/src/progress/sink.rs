//! Progress sink trait.

use serde::{Deserialize, Serialize};

/// What to do when a stage or work item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailurePolicy {
    /// Use the policy of the enclosing node.
    #[default]
    Parent,
    /// Abort the whole process.
    Fail,
    /// Skip the remainder of the current stage, continue with the next.
    SkipStage,
    /// Skip the failed item, continue with the next one.
    SkipItem,
    /// Skip failed items unless every item of the stage fails.
    SkipItemOutlier,
}

impl FailurePolicy {
    /// Resolve `Parent` against the policy of the enclosing node.
    pub fn resolve(self, parent: FailurePolicy) -> FailurePolicy {
        match self {
            FailurePolicy::Parent => parent,
            other => other,
        }
    }
}

/// Sink a running job reports structured progress into.
///
/// Progress forms a hierarchy: a process consists of stages, a stage of
/// work items. Every level has start, success and failure events. Sinks are
/// shared between the job body and the engine, so all methods take `&self`.
///
/// Long running bodies must call [`is_cancellation_requested`] at their safe
/// points and return [`JobError::Cancelled`](crate::JobError::Cancelled)
/// when it reports `true`. Cancellation is cooperative; nothing else stops a
/// running body.
///
/// [`is_cancellation_requested`]: JobProgress::is_cancellation_requested
pub trait JobProgress: Send + Sync {
    /// Whether the run should stop at the next safe point.
    fn is_cancellation_requested(&self) -> bool;

    /// Whether the remaining items of the current stage should be skipped.
    fn is_skip_current_stage(&self) -> bool {
        false
    }

    fn starting_process(&self, description: &str);

    fn completed_process(&self, summary: Option<&str>);

    fn failed_process(&self, error: &str);

    /// Start a stage with an optional number of work items.
    fn starting_stage(&self, description: &str, work_items: Option<usize>, on_failure: FailurePolicy);

    fn completed_stage(&self, summary: Option<&str>);

    fn failed_stage(&self, error: &str);

    fn starting_work_item(&self, description: &str, on_failure: FailurePolicy);

    fn completed_work_item(&self, summary: Option<&str>);

    fn failed_work_item(&self, error: &str);
}

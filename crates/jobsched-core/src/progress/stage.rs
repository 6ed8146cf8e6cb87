//! Stage helpers applying a failure policy.

use std::future::Future;

use jobsched_protocols::{FailurePolicy, JobError, JobProgress};

/// Run one work item per element of `items` as a stage.
///
/// Each item's failure is handled according to `on_failure` (`Parent`
/// resolves to `Fail`):
///
/// - `Fail` fails the stage at the first failing item
/// - `SkipStage` fails the stage and skips its remaining items
/// - `SkipItem` skips failing items
/// - `SkipItemOutlier` skips failing items unless every item fails
///
/// Returns `false` when the process should not continue: the stage failed
/// under `Fail`/`SkipItemOutlier` or cancellation was requested.
pub async fn run_stage<T, D, W, Fut>(
    progress: &dyn JobProgress,
    description: &str,
    on_failure: FailurePolicy,
    items: Vec<T>,
    describe: D,
    mut work: W,
) -> bool
where
    D: Fn(&T) -> String,
    W: FnMut(T) -> Fut,
    Fut: Future<Output = Result<Option<String>, JobError>>,
{
    let total = items.len();
    let policy = on_failure.resolve(FailurePolicy::Fail);
    progress.starting_stage(description, Some(total), on_failure);

    let mut failed = 0usize;
    for item in items {
        if progress.is_cancellation_requested() {
            return false;
        }
        if progress.is_skip_current_stage() {
            return true;
        }

        progress.starting_work_item(&describe(&item), FailurePolicy::Parent);
        match work(item).await {
            Ok(summary) => progress.completed_work_item(summary.as_deref()),
            Err(JobError::Cancelled) => return false,
            Err(e) => {
                failed += 1;
                let error = e.to_string();
                progress.failed_work_item(&error);
                match policy {
                    FailurePolicy::Fail => {
                        progress.failed_stage(&error);
                        return false;
                    }
                    FailurePolicy::SkipStage => {
                        progress.failed_stage(&error);
                        return true;
                    }
                    _ => {}
                }
            }
        }
    }

    if policy == FailurePolicy::SkipItemOutlier && total > 0 && failed == total {
        progress.failed_stage(&format!("All {total} items failed"));
        return false;
    }
    progress.completed_stage(Some(&format!("{} of {} items succeeded", total - failed, total)));
    true
}

/// Run `work` as a single-step stage.
///
/// A failure is reported on the stage. Under `SkipStage` and `SkipItem` it
/// is swallowed and `Ok(None)` returned. Under `Fail` and `SkipItemOutlier`
/// (the single step is every item) the error is passed on. Cancellation is
/// always passed on.
pub async fn run_stage_with<T, Fut>(
    progress: &dyn JobProgress,
    description: &str,
    on_failure: FailurePolicy,
    work: Fut,
) -> Result<Option<T>, JobError>
where
    Fut: Future<Output = Result<T, JobError>>,
{
    progress.starting_stage(description, None, on_failure);
    match work.await {
        Ok(value) => {
            progress.completed_stage(None);
            Ok(Some(value))
        }
        Err(JobError::Cancelled) => Err(JobError::Cancelled),
        Err(e) => {
            progress.failed_stage(&e.to_string());
            match on_failure.resolve(FailurePolicy::Fail) {
                FailurePolicy::Fail | FailurePolicy::SkipItemOutlier => Err(e),
                _ => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use jobsched_protocols::{JobConfiguration, JobType, NodeStatus, SchedulingType};
    use tokio_util::sync::CancellationToken;

    use crate::progress::{NoopJobProgress, RecordingJobProgress};

    fn recording() -> RecordingJobProgress {
        let config = JobConfiguration::new("uid", "job", JobType::DataIntegrity, SchedulingType::OnceAsap);
        RecordingJobProgress::new(&config, CancellationToken::new(), Arc::new(NoopJobProgress))
    }

    async fn check(n: u32) -> Result<Option<String>, JobError> {
        if n % 2 == 0 {
            Ok(Some(format!("{n} ok")))
        } else {
            Err(JobError::failed(format!("{n} odd")))
        }
    }

    #[tokio::test]
    async fn test_skip_item_continues() {
        let progress = recording();
        let ok = run_stage(&progress, "checks", FailurePolicy::SkipItem, vec![1, 2, 3, 4], |n| n.to_string(), check).await;
        assert!(ok);

        let record = progress.snapshot();
        let stage = &record.sequence[0].stages[0];
        assert_eq!(stage.items.len(), 4);
        assert_eq!(stage.node.status, NodeStatus::Success);
        assert_eq!(stage.node.summary.as_deref(), Some("2 of 4 items succeeded"));
    }

    #[tokio::test]
    async fn test_fail_stops_at_first_failure() {
        let progress = recording();
        let ok = run_stage(&progress, "checks", FailurePolicy::Parent, vec![2, 3, 4], |n| n.to_string(), check).await;
        assert!(!ok);
        assert!(progress.is_cancellation_requested());

        let record = progress.snapshot();
        let stage = &record.sequence[0].stages[0];
        assert_eq!(stage.items.len(), 2);
        assert_eq!(stage.node.status, NodeStatus::Error);
    }

    #[tokio::test]
    async fn test_skip_stage_moves_on() {
        let progress = recording();
        let ok = run_stage(&progress, "optional", FailurePolicy::SkipStage, vec![1, 2], |n| n.to_string(), check).await;
        assert!(ok);
        assert!(!progress.is_cancellation_requested());

        let record = progress.snapshot();
        assert_eq!(record.sequence[0].stages[0].items.len(), 1);
        assert_eq!(record.sequence[0].stages[0].node.status, NodeStatus::Error);
    }

    #[tokio::test]
    async fn test_skip_item_outlier() {
        let progress = NoopJobProgress;
        assert!(run_stage(&progress, "s", FailurePolicy::SkipItemOutlier, vec![1, 2, 3], |n| n.to_string(), check).await);
        assert!(!run_stage(&progress, "s", FailurePolicy::SkipItemOutlier, vec![1, 3], |n| n.to_string(), check).await);
    }

    #[tokio::test]
    async fn test_cancellation_before_items() {
        let config = JobConfiguration::new("uid", "job", JobType::DataIntegrity, SchedulingType::OnceAsap);
        let token = CancellationToken::new();
        let progress = RecordingJobProgress::new(&config, token.clone(), Arc::new(NoopJobProgress));
        token.cancel();

        let ok = run_stage(&progress, "checks", FailurePolicy::SkipItem, vec![2, 4], |n| n.to_string(), check).await;
        assert!(!ok);
        assert!(progress.snapshot().sequence[0].stages[0].items.is_empty());
    }

    #[tokio::test]
    async fn test_run_stage_with() {
        let progress = NoopJobProgress;
        let value = run_stage_with(&progress, "count", FailurePolicy::Fail, async { Ok::<_, JobError>(7) }).await;
        assert_eq!(value, Ok(Some(7)));

        let skipped = run_stage_with(&progress, "optional", FailurePolicy::SkipStage, async {
            Err::<u32, _>(JobError::failed("nope"))
        })
        .await;
        assert_eq!(skipped, Ok(None));

        let failed = run_stage_with(&progress, "required", FailurePolicy::Parent, async {
            Err::<u32, _>(JobError::failed("nope"))
        })
        .await;
        assert!(matches!(failed, Err(JobError::Failed(_))));
    }

    #[tokio::test]
    async fn test_run_stage_with_single_outlier_aborts() {
        let progress = recording();
        let result = run_stage_with(&progress, "single", FailurePolicy::SkipItemOutlier, async {
            Err::<u32, _>(JobError::failed("x"))
        })
        .await;
        assert!(matches!(result, Err(JobError::Failed(_))));
        assert!(progress.is_cancellation_requested());
        assert!(progress.is_aborted());

        let progress = recording();
        let result = run_stage_with(&progress, "optional", FailurePolicy::SkipItem, async {
            Err::<u32, _>(JobError::failed("x"))
        })
        .await;
        assert_eq!(result, Ok(None));
        assert!(!progress.is_cancellation_requested());
    }
}

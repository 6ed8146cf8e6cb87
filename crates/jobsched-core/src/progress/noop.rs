use jobsched_protocols::{FailurePolicy, JobProgress};

/// A progress sink that ignores every event and never requests cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopJobProgress;

impl JobProgress for NoopJobProgress {
    fn is_cancellation_requested(&self) -> bool {
        false
    }

    fn starting_process(&self, _description: &str) {}

    fn completed_process(&self, _summary: Option<&str>) {}

    fn failed_process(&self, _error: &str) {}

    fn starting_stage(&self, _description: &str, _work_items: Option<usize>, _on_failure: FailurePolicy) {}

    fn completed_stage(&self, _summary: Option<&str>) {}

    fn failed_stage(&self, _error: &str) {}

    fn starting_work_item(&self, _description: &str, _on_failure: FailurePolicy) {}

    fn completed_work_item(&self, _summary: Option<&str>) {}

    fn failed_work_item(&self, _error: &str) {}
}

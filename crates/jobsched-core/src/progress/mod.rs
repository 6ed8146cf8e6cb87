//! Progress sinks and stage helpers.
//!
//! - [`RecordingJobProgress`] builds the [`Progress`](jobsched_protocols::Progress)
//!   record of a run and owns its cancellation state
//! - [`NotifierJobProgress`] turns progress events into notifications
//! - [`NoopJobProgress`] discards everything
//! - [`run_stage`] / [`run_stage_with`] drive a stage under its failure policy

mod noop;
mod notifier;
mod recording;
mod stage;

pub use noop::NoopJobProgress;
pub use notifier::NotifierJobProgress;
pub use recording::{RecordingJobProgress, RunOutcome};
pub use stage::{run_stage, run_stage_with};

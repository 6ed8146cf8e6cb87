//! Progress reporting: the run record and the sink jobs report into.

mod record;
mod sink;

pub use record::{Item, NodeState, NodeStatus, Process, Progress, Stage};
pub use sink::{FailurePolicy, JobProgress};

//! # jobsched Core
//!
//! Building blocks the scheduling engine is assembled from:
//!
//! - [`trigger`] - next execution time of a job configuration
//! - [`progress`] - progress sinks and stage helpers for job bodies
//! - [`cluster`] - in-process [`ClusterCache`](jobsched_protocols::ClusterCache)
//! - [`leader`] - static leadership signal
//! - [`notifier`] - tracing and in-memory notification channels
//! - [`registry`] - job bodies by job type

pub mod cluster;
pub mod error;
pub mod leader;
pub mod notifier;
pub mod progress;
pub mod registry;
pub mod trigger;

pub use cluster::MemoryClusterCache;
pub use error::RegistryError;
pub use leader::StaticLeader;
pub use notifier::{MemoryNotifier, TracingNotifier};
pub use progress::{
    NoopJobProgress, NotifierJobProgress, RecordingJobProgress, RunOutcome, run_stage,
    run_stage_with,
};
pub use registry::JobRegistry;
pub use trigger::{next_execution_time, parse_cron};

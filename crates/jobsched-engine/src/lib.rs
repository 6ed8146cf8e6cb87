//! # jobsched Engine
//!
//! The cluster-aware scheduling engine.
//!
//! ## Overview
//!
//! A caller hands a [`JobConfiguration`](jobsched_protocols::JobConfiguration)
//! to [`SchedulingManager::schedule`] or [`SchedulingManager::execute_now`].
//! The engine turns it into a [`Trigger`], wraps the job body in a
//! cancellation-aware task and submits it to a [`TaskScheduler`]. When the
//! task fires it takes the local and cluster-wide mutual-exclusion tokens for
//! the job type, runs the body and reconciles run state in a cleanup path.
//!
//! A periodic heartbeat pushes liveness to the shared cluster cache, honors
//! cancellation requests from other nodes and publishes the most recently
//! completed progress record per job type.
//!
//! ## Components
//!
//! - [`TaskHandle`] - Cancel handle of a pending trigger or in-flight run
//! - [`TokioTaskScheduler`] - Trigger scheduler and task executor on tokio
//! - [`ClusterJobState`] - Typed view over the shared cluster cache
//! - [`DefaultSchedulingManager`] - The engine
//! - [`SchedulerStart`] - Start-up scheduling of configured jobs

pub mod cluster_state;
pub mod engine;
mod engine_run;
pub mod error;
pub mod handle;
mod heartbeat;
pub mod manager;
pub mod start;
pub mod task_scheduler;

pub use cluster_state::{ClusterJobState, ClusterRecord};
pub use engine::{DefaultSchedulingManager, SchedulingEngineBuilder};
pub use error::EngineError;
pub use handle::TaskHandle;
pub use manager::SchedulingManager;
pub use start::{SchedulerStart, StartReport};
pub use task_scheduler::{Runnable, TaskScheduler, TokioTaskScheduler, Trigger};

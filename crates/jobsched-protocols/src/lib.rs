//! # jobsched Protocols
//!
//! Data model and protocol definitions (traits) for the jobsched
//! scheduling engine. Contains only interface definitions and plain
//! data - no scheduling logic.
//!
//! ## Core Types
//!
//! - [`JobConfiguration`] - One job: type, trigger, queue membership, run state
//! - [`JobType`] - The unit of cluster-wide mutual exclusion
//! - [`Progress`] - Hierarchical process → stage → item run record
//!
//! ## Core Traits
//!
//! - [`Job`] - A job body executed by the engine
//! - [`JobProgress`] - Progress sink a running job reports into
//! - [`ClusterCache`] - Shared key/value store used for cluster coordination
//! - [`LeaderSignal`] - Externally supplied leadership check
//! - [`Notifier`] - Human-readable notification channel
//! - [`RunListener`] - Callback after every finished run

pub mod cluster;
pub mod configuration;
pub mod error;
pub mod job;
pub mod job_type;
pub mod leader;
pub mod listener;
pub mod notify;
pub mod progress;

pub use cluster::ClusterCache;
pub use configuration::{JobConfiguration, JobParameters, JobStatus, SchedulingType};
pub use error::{CacheError, JobError};
pub use job::Job;
pub use job_type::JobType;
pub use leader::LeaderSignal;
pub use listener::RunListener;
pub use notify::{Notification, NotificationLevel, Notifier};
pub use progress::{FailurePolicy, Item, JobProgress, NodeState, NodeStatus, Process, Progress, Stage};

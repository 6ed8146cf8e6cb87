//! Error types for jobsched core.

use jobsched_protocols::JobType;
use thiserror::Error;

/// Errors raised by the [`JobRegistry`](crate::JobRegistry).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Job already registered: {0}")]
    AlreadyRegistered(JobType),

    #[error("Job not found: {0}")]
    NotFound(JobType),
}

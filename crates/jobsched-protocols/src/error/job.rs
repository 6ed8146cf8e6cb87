//! Job body errors.

use thiserror::Error;

/// Outcome of a job body that did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The body observed a cancellation request and stopped early.
    #[error("Job was cancelled")]
    Cancelled,

    /// The body failed.
    #[error("Job failed: {0}")]
    Failed(String),

    /// The parameters do not fit the job.
    #[error("Invalid job parameters: {0}")]
    InvalidParameters(String),
}

impl JobError {
    /// Create a failure from any displayable error.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        JobError::Failed(error.to_string())
    }

    /// Whether this error reports a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled)
    }
}

//! Job body trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::configuration::JobConfiguration;
use crate::error::JobError;
use crate::job_type::JobType;
use crate::progress::JobProgress;

/// The business logic of one job type.
///
/// The engine calls [`execute`](Job::execute) on a runtime worker thread.
/// Bodies that block for long stretches should move that work to
/// `tokio::task::spawn_blocking` and check
/// [`JobProgress::is_cancellation_requested`] between steps.
#[async_trait]
pub trait Job: Send + Sync {
    /// The job type this body implements.
    fn job_type(&self) -> JobType;

    /// Run the job, reporting progress into `progress`.
    ///
    /// Return [`JobError::Cancelled`] after honoring a cancellation request.
    async fn execute(
        &self,
        configuration: &JobConfiguration,
        progress: Arc<dyn JobProgress>,
    ) -> Result<(), JobError>;
}

//! Job body registry.

use std::sync::Arc;

use dashmap::DashMap;

use jobsched_protocols::{Job, JobType};

use crate::error::RegistryError;

/// Job bodies keyed by the job type they implement.
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<JobType, Arc<dyn Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job body.
    ///
    /// Returns an error if a body for the same job type is already registered.
    pub fn register(&self, job: Arc<dyn Job>) -> Result<(), RegistryError> {
        let job_type = job.job_type();
        if self.jobs.contains_key(&job_type) {
            return Err(RegistryError::AlreadyRegistered(job_type));
        }
        self.jobs.insert(job_type, job);
        Ok(())
    }

    pub fn unregister(&self, job_type: JobType) -> Result<(), RegistryError> {
        self.jobs
            .remove(&job_type)
            .ok_or(RegistryError::NotFound(job_type))?;
        Ok(())
    }

    pub fn get(&self, job_type: JobType) -> Option<Arc<dyn Job>> {
        self.jobs.get(&job_type).map(|job| job.clone())
    }

    pub fn contains(&self, job_type: JobType) -> bool {
        self.jobs.contains_key(&job_type)
    }

    /// Registered job types in declaration order.
    pub fn types(&self) -> Vec<JobType> {
        JobType::ALL
            .into_iter()
            .filter(|t| self.jobs.contains_key(t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

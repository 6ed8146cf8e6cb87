//! Start-up scheduling of configured jobs.

use std::sync::Arc;

use tracing::{info, warn};

use jobsched_protocols::{JobConfiguration, JobStatus, LeaderSignal};

use crate::manager::SchedulingManager;

/// What [`SchedulerStart::run`] did, by configuration uid.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub scheduled: Vec<String>,
    pub skipped: Vec<String>,
    pub stale_marked_failed: Vec<String>,
}

/// Schedules the configured jobs when the process starts.
pub struct SchedulerStart {
    manager: Arc<dyn SchedulingManager>,
    leader: Arc<dyn LeaderSignal>,
}

impl SchedulerStart {
    pub fn new(manager: Arc<dyn SchedulingManager>, leader: Arc<dyn LeaderSignal>) -> Self {
        Self { manager, leader }
    }

    /// Mark configurations left `RUNNING` by a previous process as `FAILED`,
    /// then schedule every enabled queue head (or standalone configuration)
    /// if this node is the leader.
    pub async fn run(&self, configurations: &mut [JobConfiguration]) -> StartReport {
        let mut report = StartReport::default();

        for configuration in configurations.iter_mut() {
            if configuration.job_status == JobStatus::Running {
                warn!(
                    uid = %configuration.uid,
                    job_type = %configuration.job_type,
                    "Job was still running when the previous process stopped, marking as failed"
                );
                configuration.job_status = JobStatus::Failed;
                configuration.last_executed_status = JobStatus::Failed;
                report.stale_marked_failed.push(configuration.uid.clone());
            }
        }

        if !self.leader.is_leader() {
            info!("Not the leader, leaving {} jobs unscheduled", configurations.len());
            report.skipped = configurations.iter().map(|c| c.uid.clone()).collect();
            return report;
        }

        for configuration in configurations.iter() {
            let eligible = configuration.enabled && !configuration.is_queue_follower();
            if eligible && self.manager.schedule(configuration).await {
                report.scheduled.push(configuration.uid.clone());
            } else {
                report.skipped.push(configuration.uid.clone());
            }
        }

        info!(
            scheduled = report.scheduled.len(),
            skipped = report.skipped.len(),
            "Scheduler start completed"
        );
        report
    }
}

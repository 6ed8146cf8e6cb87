//! Job configuration data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job_type::JobType;

/// The literal "every second" cron pattern, treated as undefined.
pub const EVERY_SECOND_CRON: &str = "* * * * * ?";

/// Scheduling mode of a job configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulingType {
    /// Recurring trigger computed from a 6-field cron expression.
    Cron,
    /// Recurring trigger `delay` seconds after the previous run.
    FixedDelay,
    /// Single run as soon as possible.
    OnceAsap,
}

/// Run status of a job configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Never triggered.
    NotStarted,
    /// A trigger is pending.
    Scheduled,
    /// An execution is in flight.
    Running,
    /// The last execution finished successfully.
    Completed,
    /// The last execution was cancelled.
    Stopped,
    /// The last execution failed.
    Failed,
    /// The configuration is switched off.
    Disabled,
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::NotStarted
    }
}

/// Type specific parameters of a job configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum JobParameters {
    AnalyticsTable {
        #[serde(default)]
        last_years: Option<u32>,
        #[serde(default)]
        skip_resource_tables: bool,
    },
    DataSync {
        #[serde(default = "default_page_size")]
        page_size: u32,
    },
    MessageSend {
        #[serde(default = "default_page_size")]
        batch_size: u32,
    },
    DataIntegrity {
        #[serde(default)]
        checks: Vec<String>,
    },
}

fn default_page_size() -> u32 {
    100
}

impl JobParameters {
    /// The job type these parameters belong to.
    pub fn job_type(&self) -> JobType {
        match self {
            JobParameters::AnalyticsTable { .. } => JobType::AnalyticsTable,
            JobParameters::DataSync { .. } => JobType::DataSync,
            JobParameters::MessageSend { .. } => JobType::MessageSend,
            JobParameters::DataIntegrity { .. } => JobType::DataIntegrity,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Describes one job: its type, scheduling mode, trigger parameters, queue
/// membership, enablement flag and last-known run status.
///
/// Identity fields are owned by configuration management. The engine only
/// updates the run-state fields (`job_status`, `last_executed_status` and
/// the timestamps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfiguration {
    /// Stable unique id.
    #[serde(default)]
    pub uid: String,

    /// Human readable name.
    #[serde(default)]
    pub name: String,

    pub job_type: JobType,

    pub scheduling_type: SchedulingType,

    /// 6-field cron expression, used with [`SchedulingType::Cron`].
    #[serde(default)]
    pub cron_expression: Option<String>,

    /// Seconds between runs, used with [`SchedulingType::FixedDelay`].
    #[serde(default)]
    pub delay: Option<i64>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub job_status: JobStatus,

    #[serde(default)]
    pub last_executed_status: JobStatus,

    #[serde(default)]
    pub last_executed: Option<DateTime<Utc>>,

    /// May lag behind `last_executed` while a run is in progress.
    #[serde(default)]
    pub last_finished: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_alive: Option<DateTime<Utc>>,

    /// Acting user, used as audit context during the run.
    #[serde(default)]
    pub executed_by: Option<String>,

    #[serde(default)]
    pub queue_name: Option<String>,

    /// Position 0 is driven by a trigger, later positions are chained.
    #[serde(default)]
    pub queue_position: Option<u32>,

    #[serde(default)]
    pub parameters: Option<JobParameters>,
}

impl JobConfiguration {
    /// Create a new enabled configuration with empty run state.
    pub fn new(
        uid: impl Into<String>,
        name: impl Into<String>,
        job_type: JobType,
        scheduling_type: SchedulingType,
    ) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            job_type,
            scheduling_type,
            cron_expression: None,
            delay: None,
            enabled: true,
            job_status: JobStatus::NotStarted,
            last_executed_status: JobStatus::NotStarted,
            last_executed: None,
            last_finished: None,
            last_alive: None,
            executed_by: None,
            queue_name: None,
            queue_position: None,
            parameters: None,
        }
    }

    /// Set the cron expression.
    pub fn with_cron(mut self, expression: impl Into<String>) -> Self {
        self.cron_expression = Some(expression.into());
        self
    }

    /// Set the fixed delay in seconds.
    pub fn with_delay(mut self, seconds: i64) -> Self {
        self.delay = Some(seconds);
        self
    }

    /// Put the configuration into a queue at the given position.
    pub fn with_queue(mut self, name: impl Into<String>, position: u32) -> Self {
        self.queue_name = Some(name.into());
        self.queue_position = Some(position);
        self
    }

    /// Set the acting user.
    pub fn with_executed_by(mut self, user: impl Into<String>) -> Self {
        self.executed_by = Some(user.into());
        self
    }

    /// Set type specific parameters.
    pub fn with_parameters(mut self, parameters: JobParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Set the last executed timestamp.
    pub fn with_last_executed(mut self, time: DateTime<Utc>) -> Self {
        self.last_executed = Some(time);
        self
    }

    /// Switch the configuration off.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether the configuration carries a stable id.
    pub fn has_identity(&self) -> bool {
        !self.uid.trim().is_empty()
    }

    /// The cron expression, unless it is undefined.
    ///
    /// `None`, blank and the "every second" pattern all count as undefined.
    pub fn defined_cron_expression(&self) -> Option<&str> {
        let expression = self.cron_expression.as_deref()?.trim();
        if expression.is_empty() || expression == EVERY_SECOND_CRON {
            None
        } else {
            Some(expression)
        }
    }

    /// The delay, unless it is absent or non-positive.
    pub fn defined_delay(&self) -> Option<i64> {
        self.delay.filter(|d| *d > 0)
    }

    /// Whether the configuration belongs to a queue.
    pub fn is_used_in_queue(&self) -> bool {
        self.queue_name.as_deref().is_some_and(|q| !q.trim().is_empty())
    }

    /// Whether the configuration is chained behind a queue predecessor.
    pub fn is_queue_follower(&self) -> bool {
        self.is_used_in_queue() && self.queue_position.unwrap_or(0) > 0
    }

    /// Whether the parameters, if any, match the job type.
    pub fn parameters_match_type(&self) -> bool {
        self.parameters
            .as_ref()
            .is_none_or(|p| p.job_type() == self.job_type)
    }

    /// Replace the definition fields with those of `other`, keeping run state.
    pub fn update_definition(&mut self, other: &JobConfiguration) {
        self.name = other.name.clone();
        self.job_type = other.job_type;
        self.scheduling_type = other.scheduling_type;
        self.cron_expression = other.cron_expression.clone();
        self.delay = other.delay;
        self.enabled = other.enabled;
        self.executed_by = other.executed_by.clone();
        self.queue_name = other.queue_name.clone();
        self.queue_position = other.queue_position;
        self.parameters = other.parameters.clone();
    }
}

#[cfg(test)]
#[path = "configuration_tests.rs"]
mod tests;

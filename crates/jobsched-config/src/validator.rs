//! Configuration validation.

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use jobsched_core::{next_execution_time, parse_cron};
use jobsched_protocols::{JobType, SchedulingType};

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_engine(config, &mut result);
        Self::validate_jobs(config, &mut result);

        result
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        let engine = &config.engine;

        if engine.heartbeat_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "engine.heartbeat_interval_secs",
                "heartbeat_interval_secs must be greater than 0",
            ));
        }

        if engine.cluster_entry_ttl_secs <= engine.heartbeat_interval_secs {
            result.add_warning(ValidationWarning::new(
                "engine.cluster_entry_ttl_secs",
                format!(
                    "cluster_entry_ttl_secs ({}) should exceed heartbeat_interval_secs ({}), \
                     running jobs may otherwise lose their cluster lock",
                    engine.cluster_entry_ttl_secs, engine.heartbeat_interval_secs
                ),
            ));
        }
    }

    fn validate_jobs(config: &Config, result: &mut ValidationResult) {
        let mut uids = HashSet::new();
        let mut enabled_per_type: HashMap<JobType, usize> = HashMap::new();
        let mut queue_positions: HashSet<(&str, u32)> = HashSet::new();

        for (index, job) in config.jobs.iter().enumerate() {
            let path = format!("jobs[{index}]");

            if !job.has_identity() {
                result.add_error(ValidationError::new(format!("{path}.uid"), "uid cannot be empty"));
            } else if !uids.insert(job.uid.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{path}.uid"),
                    format!("Duplicate uid '{}'", job.uid),
                ));
            }

            if !job.parameters_match_type() {
                result.add_error(ValidationError::new(
                    format!("{path}.parameters"),
                    format!("Parameters do not belong to job type '{}'", job.job_type),
                ));
            }

            Self::validate_trigger(&path, job, result);

            if job.queue_position.is_some() && !job.is_used_in_queue() {
                result.add_error(ValidationError::new(
                    format!("{path}.queue_position"),
                    "queue_position requires queue_name",
                ));
            }
            if let (true, Some(queue), Some(position)) =
                (job.is_used_in_queue(), job.queue_name.as_deref(), job.queue_position)
            {
                if !queue_positions.insert((queue, position)) {
                    result.add_warning(ValidationWarning::new(
                        format!("{path}.queue_position"),
                        format!("Queue '{queue}' has more than one job at position {position}"),
                    ));
                }
            }

            if job.enabled {
                *enabled_per_type.entry(job.job_type).or_default() += 1;
            }
        }

        for job_type in JobType::ALL {
            if let Some(count) = enabled_per_type.get(&job_type).filter(|c| **c > 1) {
                result.add_warning(ValidationWarning::new(
                    "jobs",
                    format!(
                        "{count} enabled jobs of type '{job_type}', only one of them can run at a time"
                    ),
                ));
            }
        }
    }

    fn validate_trigger(path: &str, job: &jobsched_protocols::JobConfiguration, result: &mut ValidationResult) {
        if job.is_queue_follower() {
            return;
        }
        match job.scheduling_type {
            SchedulingType::Cron => match job.defined_cron_expression() {
                None => result.add_warning(ValidationWarning::new(
                    format!("{path}.cron_expression"),
                    "Cron expression is undefined, the job will never be triggered",
                )),
                Some(expression) => {
                    if let Err(e) = parse_cron(expression) {
                        result.add_error(ValidationError::new(
                            format!("{path}.cron_expression"),
                            format!("Invalid cron expression '{expression}': {e}"),
                        ));
                    }
                }
            },
            SchedulingType::FixedDelay => match job.defined_delay() {
                None => result.add_warning(ValidationWarning::new(
                    format!("{path}.delay"),
                    "Delay is undefined or not positive, the job will never be triggered",
                )),
                Some(delay) => {
                    let now = Utc::now();
                    let after_a_run = job.clone().with_last_executed(now);
                    if next_execution_time(&after_a_run, now).is_none() {
                        result.add_error(ValidationError::new(
                            format!("{path}.delay"),
                            format!("Delay of {delay} seconds is out of range"),
                        ));
                    }
                }
            },
            SchedulingType::OnceAsap => {}
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

//! Trigger computation.
//!
//! The next execution time is computed from the last executed time (or
//! "now" if the configuration never ran) plus a one second safety offset:
//!
//! | scheduling type | next execution                                   |
//! |-----------------|--------------------------------------------------|
//! | `ONCE_ASAP`     | the offset time                                  |
//! | `FIXED_DELAY`   | offset time if never run, else offset + `delay`  |
//! | `CRON`          | first cron match strictly after the offset time  |
//!
//! Queue followers (position > 0) always run "now". An undefined or invalid
//! trigger yields `None`, meaning the configuration never auto-triggers. So
//! does a time that falls outside the representable date range.

use std::str::FromStr;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use cron::Schedule;
use tracing::debug;

use jobsched_protocols::{JobConfiguration, SchedulingType};

/// Safety offset added to the reference time.
const SAFETY_OFFSET_SECS: i64 = 1;

/// Parse a 6-field cron expression (`sec min hour day-of-month month day-of-week`).
pub fn parse_cron(expression: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(expression.trim())
}

/// Compute when `configuration` should fire next, relative to `now`.
pub fn next_execution_time(
    configuration: &JobConfiguration,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if configuration.is_queue_follower() {
        return Some(now);
    }

    let offset = configuration
        .last_executed
        .unwrap_or(now)
        .checked_add_signed(TimeDelta::seconds(SAFETY_OFFSET_SECS))?;

    match configuration.scheduling_type {
        SchedulingType::OnceAsap => Some(offset),
        SchedulingType::FixedDelay => {
            let delay = TimeDelta::try_seconds(configuration.defined_delay()?)?;
            match configuration.last_executed {
                None => Some(offset),
                Some(_) => offset.checked_add_signed(delay).map(|next| next.trunc_subsecs(0)),
            }
        }
        SchedulingType::Cron => {
            let expression = configuration.defined_cron_expression()?;
            match parse_cron(expression) {
                Ok(schedule) => schedule.after(&offset).next(),
                Err(e) => {
                    debug!(
                        uid = %configuration.uid,
                        "Invalid cron expression '{}': {}", expression, e
                    );
                    None
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;

//! Job type enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The enumerated kind of background work.
///
/// A job type is the unit of mutual exclusion: at most one execution of a
/// given type is in flight across the whole cluster at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    /// Rebuild of analytics tables.
    AnalyticsTable,
    /// Rebuild of resource tables.
    ResourceTable,
    /// Push of data values to a remote instance.
    DataSync,
    /// Pull of metadata from a remote instance.
    MetadataSync,
    /// Delivery of pending email and SMS messages.
    MessageSend,
    /// Data integrity checks.
    DataIntegrity,
    /// Cleanup of expired sessions, files and audit rows.
    Housekeeping,
    /// Diagnostic job used to exercise the engine.
    Probe,
}

impl JobType {
    /// All job types, in declaration order.
    pub const ALL: [JobType; 8] = [
        JobType::AnalyticsTable,
        JobType::ResourceTable,
        JobType::DataSync,
        JobType::MetadataSync,
        JobType::MessageSend,
        JobType::DataIntegrity,
        JobType::Housekeeping,
        JobType::Probe,
    ];

    /// Stable string key used in configuration files and cluster cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::AnalyticsTable => "analytics-table",
            JobType::ResourceTable => "resource-table",
            JobType::DataSync => "data-sync",
            JobType::MetadataSync => "metadata-sync",
            JobType::MessageSend => "message-send",
            JobType::DataIntegrity => "data-integrity",
            JobType::Housekeeping => "housekeeping",
            JobType::Probe => "probe",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown job type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_round_trips_through_from_str() {
        for job_type in JobType::ALL {
            assert_eq!(job_type.as_str().parse::<JobType>().unwrap(), job_type);
        }
    }

    #[test]
    fn test_unknown_job_type() {
        let err = "reindex".parse::<JobType>().unwrap_err();
        assert!(err.contains("reindex"));
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&JobType::AnalyticsTable).unwrap();
        assert_eq!(json, "\"analytics-table\"");
        let parsed: JobType = serde_json::from_str("\"message-send\"").unwrap();
        assert_eq!(parsed, JobType::MessageSend);
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(JobType::DataSync.to_string(), "data-sync");
    }
}

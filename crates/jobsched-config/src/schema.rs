//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use jobsched_protocols::JobConfiguration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub jobs: Vec<JobConfiguration>,
}

/// Scheduling engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Identity of this node in the cluster. A random id is used when unset.
    #[serde(default)]
    pub node_id: Option<String>,

    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Expiry of cluster cache entries; must exceed the heartbeat interval.
    #[serde(default = "default_cluster_entry_ttl_secs")]
    pub cluster_entry_ttl_secs: u64,

    /// Static leadership flag.
    #[serde(default = "default_leader")]
    pub leader: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            cluster_entry_ttl_secs: default_cluster_entry_ttl_secs(),
            leader: default_leader(),
        }
    }
}

impl EngineConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn cluster_entry_ttl(&self) -> Duration {
        Duration::from_secs(self.cluster_entry_ttl_secs)
    }

    /// The configured node id, or a fresh random one.
    pub fn resolve_node_id(&self) -> String {
        match self.node_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        }
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_cluster_entry_ttl_secs() -> u64 {
    90
}

fn default_leader() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily rolling log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            max_log_files: default_max_log_files(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    30
}

/// Default config file location: `~/.jobsched/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jobsched")
        .join("config.toml")
}

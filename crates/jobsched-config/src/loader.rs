//! Configuration loader.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        if let Some(dir) = &config.logging.directory {
            config.logging.directory = Some(Self::expand_path(&dir.to_string_lossy()).into());
        }
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in ENV_VAR.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.jobsched/logs`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use jobsched_protocols::{JobParameters, JobType, SchedulingType};

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.engine.heartbeat_interval_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn test_load_jobs() {
        let content = r#"
            [engine]
            node_id = "node-a"
            heartbeat_interval_secs = 10
            cluster_entry_ttl_secs = 40

            [[jobs]]
            uid = "tables-nightly"
            name = "Nightly analytics tables"
            job_type = "analytics-table"
            scheduling_type = "CRON"
            cron_expression = "0 0 3 * * *"
            executed_by = "admin"
            queue_name = "nightly"
            queue_position = 0

            [jobs.parameters]
            kind = "analytics-table"
            last_years = 2

            [[jobs]]
            uid = "sync"
            name = "Data sync"
            job_type = "data-sync"
            scheduling_type = "FIXED_DELAY"
            delay = 300
            enabled = false
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.engine.node_id.as_deref(), Some("node-a"));
        assert_eq!(config.jobs.len(), 2);

        let tables = &config.jobs[0];
        assert_eq!(tables.job_type, JobType::AnalyticsTable);
        assert_eq!(tables.scheduling_type, SchedulingType::Cron);
        assert_eq!(tables.defined_cron_expression(), Some("0 0 3 * * *"));
        assert!(tables.enabled);
        assert!(matches!(
            tables.parameters,
            Some(JobParameters::AnalyticsTable { last_years: Some(2), .. })
        ));

        let sync = &config.jobs[1];
        assert_eq!(sync.defined_delay(), Some(300));
        assert!(!sync.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[engine]").unwrap();
        writeln!(file, "leader = false").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert!(!config.engine.leader);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("jobs = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_load_unknown_job_type() {
        let content = r#"
            [[jobs]]
            uid = "x"
            job_type = "coffee-brewing"
            scheduling_type = "CRON"
        "#;
        assert!(ConfigLoader::load_str(content).is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("JOBSCHED_TEST_NODE", "node-from-env");
        }
        let config = ConfigLoader::load_str("[engine]\nnode_id = \"${JOBSCHED_TEST_NODE}\"").unwrap();
        assert_eq!(config.engine.node_id.as_deref(), Some("node-from-env"));
        unsafe {
            std::env::remove_var("JOBSCHED_TEST_NODE");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let result = ConfigLoader::expand_env_vars("value = \"${JOBSCHED_MISSING_VAR_12345}\"");
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(v)) if v == "JOBSCHED_MISSING_VAR_12345"));
    }

    #[test]
    fn test_logging_directory_is_expanded() {
        let config = ConfigLoader::load_str("[logging]\ndirectory = \"~/.jobsched/logs\"").unwrap();
        let dir = config.logging.directory.unwrap();
        assert!(!dir.to_string_lossy().starts_with('~'));
        assert!(dir.ends_with(".jobsched/logs"));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        assert_eq!(ConfigLoader::expand_path("/var/log/jobsched"), "/var/log/jobsched");
    }
}

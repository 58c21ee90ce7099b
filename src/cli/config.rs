//! Monitor configuration
//!
//! Loaded from a JSON file. Optional fields fall back to the defaults the
//! application appliance ships with.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::failover::{FailoverPolicy, DEFAULT_ATTEMPT_INTERVAL, DEFAULT_FAILOVER_ATTEMPTS};

use super::args::CommonArgs;
use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Application's primary-connection file (required)
    pub database_yml: PathBuf,

    /// Cached cluster topology file (required)
    pub failover_yml: PathBuf,

    /// Section of `database_yml` to read and rewrite
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log destination, stdout when absent
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Unit stopped and started around a failover
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_failover_attempts")]
    pub failover_attempts: u32,

    /// Seconds between candidate search attempts
    #[serde(default = "default_failover_check_frequency")]
    pub failover_check_frequency_secs: u64,

    /// Seconds between cycles in `monitor`
    #[serde(default = "default_db_check_frequency")]
    pub db_check_frequency_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_environment() -> String {
    "production".to_string()
}
fn default_service_name() -> String {
    "evmserverd".to_string()
}
fn default_failover_attempts() -> u32 {
    DEFAULT_FAILOVER_ATTEMPTS
}
fn default_failover_check_frequency() -> u64 {
    DEFAULT_ATTEMPT_INTERVAL.as_secs()
}
fn default_db_check_frequency() -> u64 {
    300
}
fn default_connect_timeout() -> u64 {
    5
}

impl MonitorConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: MonitorConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load, apply command line overrides, then validate.
    pub fn from_args(args: &CommonArgs) -> CliResult<Self> {
        let mut config = Self::load(&args.config)?;
        if let Some(ref environment) = args.environment {
            config.environment = environment.clone();
        }
        if let Some(ref log_file) = args.log_file {
            config.log_file = Some(log_file.clone());
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.database_yml.as_os_str().is_empty() {
            return Err(CliError::config_error("database_yml must not be empty"));
        }

        if self.failover_yml.as_os_str().is_empty() {
            return Err(CliError::config_error("failover_yml must not be empty"));
        }

        if self.environment.trim().is_empty() {
            return Err(CliError::config_error("environment must not be empty"));
        }

        if self.service_name.trim().is_empty() {
            return Err(CliError::config_error("service_name must not be empty"));
        }

        if self.failover_attempts == 0 {
            return Err(CliError::config_error("failover_attempts must be > 0"));
        }

        if self.db_check_frequency_secs == 0 {
            return Err(CliError::config_error("db_check_frequency_secs must be > 0"));
        }

        if self.connect_timeout_secs == 0 {
            return Err(CliError::config_error("connect_timeout_secs must be > 0"));
        }

        Ok(())
    }

    /// Bound on the candidate search.
    pub fn failover_policy(&self) -> CliResult<FailoverPolicy> {
        FailoverPolicy::new(
            self.failover_attempts,
            Duration::from_secs(self.failover_check_frequency_secs),
        )
        .map_err(CliError::from)
    }

    pub fn db_check_frequency(&self) -> Duration {
        Duration::from_secs(self.db_check_frequency_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

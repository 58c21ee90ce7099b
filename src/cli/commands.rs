//! CLI command implementations
//!
//! `check` runs exactly one cycle. `monitor` repeats it on the configured
//! cadence and never exits on a cycle error. `topology` reads the cache
//! without touching the cluster.

use std::thread;

use serde_json::{json, Value};

use crate::failover::{
    Collaborators, FailoverEngine, FailoverError, FailoverOutcome, FailoverResult,
};
use crate::observability::Logger;
use crate::pg::{PgConnector, PgRecoveryChecker};
use crate::service::SystemdService;
use crate::store::{DatabaseYml, FailoverDatabasesYml};

use super::args::{Command, CommonArgs};
use super::config::MonitorConfig;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check(args) => check(&args),
        Command::Monitor(args) => monitor(&args),
        Command::Topology(args) => topology(&args),
    }
}

/// Production collaborators wired from one configuration.
struct Monitor {
    config: MonitorConfig,
    logger: Logger,
    connector: PgConnector,
    recovery: PgRecoveryChecker,
    database_yml: DatabaseYml,
    failover_yml: FailoverDatabasesYml,
    service: SystemdService,
}

impl Monitor {
    fn new(config: MonitorConfig) -> CliResult<Self> {
        let logger = match config.log_file {
            Some(ref path) => Logger::file(path)?,
            None => Logger::console(),
        }
        .with_context("environment", &config.environment);

        let connector = PgConnector::new(config.connect_timeout(), logger.clone())
            .map_err(|e| CliError::io_error(format!("failed to start connection runtime: {}", e)))?;
        let recovery = PgRecoveryChecker::new(connector.clone(), logger.clone());

        Ok(Self {
            database_yml: DatabaseYml::new(config.database_yml.clone(), config.environment.as_str()),
            failover_yml: FailoverDatabasesYml::new(config.failover_yml.clone()),
            service: SystemdService::new(config.service_name.as_str()),
            config,
            logger,
            connector,
            recovery,
        })
    }

    fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            probe: &self.connector,
            recovery: &self.recovery,
            topology: &self.failover_yml,
            primary_config: &self.database_yml,
            service: &self.service,
        }
    }

    fn engine(&self) -> CliResult<FailoverEngine<'_>> {
        Ok(FailoverEngine::new(
            self.collaborators(),
            self.config.failover_policy()?,
            self.logger.clone(),
        ))
    }
}

/// Run one health-check/failover cycle.
///
/// Prints an `ok` response for `healthy`/`recovered` and an `error`
/// response, then exits non-zero, when the cycle errors or ends `failed`.
pub fn check(args: &CommonArgs) -> CliResult<()> {
    let monitor = Monitor::new(MonitorConfig::from_args(args)?)?;

    match check_report(monitor.engine()?.check_and_failover()) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Response data for a finished cycle, or the error to report.
fn check_report(result: FailoverResult<FailoverOutcome>) -> CliResult<Value> {
    match result? {
        FailoverOutcome::Failed => Err(CliError::check_failed(
            "no confirmed primary found; service left stopped",
        )),
        outcome => Ok(outcome_json(&outcome)),
    }
}

/// Run cycles every `db_check_frequency_secs` until the process is stopped.
pub fn monitor(args: &CommonArgs) -> CliResult<()> {
    let monitor = Monitor::new(MonitorConfig::from_args(args)?)?;
    let mut engine = monitor.engine()?;
    let frequency = monitor.config.db_check_frequency();

    monitor.logger.info(
        "MONITOR_STARTED",
        &[
            ("db_check_frequency_secs", &frequency.as_secs().to_string()),
            ("service", monitor.service.unit()),
        ],
    );

    loop {
        // The engine logs cycle errors with their code.
        if let Ok(outcome) = engine.check_and_failover() {
            monitor
                .logger
                .trace("CYCLE_END", &[("outcome", outcome.as_str())]);
        }
        thread::sleep(frequency);
    }
}

/// Print the cached cluster topology.
pub fn topology(args: &CommonArgs) -> CliResult<()> {
    let config = MonitorConfig::from_args(args)?;
    let snapshot = FailoverDatabasesYml::new(config.failover_yml.clone())
        .load()
        .map_err(FailoverError::from)?;

    write_response(json!({
        "path": config.failover_yml.display().to_string(),
        "nodes": serde_json::to_value(snapshot.nodes())?,
    }))
}

fn outcome_json(outcome: &FailoverOutcome) -> Value {
    match outcome.new_primary() {
        Some(primary) => json!({
            "outcome": outcome.as_str(),
            "primary": primary.to_string(),
        }),
        None => json!({ "outcome": outcome.as_str() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::io::{error_json, response_json};
    use crate::failover::ConnectionParams;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_outcome_json_never_contains_password() {
        let primary = ConnectionParams::new("203.0.113.2", "root", "vmdb_production")
            .with_password("smartvm");
        let value = outcome_json(&FailoverOutcome::Recovered(primary));

        assert_eq!(value["outcome"], "recovered");
        assert!(value["primary"].as_str().unwrap().contains("203.0.113.2"));
        assert!(!value.to_string().contains("smartvm"));
    }

    #[test]
    fn test_outcome_json_healthy_has_no_primary() {
        let value = outcome_json(&FailoverOutcome::Healthy);
        assert_eq!(value, json!({"outcome": "healthy"}));
    }

    #[test]
    fn test_failed_outcome_is_reported_as_error() {
        let err = check_report(Ok(FailoverOutcome::Failed)).unwrap_err();
        assert_eq!(err.code_str(), "PGHA_CLI_CHECK_FAILED");

        let output = error_json(err.code_str(), err.message());
        assert_eq!(output["status"], "error");
        assert_eq!(output["code"], "PGHA_CLI_CHECK_FAILED");
        assert!(output["message"].as_str().unwrap().contains("service left stopped"));
        assert!(output.get("data").is_none());
    }

    #[test]
    fn test_cycle_error_is_reported_with_its_code() {
        let err = check_report(Err(FailoverError::configuration("database.yml has no host")))
            .unwrap_err();
        let output = error_json(err.code_str(), err.message());

        assert_eq!(output["code"], "PGHA_CLI_CONFIG_ERROR");
        assert!(output["message"].as_str().unwrap().contains("PGHA_CONFIGURATION"));
    }

    #[test]
    fn test_recovered_outcome_is_reported_as_ok() {
        let primary = ConnectionParams::new("203.0.113.2", "root", "vmdb_production");
        let data = check_report(Ok(FailoverOutcome::Recovered(primary))).unwrap();
        let output = response_json(data);

        assert_eq!(output["status"], "ok");
        assert_eq!(output["data"]["outcome"], "recovered");
    }

    #[test]
    fn test_topology_rejects_malformed_cache() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("failover_databases.yml");
        fs::write(&cache, "- type: [unterminated\n").unwrap();

        let config_path = dir.path().join("pgha.json");
        fs::write(
            &config_path,
            json!({
                "database_yml": dir.path().join("database.yml"),
                "failover_yml": cache,
            })
            .to_string(),
        )
        .unwrap();

        let args = CommonArgs {
            config: config_path,
            environment: None,
            log_file: None,
        };
        let err = topology(&args).unwrap_err();
        assert_eq!(err.code_str(), "PGHA_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_check_with_missing_config_file() {
        let args = CommonArgs {
            config: PathBuf::from("/nonexistent/pgha.json"),
            environment: None,
            log_file: None,
        };
        assert_eq!(check(&args).unwrap_err().code_str(), "PGHA_CLI_CONFIG_ERROR");
    }
}

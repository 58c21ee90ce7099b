//! CLI module for pgha
//!
//! Provides command-line interface for:
//! - check: one health-check/failover cycle
//! - monitor: repeated cycles on a fixed cadence
//! - topology: print the cached cluster members

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, CommonArgs};
pub use commands::{check, monitor, run, run_command, topology};
pub use config::MonitorConfig;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_json, response_json, write_error, write_json, write_response};

//! CLI argument definitions using clap
//!
//! Commands:
//! - pgha check --config <path>
//! - pgha monitor --config <path>
//! - pgha topology --config <path>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// pgha - PostgreSQL repmgr failover monitor
#[derive(Parser, Debug)]
#[command(name = "pgha")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one health-check/failover cycle and exit
    Check(CommonArgs),

    /// Run health-check/failover cycles until interrupted
    Monitor(CommonArgs),

    /// Print the cached cluster topology
    Topology(CommonArgs),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to configuration file
    #[arg(long, default_value = "./pgha.json")]
    pub config: PathBuf,

    /// Section of the database config to use, overrides the config file
    #[arg(long)]
    pub environment: Option<String>,

    /// Log destination, overrides the config file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

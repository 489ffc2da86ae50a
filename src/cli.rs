// src/cli.rs

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "healthd",
    version,
    about = "Dependency health checks with Kubernetes-style liveness, readiness and startup probes",
    long_about = "Runs registered dependency checks concurrently under a timeout, caches the aggregate report, refreshes it in the background and serves it on liveness, readiness and startup probe endpoints."
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "HEALTHD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level, used when RUST_LOG is unset
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// JSON logging; pass `--json-logs false` for plain text
    #[arg(
        long,
        env = "HEALTHD_JSON_LOGS",
        global = true,
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the probe server (default)
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run every check once and exit 0 when ready, 1 otherwise
    Check,

    /// Validate the configuration file
    Validate,

    /// Write an example configuration file
    GenerateConfig {
        /// Output file path
        #[arg(short, long, default_value = "healthd.yaml")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run; `serve` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve { port: None })
    }
}

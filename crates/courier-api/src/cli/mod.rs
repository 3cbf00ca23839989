//! CLI definitions for the `courier` binary.
//!
//! Running `courier` with no subcommand starts the server.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use courier_infra::config::DEFAULT_CONFIG_FILE;

/// Relay LINE messages to Gemini and push the replies back.
#[derive(Parser)]
#[command(name = "courier", version, about, long_about = None)]
#[command(propagate_version = true, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook server (the default).
    Serve(ServeArgs),

    /// Validate the config file and required environment, then exit.
    CheckConfig {
        /// Path to the TOML tunables file.
        #[arg(long, env = "COURIER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Path to the TOML tunables file. A missing file means defaults.
    #[arg(long, env = "COURIER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

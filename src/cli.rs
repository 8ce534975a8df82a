// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `spotpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "spotpipe",
    version,
    about = "Run staged batch pipelines for spot-detection optimisation experiments.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Spotpipe.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Spotpipe.toml")]
    pub config: String,

    /// Workflow to run, overriding `[run].workflow` from the config.
    #[arg(long, value_name = "NAME")]
    pub workflow: Option<String>,

    /// Parse + validate, print the stage plan, but don't submit anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SPOTPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

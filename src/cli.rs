// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `clusterdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "clusterdag",
    version,
    about = "Plan cluster jobs from a dependency graph of tasks.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CLUSTERDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Validate a workflow and print its outline, modules and edges.
    Check {
        #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
        workflow: PathBuf,
    },

    /// Print the tasks that are ready to run, with their commands.
    Plan {
        #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
        workflow: PathBuf,

        /// Restore this snapshot before computing the ready set.
        #[arg(long, value_name = "PATH")]
        snapshot: Option<PathBuf>,
    },

    /// Serialize the workflow graph.
    Snapshot {
        #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
        workflow: PathBuf,

        /// Restore this snapshot first.
        #[arg(long, value_name = "PATH")]
        snapshot: Option<PathBuf>,

        /// Write here instead of stdout.
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Render a definition file as prose plus indented code.
    Fmt {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
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

// src/logging.rs

//! Log setup for the `clusterdag` binary.
//!
//! What gets logged:
//! - `info`: workflow graph built, task started (with its command count),
//!   finalized, resubmitted, or ignored by a failing conditional.
//! - `warn`: task failures and snapshot fields that restore does not know.
//! - `debug`: edge wiring, file filtering per edge, config loading and
//!   snapshot sizes.
//!
//! The filter comes from `--log-level` when given. Otherwise
//! `CLUSTERDAG_LOG` is read as a full `EnvFilter` directive, so
//! `CLUSTERDAG_LOG=clusterdag::dag=debug,info` narrows debug output to the
//! graph engine. Without either, only `info` and above is shown.
//!
//! Logs go to stderr; stdout carries only plans, snapshots and formatted
//! output.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "CLUSTERDAG_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    fmt()
        .with_env_filter(build_filter(cli_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;

    Ok(())
}

/// Resolve the filter: CLI flag, then `CLUSTERDAG_LOG`, then `info`.
///
/// An unparsable `CLUSTERDAG_LOG` falls back to the default rather than
/// aborting startup.
pub fn build_filter(cli_level: Option<LogLevel>) -> EnvFilter {
    match cli_level {
        Some(level) => EnvFilter::new(directive_for(level)),
        None => EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

fn directive_for(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

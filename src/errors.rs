// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DagError {
    /// Linking a child to a parent would make the graph cyclic.
    #[error("Cycle error: {0}")]
    Cycle(String),

    /// Ready-set computation reached a node in `fatal` status.
    #[error("Task {name} (slug: {slug}, job id: {}) is in a terminal failure state", job_id.as_deref().unwrap_or("none"))]
    TerminalFailure {
        name: String,
        slug: String,
        job_id: Option<String>,
    },

    /// A command template referenced a placeholder with no bound value.
    #[error("Template error: {0}")]
    Template(String),

    /// Caller-contract violation (combinator before `when`, bad transition).
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A snapshot could not be applied to the live graph.
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DagError>;

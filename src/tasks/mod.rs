// src/tasks/mod.rs

//! Node specializations.
//!
//! - [`noop`]: the default node, completes as soon as it starts.
//! - [`cluster`]: expands a command template into cluster command lines.
//! - [`regex`]: scrapes named groups from output text into term arguments.
//! - [`record`]: read-only snapshot of an external record handed to hooks.

pub mod cluster;
pub mod noop;
pub mod record;
pub mod regex;

use std::fmt::Debug;

use serde_json::Value;

use crate::dag::{BoundParameters, NodeState, Template};
use crate::errors::Result;
use crate::types::Params;

pub use cluster::ClusterTask;
pub use noop::NoopTask;
pub use record::{RecordSnapshot, RecordSource};
pub use self::regex::RegexTask;

/// Capability contract every node specialization implements.
///
/// The graph owns status bookkeeping, edges and propagation; a kind only
/// decides what starting the node means and which extra fields it carries
/// in snapshots.
pub trait TaskKind: Send + Sync + Debug {
    /// Stable kind tag written to snapshots.
    fn kind(&self) -> &'static str;

    /// Owned copy, used to stage snapshot fields before they are applied.
    fn clone_kind(&self) -> Box<dyn TaskKind>;

    /// Start the node with its bound parameters.
    ///
    /// Returns the command lines produced (possibly none). Implementations
    /// that do not hand work to an external substrate mark the node
    /// `Completed` themselves.
    fn start(&self, state: &mut NodeState, params: &BoundParameters) -> Result<Vec<String>>;

    /// Look at the node's accumulated input text before `start`.
    fn scan_input(&self, _state: &mut NodeState) {}

    /// What `start` would produce, without side effects.
    fn preview(&self, _state: &NodeState, _params: &BoundParameters) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn template(&self) -> Option<&Template> {
        None
    }

    fn modules(&self) -> &[String] {
        &[]
    }

    fn set_modules(&mut self, _modules: Vec<String>) {}

    /// Kind-specific snapshot fields.
    fn snapshot_fields(&self) -> Params {
        Params::new()
    }

    /// Apply one kind-specific snapshot field. Returns `false` when the key
    /// is not one of this kind's fields.
    fn restore_field(&mut self, _key: &str, _value: &Value) -> Result<bool> {
        Ok(false)
    }
}

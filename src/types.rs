use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Static parameters and finalize-time keyword arguments.
///
/// A `BTreeMap` keeps iteration (and therefore snapshots) deterministic.
pub type Params = BTreeMap<String, Value>;

/// Execution status of a single node.
///
/// Forward progress is `Pending -> Running -> {Completed, Fatal}`. A pending
/// node may also be shunted to `Ignored` when a parent's conditional fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Fatal,
    Ignored,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Fatal => "fatal",
            TaskStatus::Ignored => "ignored",
        };
        f.write_str(s)
    }
}

/// A dynamically produced argument handed from a node to its children.
///
/// Keyed arguments keep multi-value semantics: the same key may appear
/// several times and every occurrence is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermArg {
    Keyed(String, Value),
    Positional(Value),
}

impl TermArg {
    pub fn keyed(key: impl Into<String>, value: impl Into<Value>) -> Self {
        TermArg::Keyed(key.into(), value.into())
    }

    pub fn positional(value: impl Into<Value>) -> Self {
        TermArg::Positional(value.into())
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            TermArg::Keyed(k, _) => Some(k),
            TermArg::Positional(_) => None,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            TermArg::Keyed(_, v) | TermArg::Positional(v) => v,
        }
    }
}

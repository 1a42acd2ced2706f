// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::types::Params;

/// Top-level workflow definition as read from a TOML file.
///
/// ```toml
/// [workflow]
/// name = "assembly"
///
/// [default]
/// modules = ["gcc/4.9"]
///
/// [task.fetch]
/// run = "fetch --out {out}"
/// params = { out = "/data" }
///
/// [task.trim]
/// run = "trim -i {input}"
/// file_filter = "*.fastq"
/// after = ["fetch"]
/// ```
///
/// This is the unvalidated serde mapping; use [`ConfigFile::try_from`] to get
/// a definition that is safe to turn into a graph.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub workflow: WorkflowSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// Keys are the task keys used by `after` and `[workflow].root`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated workflow definition.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub workflow: WorkflowSection,
    pub default: DefaultSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    /// Construct without validation; callers outside `validate` should go
    /// through `TryFrom<RawConfigFile>`.
    pub(crate) fn new_unchecked(
        workflow: WorkflowSection,
        default: DefaultSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            workflow,
            default,
            task,
        }
    }

    /// Task keys with no `after` entries, in key order.
    pub fn entry_tasks(&self) -> Vec<&str> {
        self.task
            .iter()
            .filter(|(_, task)| task.after.is_empty())
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    /// Name of the synthesized root when several entry tasks exist.
    #[serde(default = "default_workflow_name")]
    pub name: String,

    /// Optional explicit root task key.
    #[serde(default)]
    pub root: Option<String>,
}

fn default_workflow_name() -> String {
    "workflow".to_string()
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            name: default_workflow_name(),
            root: None,
        }
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultSection {
    /// Modules loaded by cluster tasks that do not override them.
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKindName {
    Noop,
    Cluster,
    Regex,
}

/// `[task.<key>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Display name; the task key is used when omitted.
    #[serde(default)]
    pub name: Option<String>,

    /// Explicit kind. Inferred from `run` / `regex` when omitted.
    #[serde(default)]
    pub kind: Option<TaskKindName>,

    /// Command template for cluster tasks.
    #[serde(default)]
    pub run: Option<String>,

    /// Task-local module list. If `None`, the task uses `default.modules`.
    #[serde(default)]
    pub modules: Option<Vec<String>>,

    /// If true, `default.modules` is appended to `task.modules`.
    #[serde(default)]
    pub append_default_modules: bool,

    #[serde(default)]
    pub file_filter: Option<FileFilterSpec>,

    #[serde(default)]
    pub params: Params,

    /// Pattern for regex tasks.
    #[serde(default)]
    pub regex: Option<String>,

    #[serde(default)]
    pub stop_on_miss: bool,

    /// Parents of this task, optionally gated by a `when` conditional.
    #[serde(default)]
    pub after: Vec<AfterSpec>,
}

impl TaskConfig {
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }

    pub fn effective_kind(&self) -> TaskKindName {
        match (self.kind, &self.run, &self.regex) {
            (Some(kind), _, _) => kind,
            (None, Some(_), _) => TaskKindName::Cluster,
            (None, None, Some(_)) => TaskKindName::Regex,
            (None, None, None) => TaskKindName::Noop,
        }
    }

    /// Module list after applying `[default].modules`.
    pub fn effective_modules(&self, defaults: &DefaultSection) -> Vec<String> {
        match &self.modules {
            Some(own) if self.append_default_modules => {
                let mut modules = own.clone();
                modules.extend(defaults.modules.iter().cloned());
                modules
            }
            Some(own) => own.clone(),
            None => defaults.modules.clone(),
        }
    }
}

/// One entry of `after = [...]`: a bare task key, or a table with a
/// conditional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AfterSpec {
    Task(String),
    Conditional { task: String, when: WhenSpec },
}

impl AfterSpec {
    pub fn task(&self) -> &str {
        match self {
            AfterSpec::Task(task) | AfterSpec::Conditional { task, .. } => task,
        }
    }

    pub fn when(&self) -> Option<&WhenSpec> {
        match self {
            AfterSpec::Task(_) => None,
            AfterSpec::Conditional { when, .. } => Some(when),
        }
    }
}

/// `when = { field = "...", equals = ... }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WhenSpec {
    pub field: String,
    pub equals: Value,
}

/// `file_filter = "*.fa"` or `file_filter = ["*.fa", "*.fasta"]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FileFilterSpec {
    One(String),
    Many(Vec<String>),
}

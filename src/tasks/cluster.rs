// src/tasks/cluster.rs

//! Cluster command builder.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, warn};

use crate::dag::{BoundParameters, NodeState, Template};
use crate::errors::{DagError, Result};
use crate::tasks::TaskKind;
use crate::types::Params;

/// Placeholder that fans a template out over the node's input files.
pub const INPUT_PLACEHOLDER: &str = "input";

/// Separator between the module-load prefix and the command itself.
const STATEMENT_SEPARATOR: &str = "; ";

/// Expands a command template into single-line cluster commands.
///
/// Starting a cluster node does not change its status: the orchestrator
/// dispatches the returned commands and reports back with
/// `set_running` / `finalize` / `set_fatal`.
#[derive(Debug, Clone)]
pub struct ClusterTask {
    run: Template,
    modules: Vec<String>,
}

impl ClusterTask {
    pub fn new(run: &str) -> Result<Self> {
        Ok(Self {
            run: Template::parse(run)?,
            modules: Vec::new(),
        })
    }

    pub fn with_modules(mut self, modules: Vec<String>) -> Self {
        self.modules = modules;
        self
    }

    pub fn run_command(&self) -> &str {
        self.run.source()
    }

    /// `module load a; module load b`, or `None` without modules.
    pub fn module_prefix(&self) -> Option<String> {
        if self.modules.is_empty() {
            return None;
        }
        Some(
            self.modules
                .iter()
                .map(|m| format!("module load {m}"))
                .collect::<Vec<_>>()
                .join(STATEMENT_SEPARATOR),
        )
    }

    /// Expand the template once, or once per input file when it references
    /// `{input}`. The result is deduplicated and sorted.
    pub fn render(&self, state: &NodeState, params: &BoundParameters) -> Result<Vec<String>> {
        let prefix = self.module_prefix();
        let mut commands = BTreeSet::new();

        if self.run.references(INPUT_PLACEHOLDER) {
            if state.input_files.is_empty() {
                warn!(
                    task = %state.slug,
                    "command references {{input}} but the task has no input files"
                );
            }
            for path in &state.input_files {
                let mut bound = params.clone();
                bound.set(INPUT_PLACEHOLDER, path.as_str());
                commands.insert(self.line(prefix.as_deref(), &bound)?);
            }
        } else {
            commands.insert(self.line(prefix.as_deref(), params)?);
        }

        Ok(commands.into_iter().collect())
    }

    fn line(&self, prefix: Option<&str>, params: &BoundParameters) -> Result<String> {
        let expanded = self.run.render(params)?.replace(['\n', '\t'], " ");
        Ok(match prefix {
            Some(prefix) => format!("{prefix}{STATEMENT_SEPARATOR}{expanded}"),
            None => expanded,
        })
    }
}

impl TaskKind for ClusterTask {
    fn kind(&self) -> &'static str {
        "cluster"
    }

    fn clone_kind(&self) -> Box<dyn TaskKind> {
        Box::new(self.clone())
    }

    fn start(&self, state: &mut NodeState, params: &BoundParameters) -> Result<Vec<String>> {
        let commands = self.render(state, params)?;
        debug!(task = %state.slug, count = commands.len(), "expanded cluster commands");
        Ok(commands)
    }

    fn preview(&self, state: &NodeState, params: &BoundParameters) -> Result<Vec<String>> {
        self.render(state, params)
    }

    fn template(&self) -> Option<&Template> {
        Some(&self.run)
    }

    fn modules(&self) -> &[String] {
        &self.modules
    }

    fn set_modules(&mut self, modules: Vec<String>) {
        self.modules = modules;
    }

    fn snapshot_fields(&self) -> Params {
        let mut fields = Params::new();
        fields.insert("run_command".into(), Value::from(self.run.source()));
        fields.insert("modules".into(), Value::from(self.modules.clone()));
        fields
    }

    fn restore_field(&mut self, key: &str, value: &Value) -> Result<bool> {
        match key {
            "run_command" => {
                let source = value.as_str().ok_or_else(|| {
                    DagError::Snapshot(format!("run_command must be a string, got {value}"))
                })?;
                self.run = Template::parse(source)?;
                Ok(true)
            }
            "modules" => {
                self.modules = serde_json::from_value(value.clone())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

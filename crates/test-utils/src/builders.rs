#![allow(dead_code)]

use std::collections::BTreeMap;

use clusterdag::config::{
    AfterSpec, ConfigFile, DefaultSection, FileFilterSpec, RawConfigFile, TaskConfig,
    TaskKindName, WhenSpec, WorkflowSection,
};
use clusterdag::tasks::RecordSource;
use clusterdag::types::Params;
use serde_json::Value;

/// Builder for `ConfigFile` to simplify test setup.
pub struct WorkflowConfigBuilder {
    config: RawConfigFile,
}

impl WorkflowConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                workflow: WorkflowSection::default(),
                default: DefaultSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.workflow.name = name.to_string();
        self
    }

    pub fn root(mut self, key: &str) -> Self {
        self.config.workflow.root = Some(key.to_string());
        self
    }

    pub fn default_module(mut self, module: &str) -> Self {
        self.config.default.modules.push(module.to_string());
        self
    }

    pub fn with_task(mut self, key: &str, task: TaskConfig) -> Self {
        self.config.task.insert(key.to_string(), task);
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for WorkflowConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A task with no `run` and no `regex`: a no-op.
    pub fn noop() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn cluster(run: &str) -> Self {
        Self {
            task: TaskConfig {
                run: Some(run.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn regex(pattern: &str) -> Self {
        Self {
            task: TaskConfig {
                regex: Some(pattern.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = Some(name.to_string());
        self
    }

    pub fn kind(mut self, kind: TaskKindName) -> Self {
        self.task.kind = Some(kind);
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.task.params.insert(key.to_string(), value.into());
        self
    }

    pub fn module(mut self, module: &str) -> Self {
        self.task
            .modules
            .get_or_insert_with(Vec::new)
            .push(module.to_string());
        self
    }

    pub fn append_default_modules(mut self, val: bool) -> Self {
        self.task.append_default_modules = val;
        self
    }

    pub fn file_filter(mut self, pattern: &str) -> Self {
        self.task.file_filter = Some(FileFilterSpec::One(pattern.to_string()));
        self
    }

    pub fn file_filters(mut self, patterns: &[&str]) -> Self {
        self.task.file_filter = Some(FileFilterSpec::Many(
            patterns.iter().map(|p| p.to_string()).collect(),
        ));
        self
    }

    pub fn stop_on_miss(mut self, val: bool) -> Self {
        self.task.stop_on_miss = val;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(AfterSpec::Task(dep.to_string()));
        self
    }

    pub fn after_when(mut self, dep: &str, field: &str, equals: impl Into<Value>) -> Self {
        self.task.after.push(AfterSpec::Conditional {
            task: dep.to_string(),
            when: WhenSpec {
                field: field.to_string(),
                equals: equals.into(),
            },
        });
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// In-memory stand-in for an external record.
#[derive(Debug, Clone, Default)]
pub struct StaticRecord {
    pub fields: Params,
    pub paths: BTreeMap<String, String>,
}

impl StaticRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn path(mut self, name: &str, path: &str) -> Self {
        self.paths.insert(name.to_string(), path.to_string());
        self
    }
}

impl RecordSource for StaticRecord {
    fn fields(&self) -> Params {
        self.fields.clone()
    }

    fn named_paths(&self) -> BTreeMap<String, String> {
        self.paths.clone()
    }
}

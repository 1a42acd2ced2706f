// src/config/validate.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::model::{ConfigFile, FileFilterSpec, RawConfigFile, TaskKindName};
use crate::dag::{FileFilter, Template, slugify};
use crate::errors::{DagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.workflow, raw.default, raw.task))
    }
}

/// Run every semantic check on a raw definition.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_task_kinds(cfg)?;
    validate_slugs(cfg)?;
    validate_root(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(DagError::Configuration(
            "workflow must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter().map(|a| a.task()) {
            if !cfg.task.contains_key(dep) {
                return Err(DagError::Configuration(format!(
                    "task '{name}' has unknown dependency '{dep}' in `after`"
                )));
            }
            if dep == name {
                return Err(DagError::Configuration(format!(
                    "task '{name}' cannot depend on itself in `after`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_task_kinds(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        match task.effective_kind() {
            TaskKindName::Cluster => {
                let run = task.run.as_deref().ok_or_else(|| {
                    DagError::Configuration(format!("cluster task '{name}' needs a `run` command"))
                })?;
                Template::parse(run).map_err(|e| {
                    DagError::Configuration(format!("task '{name}' has a bad `run` command: {e}"))
                })?;
            }
            TaskKindName::Regex => {
                let pattern = task.regex.as_deref().ok_or_else(|| {
                    DagError::Configuration(format!("regex task '{name}' needs a `regex` pattern"))
                })?;
                Regex::new(pattern).map_err(|e| {
                    DagError::Configuration(format!("task '{name}' has an invalid regex: {e}"))
                })?;
            }
            TaskKindName::Noop => {}
        }

        match &task.file_filter {
            Some(FileFilterSpec::One(pattern)) => {
                FileFilter::glob(pattern)?;
            }
            Some(FileFilterSpec::Many(patterns)) => {
                FileFilter::globs(patterns)?;
            }
            None => {}
        }
    }
    Ok(())
}

fn validate_slugs(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for (key, task) in cfg.task.iter() {
        let slug = slugify(task.display_name(key));
        if slug.is_empty() {
            return Err(DagError::Configuration(format!(
                "task '{key}' has a name that yields an empty slug"
            )));
        }
        if let Some(other) = seen.insert(slug.clone(), key) {
            return Err(DagError::Configuration(format!(
                "tasks '{other}' and '{key}' share the slug '{slug}'"
            )));
        }
    }
    Ok(())
}

fn validate_root(cfg: &RawConfigFile) -> Result<()> {
    if let Some(root) = &cfg.workflow.root {
        if !cfg.task.contains_key(root) {
            return Err(DagError::Configuration(format!(
                "[workflow].root refers to unknown task '{root}'"
            )));
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.task(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(DagError::Cycle(format!(
            "cycle detected in workflow involving task '{}'",
            cycle.node_id()
        ))),
    }
}

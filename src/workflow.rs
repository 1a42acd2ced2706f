// src/workflow.rs

//! Turn a validated workflow definition into a live [`Graph`].

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::model::{ConfigFile, DefaultSection, FileFilterSpec, TaskConfig, TaskKindName};
use crate::dag::{FileFilter, Graph, Node, NodeId};
use crate::errors::{DagError, Result};

/// Build the graph for `cfg`.
///
/// One node per task, one edge per `after` entry (gated by its `when`).
/// The root is `[workflow].root` if given, else the single entry task,
/// else a synthesized completed root that every entry task follows.
pub fn graph_from_config(cfg: &ConfigFile) -> Result<Graph> {
    let mut graph = Graph::new();
    let entries = cfg.entry_tasks();

    let synthetic_root = if cfg.workflow.root.is_none() && entries.len() > 1 {
        Some(graph.add_node(Node::completed_root(cfg.workflow.name.as_str()))?)
    } else {
        None
    };

    let mut ids: BTreeMap<&str, NodeId> = BTreeMap::new();
    for (key, task) in cfg.task.iter() {
        let node = build_node(key, task, &cfg.default)?;
        ids.insert(key.as_str(), graph.add_node(node)?);
    }

    for (key, task) in cfg.task.iter() {
        let child = lookup(&ids, key)?;
        for after in task.after.iter() {
            let parent = lookup(&ids, after.task())?;
            let edge = graph.follows(child, parent)?;
            if let Some(when) = after.when() {
                edge.when(when.field.clone(), when.equals.clone());
            }
        }
    }

    if let Some(root) = synthetic_root {
        for entry in &entries {
            graph.follows(lookup(&ids, entry)?, root)?;
        }
        debug!(root = %cfg.workflow.name, entries = entries.len(), "synthesized workflow root");
    } else if let Some(root) = &cfg.workflow.root {
        graph.set_root(lookup(&ids, root)?)?;
        if entries.len() > 1 {
            warn!(
                root = %root,
                entries = ?entries,
                "explicit root set; entry tasks not below it will never become ready"
            );
        }
    } else if let Some(entry) = entries.first() {
        graph.set_root(lookup(&ids, entry)?)?;
    }

    info!(tasks = graph.len(), "built workflow graph");
    Ok(graph)
}

fn build_node(key: &str, task: &TaskConfig, defaults: &DefaultSection) -> Result<Node> {
    let name = task.display_name(key);
    let node = match task.effective_kind() {
        TaskKindName::Noop => Node::new(name),
        TaskKindName::Cluster => {
            let run = task.run.as_deref().ok_or_else(|| {
                DagError::Configuration(format!("cluster task '{key}' needs a `run` command"))
            })?;
            Node::cluster(name, run)?.with_modules(task.effective_modules(defaults))
        }
        TaskKindName::Regex => {
            let pattern = task.regex.as_deref().ok_or_else(|| {
                DagError::Configuration(format!("regex task '{key}' needs a `regex` pattern"))
            })?;
            Node::regex(name, pattern, task.stop_on_miss)?
        }
    };

    let node = node.with_params(task.params.clone());
    Ok(match &task.file_filter {
        Some(FileFilterSpec::One(pattern)) => node.with_file_filter(FileFilter::glob(pattern)?),
        Some(FileFilterSpec::Many(patterns)) => node.with_file_filter(FileFilter::globs(patterns)?),
        None => node,
    })
}

fn lookup(ids: &BTreeMap<&str, NodeId>, key: &str) -> Result<NodeId> {
    ids.get(key)
        .copied()
        .ok_or_else(|| DagError::Configuration(format!("unknown task '{key}'")))
}

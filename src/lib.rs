// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod format;
pub mod logging;
pub mod tasks;
pub mod types;
pub mod workflow;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::Graph;
use crate::workflow::graph_from_config;

/// High-level entry point used by `main.rs`.
///
/// Nothing here dispatches jobs: every subcommand is a read-only view of a
/// workflow (optionally overlaid with a snapshot).
pub fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Check { workflow } => check(&workflow),
        Command::Plan { workflow, snapshot } => plan(&workflow, snapshot.as_deref()),
        Command::Snapshot {
            workflow,
            snapshot,
            output,
        } => write_snapshot(&workflow, snapshot.as_deref(), output.as_deref()),
        Command::Fmt { path } => {
            let source = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            print!("{}", format::format_definition(&source));
            Ok(())
        }
    }
}

fn load_graph(path: &Path, snapshot: Option<&Path>) -> Result<(ConfigFile, Graph)> {
    let cfg = load_and_validate(path)
        .with_context(|| format!("loading workflow {}", path.display()))?;
    let mut graph = graph_from_config(&cfg)?;

    if let Some(snapshot) = snapshot {
        let text = fs::read_to_string(snapshot)
            .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
        graph
            .restore(&text)
            .with_context(|| format!("restoring snapshot {}", snapshot.display()))?;
        debug!(path = %snapshot.display(), "restored snapshot");
    }

    Ok((cfg, graph))
}

/// Dry run: print the outline, required modules and every edge.
fn check(path: &Path) -> Result<()> {
    let (cfg, graph) = load_graph(path, None)?;

    println!("clusterdag check: {}", path.display());
    println!();
    println!("outline:");
    for line in graph.outline() {
        println!("  {line}");
    }

    let modules = graph.required_modules();
    if !modules.is_empty() {
        println!();
        println!("required modules:");
        for module in modules {
            println!("  - {module}");
        }
    }

    println!();
    println!("tasks ({}):", cfg.task.len());
    for (key, task) in cfg.task.iter() {
        println!("  - {key} ({:?})", task.effective_kind());
        if let Some(run) = &task.run {
            println!("      run: {run}");
        }
        for after in task.after.iter() {
            match after.when() {
                Some(when) => println!(
                    "      after: {} when {} == {}",
                    after.task(),
                    when.field,
                    when.equals
                ),
                None => println!("      after: {}", after.task()),
            }
        }
    }

    debug!("check complete (no execution)");
    Ok(())
}

fn plan(path: &Path, snapshot: Option<&Path>) -> Result<()> {
    let (_cfg, graph) = load_graph(path, snapshot)?;
    let ready = graph.ready_set()?;

    if ready.is_empty() {
        println!("no tasks ready");
        return Ok(());
    }

    println!("ready ({}):", ready.len());
    for id in ready {
        let Some(state) = graph.state(id) else {
            continue;
        };
        println!("  - {} [{}] ({})", state.name, state.slug, state.status);
        for command in graph.preview(id)? {
            println!("      {command}");
        }
    }
    Ok(())
}

fn write_snapshot(path: &Path, snapshot: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let (_cfg, graph) = load_graph(path, snapshot)?;
    let text = graph.serialize()?;

    match output {
        Some(out) => {
            fs::write(out, format!("{text}\n"))
                .with_context(|| format!("writing snapshot {}", out.display()))?;
        }
        None => println!("{text}"),
    }
    Ok(())
}

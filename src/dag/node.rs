// src/dag/node.rs

//! A single unit of work in the graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dag::binder::BoundParameters;
use crate::dag::filter::FileFilter;
use crate::dag::slug::slugify;
use crate::tasks::{ClusterTask, NoopTask, RecordSnapshot, RegexTask, TaskKind};
use crate::errors::Result;
use crate::types::{Params, TaskStatus, TermArg};

/// Runs before `start`, with the parameters the node is about to use.
pub type PreHook = Box<dyn FnMut(&NodeState, &BoundParameters) + Send>;

/// Runs after `finalize`, with the finalize arguments.
pub type PostHook = Box<dyn FnMut(&NodeState, &FinalizeArgs) + Send>;

/// Public, snapshot-able node data.
///
/// The field names here are the versioned field list of the snapshot
/// format; renaming one is a format change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub name: String,
    pub slug: String,
    pub status: TaskStatus,
    pub job_id: Option<String>,
    pub params: Params,
    pub termargs: Vec<TermArg>,
    /// Output text accumulated from this node's own finalize and from
    /// parents whose conditional passed.
    pub input_text: String,
    pub input_files: Vec<String>,
    /// Description of the file filter; the compiled filter lives on `Node`.
    pub file_filter: Option<String>,
    /// `"<error type>;<message>"` once the node went fatal.
    pub term_error: Option<String>,
}

impl NodeState {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            slug: slugify(&name),
            name,
            status: TaskStatus::Pending,
            job_id: None,
            params: Params::new(),
            termargs: Vec::new(),
            input_text: String::new(),
            input_files: Vec::new(),
            file_filter: None,
            term_error: None,
        }
    }

    /// Every value bound to `key` among the keyed term arguments.
    pub fn termarg_values(&self, key: &str) -> Vec<&Value> {
        self.termargs
            .iter()
            .filter(|arg| arg.key() == Some(key))
            .map(TermArg::value)
            .collect()
    }
}

/// Arguments reported by the external substrate when a node finishes.
#[derive(Debug, Clone, Default)]
pub struct FinalizeArgs {
    pub record: RecordSnapshot,
    pub stdout: String,
    pub files: Vec<String>,
    pub positional: Vec<Value>,
    pub keyword: Params,
}

impl FinalizeArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, record: RecordSnapshot) -> Self {
        self.record = record;
        self
    }

    pub fn stdout(mut self, text: impl Into<String>) -> Self {
        self.stdout = text.into();
        self
    }

    pub fn files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(key.into(), value.into());
        self
    }

    /// Term arguments this finalize hands on, besides the ones the node
    /// already carries: keyword arguments, then positional arguments. The
    /// node's static parameters stay with the node.
    pub(crate) fn produced_termargs(&self) -> Vec<TermArg> {
        self.keyword
            .iter()
            .map(|(k, v)| TermArg::Keyed(k.clone(), v.clone()))
            .chain(self.positional.iter().cloned().map(TermArg::Positional))
            .collect()
    }
}

/// What a call to `Graph::start` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    /// Fully expanded command strings (empty for nodes that run nothing).
    pub commands: Vec<String>,
    /// Status right after starting; `Completed` for no-op nodes, `Pending`
    /// for nodes the orchestrator still has to dispatch.
    pub status: TaskStatus,
}

pub struct Node {
    pub(crate) state: NodeState,
    pub(crate) kind: Box<dyn TaskKind>,
    pub(crate) filter: FileFilter,
    pub(crate) pre_hooks: Vec<PreHook>,
    pub(crate) post_hooks: Vec<PostHook>,
    /// Set once `finalize` has propagated to the children. Not part of the
    /// snapshot field list.
    pub(crate) finalized: bool,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("slug", &self.state.slug)
            .field("status", &self.state.status)
            .field("kind", &self.kind.kind())
            .finish_non_exhaustive()
    }
}

impl Node {
    /// A no-op node: starting it completes it immediately.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, Box::new(NoopTask))
    }

    pub fn with_kind(name: impl Into<String>, kind: Box<dyn TaskKind>) -> Self {
        Self {
            state: NodeState::new(name),
            kind,
            filter: FileFilter::Any,
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
            finalized: false,
        }
    }

    /// A node that expands `run` into cluster command lines.
    pub fn cluster(name: impl Into<String>, run: &str) -> Result<Self> {
        Ok(Self::with_kind(name, Box::new(ClusterTask::new(run)?)))
    }

    /// A node that scrapes named groups out of its input text.
    pub fn regex(name: impl Into<String>, pattern: &str, stop_on_miss: bool) -> Result<Self> {
        Ok(Self::with_kind(
            name,
            Box::new(RegexTask::new(pattern, stop_on_miss)?),
        ))
    }

    /// A synthetic entry point that is already completed.
    pub fn completed_root(name: impl Into<String>) -> Self {
        let mut node = Self::new(name);
        node.state.status = TaskStatus::Completed;
        node
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.state.params.extend(params);
        self
    }

    pub fn with_file_filter(mut self, filter: FileFilter) -> Self {
        self.state.file_filter = filter.label();
        self.filter = filter;
        self
    }

    /// Module list for cluster nodes; ignored by other kinds.
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kind
            .set_modules(modules.into_iter().map(Into::into).collect());
        self
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn kind(&self) -> &dyn TaskKind {
        self.kind.as_ref()
    }

    pub fn slug(&self) -> &str {
        &self.state.slug
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status
    }

    pub fn file_filter(&self) -> &FileFilter {
        &self.filter
    }

    pub(crate) fn accept_files(&mut self, files: &[String]) -> usize {
        let before = self.state.input_files.len();
        for path in files {
            if self.filter.accepts(path) {
                self.state.input_files.push(path.clone());
            }
        }
        self.state.input_files.len() - before
    }
}

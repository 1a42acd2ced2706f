// src/dag/graph.rs

//! The graph aggregate: node set, root, edges and the shared command log.
//!
//! All mutation goes through `&mut Graph`; there is no internal locking.
//! `Graph` is `Send`, so it can live on a single scheduling thread while
//! jobs execute elsewhere and report back over a channel. Calling the
//! transition methods for the same node from several threads needs
//! external mutual exclusion.

use std::collections::{BTreeSet, HashSet};

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, info, warn};

use crate::dag::binder::BoundParameters;
use crate::dag::condition::Condition;
use crate::dag::node::{FinalizeArgs, Node, NodeState, StartOutcome};
use crate::dag::snapshot::node_fields;
use crate::errors::{DagError, Result};
use crate::types::{Params, TaskStatus};

/// Stable handle of a node inside one [`Graph`].
pub type NodeId = NodeIndex;

/// A "runs after" relationship, optionally gated by a conditional.
#[derive(Debug, Clone, Default)]
pub struct Edge {
    condition: Option<Condition>,
}

impl Edge {
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct Graph {
    pub(crate) graph: DiGraph<Node, Edge>,
    pub(crate) root: Option<NodeId>,
    pub(crate) command_log: Vec<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. The first node added becomes the root.
    ///
    /// Slugs are the stable key of the snapshot format, so an empty slug or
    /// one already used in this graph is rejected.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId> {
        let slug = node.slug().to_string();
        if slug.is_empty() {
            return Err(DagError::Configuration(format!(
                "task name {:?} has an empty slug",
                node.name()
            )));
        }
        if self.find(&slug).is_some() {
            return Err(DagError::Configuration(format!(
                "task slug '{slug}' is already used in this graph"
            )));
        }

        let id = self.graph.add_node(node);
        if self.root.is_none() {
            self.root = Some(id);
        }
        debug!(task = %slug, "added task to graph");
        Ok(id)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) -> Result<()> {
        let slug = self.node_ref(id)?.slug().to_string();
        self.root = Some(id);
        debug!(task = %slug, "designated graph root");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node_weight(id)
    }

    pub fn state(&self, id: NodeId) -> Option<&NodeState> {
        self.node(id).map(Node::state)
    }

    pub fn status(&self, id: NodeId) -> Option<TaskStatus> {
        self.node(id).map(Node::status)
    }

    pub fn find(&self, slug: &str) -> Option<NodeId> {
        self.graph
            .node_indices()
            .find(|&id| self.graph[id].slug() == slug)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Direct children, ordered by slug.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors_sorted(id, Direction::Outgoing)
    }

    /// Direct parents, ordered by slug.
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors_sorted(id, Direction::Incoming)
    }

    pub fn edge(&self, parent: NodeId, child: NodeId) -> Option<&Edge> {
        self.graph
            .find_edge(parent, child)
            .map(|e| &self.graph[e])
    }

    /// Every command line produced by any node, in production order.
    pub fn command_log(&self) -> &[String] {
        &self.command_log
    }

    /// Register `child` to run after `parent`.
    ///
    /// Fails with [`DagError::Cycle`] (leaving the graph untouched) when
    /// `parent` is already reachable from `child`. Linking an existing edge
    /// again is a no-op that keeps its conditional. If `child` was the root,
    /// `parent` becomes the root.
    pub fn follows(&mut self, child: NodeId, parent: NodeId) -> Result<EdgeHandle<'_>> {
        let child_slug = self.node_ref(child)?.slug().to_string();
        let parent_slug = self.node_ref(parent)?.slug().to_string();

        if child == parent || has_path_connecting(&self.graph, child, parent, None) {
            return Err(DagError::Cycle(format!(
                "'{child_slug}' cannot follow '{parent_slug}': graph must remain acyclic"
            )));
        }

        let edge = match self.graph.find_edge(parent, child) {
            Some(edge) => edge,
            None => {
                let edge = self.graph.add_edge(parent, child, Edge::default());
                debug!(parent = %parent_slug, child = %child_slug, "linked tasks");
                if self.root == Some(child) {
                    self.root = Some(parent);
                    debug!(task = %parent_slug, "root moved to new parent");
                }
                edge
            }
        };

        Ok(EdgeHandle {
            graph: self,
            parent,
            child,
            edge,
        })
    }

    /// Alias of [`Graph::follows`].
    pub fn depends_on(&mut self, child: NodeId, parent: NodeId) -> Result<EdgeHandle<'_>> {
        self.follows(child, parent)
    }

    /// Register a hook run before `start`.
    pub fn prep<F>(&mut self, id: NodeId, hook: F) -> Result<()>
    where
        F: FnMut(&NodeState, &BoundParameters) + Send + 'static,
    {
        self.node_mut(id)?.pre_hooks.push(Box::new(hook));
        Ok(())
    }

    /// Register a hook run after `finalize`.
    pub fn post<F>(&mut self, id: NodeId, hook: F) -> Result<()>
    where
        F: FnMut(&NodeState, &FinalizeArgs) + Send + 'static,
    {
        self.node_mut(id)?.post_hooks.push(Box::new(hook));
        Ok(())
    }

    /// Nodes eligible for dispatch right now.
    ///
    /// Traversal starts at the root and only descends through `completed`
    /// nodes. A `pending`/`running` node is ready once every parent that is
    /// not `ignored` has completed. Reaching a `fatal` node aborts with
    /// [`DagError::TerminalFailure`].
    pub fn ready_set(&self) -> Result<Vec<NodeId>> {
        let Some(root) = self.root else {
            return Ok(Vec::new());
        };

        let mut ready = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }

            let state = &self.graph[id].state;
            match state.status {
                TaskStatus::Fatal => {
                    warn!(task = %state.slug, "reached task in terminal failure state");
                    return Err(DagError::TerminalFailure {
                        name: state.name.clone(),
                        slug: state.slug.clone(),
                        job_id: state.job_id.clone(),
                    });
                }
                TaskStatus::Pending | TaskStatus::Running => {
                    if self.parents_satisfied(id) {
                        ready.insert(id);
                    }
                }
                TaskStatus::Completed => {
                    stack.extend(self.graph.neighbors_directed(id, Direction::Outgoing));
                }
                TaskStatus::Ignored => {}
            }
        }

        Ok(ready.into_iter().collect())
    }

    /// Expand the node's template against its static parameters and
    /// `overrides`. Does not touch status or the command log.
    pub fn build(&self, id: NodeId, overrides: &Params) -> Result<String> {
        let node = self.node_ref(id)?;
        let template = node.kind.template().ok_or_else(|| {
            DagError::Template(format!("task '{}' has no command template", node.slug()))
        })?;
        let bound = BoundParameters::bind(&node.state.params, &[]).with_overrides(overrides);
        template.render(&bound)
    }

    /// The command lines `start` would produce right now.
    pub fn preview(&self, id: NodeId) -> Result<Vec<String>> {
        let node = self.node_ref(id)?;
        let bound = BoundParameters::bind(&node.state.params, &node.state.termargs);
        node.kind.preview(&node.state, &bound)
    }

    /// Start a pending node.
    ///
    /// The node first scans its accumulated input, then its parameters are
    /// bound (static parameters, term arguments, `overrides`), pre-hooks run
    /// and the specialization starts. Generated commands are appended to the
    /// graph-wide command log. A template error leaves the node's status
    /// unchanged.
    pub fn start(&mut self, id: NodeId, overrides: &Params) -> Result<StartOutcome> {
        let node = self.node_mut(id)?;
        if node.state.status != TaskStatus::Pending {
            return Err(DagError::Usage(format!(
                "cannot start task '{}' in status {}",
                node.state.slug, node.state.status
            )));
        }

        let Node {
            state,
            kind,
            pre_hooks,
            ..
        } = node;

        kind.scan_input(state);
        if state.status == TaskStatus::Fatal {
            return Ok(StartOutcome {
                commands: Vec::new(),
                status: TaskStatus::Fatal,
            });
        }

        let bound = BoundParameters::bind(&state.params, &state.termargs).with_overrides(overrides);
        for hook in pre_hooks.iter_mut() {
            hook(&*state, &bound);
        }

        let commands = kind.start(state, &bound)?;
        let status = state.status;
        info!(
            task = %state.slug,
            kind = kind.kind(),
            commands = commands.len(),
            %status,
            "started task"
        );

        self.command_log.extend(commands.iter().cloned());
        Ok(StartOutcome { commands, status })
    }

    /// Record that the node was dispatched as `job_id`.
    pub fn set_running(&mut self, id: NodeId, job_id: impl Into<String>) -> Result<()> {
        let node = self.node_mut(id)?;
        match node.state.status {
            TaskStatus::Pending | TaskStatus::Running => {
                node.state.job_id = Some(job_id.into());
                node.state.status = TaskStatus::Running;
                debug!(task = %node.state.slug, job_id = ?node.state.job_id, "task running");
                Ok(())
            }
            other => Err(DagError::Usage(format!(
                "cannot mark task '{}' running from status {other}",
                node.state.slug
            ))),
        }
    }

    /// Record a terminal failure with a `"<type>;<message>"` summary.
    pub fn set_fatal<E>(&mut self, id: NodeId, error: &E) -> Result<()>
    where
        E: std::error::Error + ?Sized,
    {
        let summary = format!("{};{}", std::any::type_name::<E>(), error);
        let node = self.node_mut(id)?;
        match node.state.status {
            TaskStatus::Pending | TaskStatus::Running | TaskStatus::Fatal => {
                warn!(task = %node.state.slug, error = %summary, "task failed");
                node.state.status = TaskStatus::Fatal;
                node.state.term_error = Some(summary);
                Ok(())
            }
            other => Err(DagError::Usage(format!(
                "cannot mark task '{}' fatal from status {other}",
                node.state.slug
            ))),
        }
    }

    /// Put a fatal node back to `pending` so it can be dispatched again.
    pub fn resubmit(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.state.status != TaskStatus::Fatal {
            return Err(DagError::Usage(format!(
                "only fatal tasks can be resubmitted; '{}' is {}",
                node.state.slug, node.state.status
            )));
        }
        node.state.status = TaskStatus::Pending;
        node.state.term_error = None;
        node.state.job_id = None;
        info!(task = %node.state.slug, "task resubmitted");
        Ok(())
    }

    /// Complete a node and propagate to its children.
    ///
    /// Each child's conditional is evaluated against this node's attribute
    /// snapshot merged with `args.keyword` (no conditional means pass).
    /// Passing children receive the filtered file list and the output text;
    /// a failing conditional moves a still-pending child to `ignored`.
    /// Every child receives this node's term arguments.
    pub fn finalize(&mut self, id: NodeId, args: FinalizeArgs) -> Result<()> {
        let (context, outgoing) = {
            let node = self.node_mut(id)?;
            if matches!(node.state.status, TaskStatus::Fatal | TaskStatus::Ignored) {
                return Err(DagError::Usage(format!(
                    "cannot finalize task '{}' in status {}",
                    node.state.slug, node.state.status
                )));
            }
            if node.finalized {
                return Err(DagError::Usage(format!(
                    "task '{}' was already finalized",
                    node.state.slug
                )));
            }

            node.finalized = true;
            node.state.input_text.push_str(&args.stdout);
            node.state.status = TaskStatus::Completed;
            let produced = args.produced_termargs();
            node.state.termargs.extend(produced);

            let mut context = node_fields(node)?;
            context.extend(args.keyword.clone());
            (context, node.state.termargs.clone())
        };

        let edges: Vec<(NodeId, EdgeIndex)> = self
            .graph
            .edges_directed(id, Direction::Outgoing)
            .map(|e| (e.target(), e.id()))
            .collect();

        for (child, edge) in edges {
            let passed = self.graph[edge]
                .condition
                .as_ref()
                .is_none_or(|c| c.evaluate(&context));

            let child_node = &mut self.graph[child];
            if passed {
                let accepted = child_node.accept_files(&args.files);
                child_node.state.input_text.push_str(&args.stdout);
                debug!(task = %child_node.state.slug, accepted, "conditional passed");
            } else if child_node.state.status == TaskStatus::Pending {
                child_node.state.status = TaskStatus::Ignored;
                info!(task = %child_node.state.slug, "conditional failed; task ignored");
            } else {
                debug!(
                    task = %child_node.state.slug,
                    status = %child_node.state.status,
                    "conditional failed; task already past pending"
                );
            }
            child_node.state.termargs.extend(outgoing.iter().cloned());
        }

        let node = &mut self.graph[id];
        for hook in node.post_hooks.iter_mut() {
            hook(&node.state, &args);
        }
        info!(task = %node.state.slug, files = args.files.len(), "finalized task");
        Ok(())
    }

    /// Nodes reachable from the root, in depth-first order (children by slug).
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(root) = self.root else {
            return out;
        };
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    /// Union of the module lists of every reachable node.
    pub fn required_modules(&self) -> BTreeSet<String> {
        self.reachable()
            .into_iter()
            .flat_map(|id| self.graph[id].kind.modules().iter().cloned())
            .collect()
    }

    /// One line per reachable node, indented by depth. Nodes with a
    /// template show it on a single line; shared nodes are listed once.
    pub fn outline(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(root) = self.root {
            let mut seen = HashSet::new();
            self.outline_node(root, 0, &mut seen, &mut lines);
        }
        lines
    }

    fn outline_node(
        &self,
        id: NodeId,
        depth: usize,
        seen: &mut HashSet<NodeId>,
        lines: &mut Vec<String>,
    ) {
        let node = &self.graph[id];
        let indent = "  ".repeat(depth);
        if !seen.insert(id) {
            lines.push(format!("{indent}{} (see above)", node.name()));
            return;
        }

        match node.kind.template() {
            Some(template) => {
                let command = template.source().split_whitespace().collect::<Vec<_>>();
                lines.push(format!("{indent}{} [\"{}\"]", node.name(), command.join(" ")));
            }
            None => lines.push(format!("{indent}{}", node.name())),
        }

        for child in self.children(id) {
            self.outline_node(child, depth + 1, seen, lines);
        }
    }

    fn parents_satisfied(&self, id: NodeId) -> bool {
        self.graph
            .neighbors_directed(id, Direction::Incoming)
            .map(|p| self.graph[p].state.status)
            .filter(|status| *status != TaskStatus::Ignored)
            .all(|status| status == TaskStatus::Completed)
    }

    fn neighbors_sorted(&self, id: NodeId, direction: Direction) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.graph.neighbors_directed(id, direction).collect();
        ids.sort_by(|a, b| self.graph[*a].slug().cmp(self.graph[*b].slug()));
        ids
    }

    pub(crate) fn node_ref(&self, id: NodeId) -> Result<&Node> {
        self.graph
            .node_weight(id)
            .ok_or_else(|| DagError::Usage(format!("unknown task id {}", id.index())))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.graph
            .node_weight_mut(id)
            .ok_or_else(|| DagError::Usage(format!("unknown task id {}", id.index())))
    }
}

/// Handle on one parent → child edge, used to attach conditionals.
///
/// ```
/// # use clusterdag::dag::{Graph, Node};
/// # fn main() -> clusterdag::errors::Result<()> {
/// let mut graph = Graph::new();
/// let qc = graph.add_node(Node::new("QC"))?;
/// let assemble = graph.add_node(Node::new("Assemble"))?;
/// let report = graph.add_node(Node::new("Report failure"))?;
/// graph.follows(assemble, qc)?.when("passed", true).otherwise(report)?;
/// # Ok(())
/// # }
/// ```
pub struct EdgeHandle<'g> {
    graph: &'g mut Graph,
    parent: NodeId,
    child: NodeId,
    edge: EdgeIndex,
}

impl<'g> EdgeHandle<'g> {
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn child(&self) -> NodeId {
        self.child
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.graph.graph[self.edge].condition.as_ref()
    }

    /// Gate the edge on `kwargs[field] == value`, replacing any conditional.
    pub fn when(self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.when_condition(Condition::equals(field, value))
    }

    /// Gate the edge on an arbitrary predicate, replacing any conditional.
    pub fn when_fn<F>(self, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Params) -> bool + Send + Sync + 'static,
    {
        self.when_condition(Condition::predicate(label, predicate))
    }

    pub fn when_condition(self, condition: Condition) -> Self {
        debug!(condition = %condition, "edge conditional set");
        self.graph.graph[self.edge].condition = Some(condition);
        self
    }

    pub fn and(self, other: Condition) -> Result<Self> {
        let current = self.registered("and")?.clone();
        Ok(self.when_condition(current.and(other)))
    }

    pub fn or(self, other: Condition) -> Result<Self> {
        let current = self.registered("or")?.clone();
        Ok(self.when_condition(current.or(other)))
    }

    /// Link `alternative` as another child of the same parent, gated by the
    /// negation of this edge's conditional. Returns the new edge's handle.
    pub fn otherwise(self, alternative: NodeId) -> Result<EdgeHandle<'g>> {
        let negated = self.registered("else")?.clone().negate();
        let parent = self.parent;
        let graph = self.graph;
        Ok(graph.follows(alternative, parent)?.when_condition(negated))
    }

    /// Make this edge's child also follow `parent`.
    pub fn follows(self, parent: NodeId) -> Result<EdgeHandle<'g>> {
        let child = self.child;
        let graph = self.graph;
        graph.follows(child, parent)
    }

    fn registered(&self, combinator: &str) -> Result<&Condition> {
        self.condition().ok_or_else(|| {
            DagError::Usage(format!(
                "'{combinator}' called on an edge without a conditional (use 'when' first)"
            ))
        })
    }
}

// src/dag/snapshot.rs

//! Tree-shaped JSON snapshot of a graph.
//!
//! The document is a nested object starting at the root. Every node's
//! public fields appear at top level of its object, children go under
//! `~children`. A node reachable through several parents is written in full
//! the first time and as `{"slug": ...}` afterwards. The root additionally
//! carries `~version` and the graph's `command_log`.
//!
//! Output is deterministic: keys are sorted, children are ordered by slug,
//! indentation is two spaces and all non-ASCII characters are escaped.

use std::collections::{HashMap, HashSet};
use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::dag::graph::{Graph, NodeId};
use crate::dag::node::{Node, NodeState};
use crate::errors::{DagError, Result};
use crate::tasks::TaskKind;
use crate::types::{Params, TaskStatus};

/// Version written under `~version`; restore rejects anything else.
pub const SNAPSHOT_VERSION: u64 = 1;

const CHILDREN_KEY: &str = "~children";
const VERSION_KEY: &str = "~version";
const RESERVED_PREFIX: char = '~';
const COMMAND_LOG_KEY: &str = "command_log";
const KIND_KEY: &str = "kind";

impl Graph {
    /// Serialize the graph reachable from the root.
    pub fn serialize(&self) -> Result<String> {
        let root = self
            .root
            .ok_or_else(|| DagError::Usage("cannot serialize a graph without a root".into()))?;

        let mut emitted = HashSet::new();
        let mut document = self.encode_node(root, &mut emitted)?;
        if let Value::Object(map) = &mut document {
            map.insert(VERSION_KEY.into(), Value::from(SNAPSHOT_VERSION));
        }
        debug!(tasks = emitted.len(), "serialized graph snapshot");
        to_ascii_json(&document)
    }

    /// Overlay a snapshot onto this graph.
    ///
    /// The graph must already have the snapshot's shape; nodes are matched
    /// to snapshot entries by slug. Reference-only entries update nothing
    /// beyond their slug. On error the graph is left untouched.
    pub fn restore(&mut self, snapshot: &str) -> Result<()> {
        let document: Value = serde_json::from_str(snapshot)?;
        let top = document
            .as_object()
            .ok_or_else(|| DagError::Snapshot("snapshot must be a JSON object".into()))?;

        match top.get(VERSION_KEY).and_then(Value::as_u64) {
            Some(SNAPSHOT_VERSION) => {}
            other => {
                return Err(DagError::Snapshot(format!(
                    "unsupported snapshot version {other:?} (expected {SNAPSHOT_VERSION})"
                )));
            }
        }

        let root = self
            .root
            .ok_or_else(|| DagError::Usage("cannot restore into a graph without a root".into()))?;
        let root_slug = self.graph[root].slug();
        let snap_slug = top.get("slug").and_then(Value::as_str);
        if snap_slug != Some(root_slug) {
            return Err(DagError::Snapshot(format!(
                "snapshot root {snap_slug:?} does not match graph root '{root_slug}'"
            )));
        }

        let mut plan = RestorePlan::default();
        self.stage_node(root, top, &mut plan)?;
        let restored = plan.commit(self);
        debug!(tasks = restored, "restored graph snapshot");
        Ok(())
    }

    fn encode_node(&self, id: NodeId, emitted: &mut HashSet<String>) -> Result<Value> {
        let node = &self.graph[id];
        let mut map = Map::new();

        if !emitted.insert(node.slug().to_string()) {
            map.insert("slug".into(), Value::from(node.slug()));
            return Ok(Value::Object(map));
        }

        map.extend(node_fields(node)?);
        if self.root == Some(id) {
            map.insert(COMMAND_LOG_KEY.into(), Value::from(self.command_log.clone()));
        }

        let children = self
            .children(id)
            .into_iter()
            .map(|child| self.encode_node(child, emitted))
            .collect::<Result<Vec<_>>>()?;
        map.insert(CHILDREN_KEY.into(), Value::Array(children));

        Ok(Value::Object(map))
    }

    fn stage_node(
        &self,
        id: NodeId,
        entry: &Map<String, Value>,
        plan: &mut RestorePlan,
    ) -> Result<()> {
        plan.stage(id, &self.graph[id], entry)?;

        let Some(children) = entry.get(CHILDREN_KEY) else {
            return Ok(());
        };
        let children = children.as_array().ok_or_else(|| {
            DagError::Snapshot(format!("{CHILDREN_KEY} of '{}' must be a list", self.graph[id].slug()))
        })?;

        for child in self.children(id) {
            let slug = self.graph[child].slug();
            for snap in children {
                let snap = snap.as_object().ok_or_else(|| {
                    DagError::Snapshot(format!("child entry under '{slug}' must be an object"))
                })?;
                if snap.get("slug").and_then(Value::as_str) == Some(slug) {
                    self.stage_node(child, snap, plan)?;
                }
            }
        }
        Ok(())
    }
}

/// Decoded node states and kinds waiting to be written back. Nothing in
/// the graph changes until every entry has been staged without error.
#[derive(Default)]
struct RestorePlan {
    nodes: Vec<(NodeId, NodeState, Box<dyn TaskKind>)>,
    index: HashMap<NodeId, usize>,
    command_log: Option<Vec<String>>,
}

impl RestorePlan {
    fn stage(&mut self, id: NodeId, node: &Node, entry: &Map<String, Value>) -> Result<()> {
        // A node listed twice (full entry, then reference) builds on what
        // was already staged for it.
        let slot = self.index.get(&id).copied();
        let (current, mut kind) = match slot {
            Some(i) => (&self.nodes[i].1, self.nodes[i].2.clone_kind()),
            None => (&node.state, node.kind.clone_kind()),
        };
        let mut state: Map<String, Value> = serde_json::from_value(serde_json::to_value(current)?)?;

        for (key, value) in entry {
            if key.starts_with(RESERVED_PREFIX) {
                continue;
            }
            if state.contains_key(key) {
                state.insert(key.clone(), value.clone());
            } else if key == KIND_KEY {
                if value.as_str() != Some(kind.kind()) {
                    return Err(DagError::Snapshot(format!(
                        "task '{}' is a {} task but the snapshot says {value}",
                        node.state.slug,
                        kind.kind()
                    )));
                }
            } else if key == COMMAND_LOG_KEY {
                self.command_log = Some(serde_json::from_value::<Vec<String>>(value.clone())?);
            } else if !kind.restore_field(key, value)? {
                warn!(task = %node.state.slug, field = %key, "ignoring unknown snapshot field");
            }
        }

        let state = serde_json::from_value::<NodeState>(Value::Object(state))
            .map_err(|e| DagError::Snapshot(format!("bad fields for '{}': {e}", node.state.slug)))?;

        match slot {
            Some(i) => self.nodes[i] = (id, state, kind),
            None => {
                self.index.insert(id, self.nodes.len());
                self.nodes.push((id, state, kind));
            }
        }
        Ok(())
    }

    fn commit(self, graph: &mut Graph) -> usize {
        let restored = self.nodes.len();
        for (id, state, kind) in self.nodes {
            let node = &mut graph.graph[id];
            node.finalized = state.status == TaskStatus::Completed;
            node.state = state;
            node.kind = kind;
        }
        if let Some(log) = self.command_log {
            graph.command_log = log;
        }
        restored
    }
}

/// Public fields of a node: its state plus whatever its kind exposes.
pub(crate) fn node_fields(node: &Node) -> Result<Params> {
    let mut fields: Params = serde_json::from_value(serde_json::to_value(&node.state)?)?;
    fields.extend(node.kind.snapshot_fields());
    fields.insert(KIND_KEY.into(), Value::from(node.kind.kind()));
    Ok(fields)
}

fn to_ascii_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter::default());
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| DagError::Snapshot(format!("snapshot is not UTF-8: {e}")))
}

/// Two-space pretty printing with every non-ASCII character written as a
/// `\uXXXX` escape (surrogate pairs outside the BMP).
struct AsciiFormatter {
    pretty: PrettyFormatter<'static>,
}

impl Default for AsciiFormatter {
    fn default() -> Self {
        Self {
            pretty: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

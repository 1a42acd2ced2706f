// src/dag/mod.rs

//! The dependency-graph engine.
//!
//! - [`graph`] owns the nodes and edges, computes the ready set and drives
//!   node lifecycle transitions.
//! - [`node`] defines the node contract and its public state.
//! - [`condition`] holds the conditional-edge expression tree.
//! - [`binder`] and [`template`] turn parameters into command text.
//! - [`filter`] decides which finalize files a child accepts.
//! - [`snapshot`] reads and writes the tree-shaped JSON snapshot.

pub mod binder;
pub mod condition;
pub mod filter;
pub mod graph;
pub mod node;
pub mod slug;
pub mod snapshot;
pub mod template;

pub use binder::{BoundParameters, value_text};
pub use condition::{Condition, Predicate};
pub use filter::FileFilter;
pub use graph::{Edge, EdgeHandle, Graph, NodeId};
pub use node::{FinalizeArgs, Node, NodeState, PostHook, PreHook, StartOutcome};
pub use slug::slugify;
pub use snapshot::SNAPSHOT_VERSION;
pub use template::Template;

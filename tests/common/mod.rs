#![allow(dead_code)]

pub use clusterdag_test_utils::{id_of, init_tracing};

use clusterdag::dag::{FileFilter, Graph, Node, NodeId};

/// Five-node diamond used across the graph tests:
///
/// ```text
///        A
///       / \
///      B   C
///       \ / \
///        D   E (when TEST_PARAMETER == "TEST_VALUE")
/// ```
///
/// B only accepts files matching `*fasta`.
pub struct Diamond {
    pub graph: Graph,
    pub a: NodeId,
    pub b: NodeId,
    pub c: NodeId,
    pub d: NodeId,
    pub e: NodeId,
}

pub fn diamond() -> Diamond {
    let mut graph = Graph::new();
    let a = graph.add_node(Node::new("Task A")).unwrap();
    let b = graph
        .add_node(Node::new("Task B").with_file_filter(FileFilter::glob("*fasta").unwrap()))
        .unwrap();
    let c = graph.add_node(Node::new("Task C")).unwrap();
    let d = graph.add_node(Node::new("Task D")).unwrap();
    let e = graph.add_node(Node::new("Task E")).unwrap();

    graph.follows(b, a).unwrap();
    graph.follows(c, a).unwrap();
    graph.follows(d, b).unwrap().follows(c).unwrap();
    graph
        .follows(e, c)
        .unwrap()
        .when("TEST_PARAMETER", "TEST_VALUE");

    Diamond {
        graph,
        a,
        b,
        c,
        d,
        e,
    }
}

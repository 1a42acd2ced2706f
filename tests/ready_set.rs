// tests/ready_set.rs

mod common;
use crate::common::{diamond, init_tracing};

use clusterdag::dag::{FinalizeArgs, Graph, Node};
use clusterdag::errors::DagError;
use clusterdag::types::{Params, TaskStatus};

#[derive(Debug, thiserror::Error)]
#[error("scheduler rejected job")]
struct SubmitError;

#[test]
fn test_empty_graph_has_empty_ready_set() {
    let graph = Graph::new();
    assert!(graph.ready_set().unwrap().is_empty());
}

#[test]
fn test_pending_root_is_the_only_ready_node() {
    init_tracing();
    let fx = diamond();
    assert_eq!(fx.graph.ready_set().unwrap(), vec![fx.a]);
}

#[test]
fn test_and_join_waits_for_both_parents() {
    let mut fx = diamond();
    fx.graph.finalize(fx.a, FinalizeArgs::new()).unwrap();

    let mut ready = fx.graph.ready_set().unwrap();
    ready.sort();
    assert_eq!(ready, vec![fx.b, fx.c]);

    fx.graph.finalize(fx.b, FinalizeArgs::new()).unwrap();
    let ready = fx.graph.ready_set().unwrap();
    assert!(!ready.contains(&fx.d), "D must wait for C");
    assert!(ready.contains(&fx.c));

    fx.graph.finalize(fx.c, FinalizeArgs::new()).unwrap();
    let ready = fx.graph.ready_set().unwrap();
    assert_eq!(ready.iter().filter(|&&id| id == fx.d).count(), 1);
    assert!(!ready.contains(&fx.e), "E is gated by a failed conditional");
}

#[test]
fn test_running_nodes_stay_in_ready_set() {
    let mut fx = diamond();
    fx.graph.set_running(fx.a, "1234").unwrap();
    assert_eq!(fx.graph.ready_set().unwrap(), vec![fx.a]);
    assert_eq!(fx.graph.state(fx.a).unwrap().job_id.as_deref(), Some("1234"));
}

#[test]
fn test_fatal_short_circuit_and_resubmission() {
    let mut fx = diamond();
    fx.graph.finalize(fx.a, FinalizeArgs::new()).unwrap();
    fx.graph.set_running(fx.b, "99").unwrap();
    fx.graph.set_fatal(fx.b, &SubmitError).unwrap();

    match fx.graph.ready_set() {
        Err(DagError::TerminalFailure { name, slug, job_id }) => {
            assert_eq!(name, "Task B");
            assert_eq!(slug, "task-b");
            assert_eq!(job_id.as_deref(), Some("99"));
        }
        other => panic!("Expected TerminalFailure, got: {:?}", other),
    }

    let state = fx.graph.state(fx.b).unwrap();
    let summary = state.term_error.as_deref().unwrap();
    assert!(summary.ends_with(";scheduler rejected job"), "{summary}");
    assert!(summary.contains("SubmitError"));

    fx.graph.resubmit(fx.b).unwrap();
    let state = fx.graph.state(fx.b).unwrap();
    assert_eq!(state.status, TaskStatus::Pending);
    assert!(state.term_error.is_none());
    assert!(state.job_id.is_none());

    let ready = fx.graph.ready_set().unwrap();
    assert!(ready.contains(&fx.b));
}

#[test]
fn test_only_fatal_nodes_can_be_resubmitted() {
    let mut fx = diamond();
    assert!(matches!(fx.graph.resubmit(fx.a), Err(DagError::Usage(_))));
}

#[test]
fn test_ignored_node_never_becomes_ready() {
    let mut fx = diamond();
    fx.graph.finalize(fx.a, FinalizeArgs::new()).unwrap();
    fx.graph
        .finalize(fx.c, FinalizeArgs::new().kwarg("TEST_PARAMETER", "other"))
        .unwrap();
    assert_eq!(fx.graph.status(fx.e), Some(TaskStatus::Ignored));

    fx.graph.finalize(fx.b, FinalizeArgs::new()).unwrap();
    fx.graph.finalize(fx.d, FinalizeArgs::new()).unwrap();
    assert!(fx.graph.ready_set().unwrap().is_empty());
    assert_eq!(fx.graph.status(fx.e), Some(TaskStatus::Ignored));
}

#[test]
fn test_ignored_parent_does_not_block_join() {
    // A -> B, A -> C (gated), B -> D, C -> D
    let mut graph = Graph::new();
    let a = graph.add_node(Node::new("a")).unwrap();
    let b = graph.add_node(Node::new("b")).unwrap();
    let c = graph.add_node(Node::new("c")).unwrap();
    let d = graph.add_node(Node::new("d")).unwrap();
    graph.follows(b, a).unwrap();
    graph.follows(c, a).unwrap().when("run_c", true);
    graph.follows(d, b).unwrap().follows(c).unwrap();

    graph.finalize(a, FinalizeArgs::new().kwarg("run_c", false)).unwrap();
    assert_eq!(graph.status(c), Some(TaskStatus::Ignored));
    assert_eq!(graph.ready_set().unwrap(), vec![b]);

    graph.finalize(b, FinalizeArgs::new()).unwrap();
    assert_eq!(graph.ready_set().unwrap(), vec![d]);
}

#[test]
fn test_failing_conditional_leaves_started_child_alone() {
    let mut graph = Graph::new();
    let a = graph.add_node(Node::new("a")).unwrap();
    let b = graph.add_node(Node::new("b")).unwrap();
    let c = graph.add_node(Node::new("c")).unwrap();
    graph.follows(c, a).unwrap();
    graph.follows(c, b).unwrap().when("go", true);
    graph.set_root(a).unwrap();

    graph.finalize(a, FinalizeArgs::new()).unwrap();
    graph.set_running(c, "7").unwrap();
    graph.finalize(b, FinalizeArgs::new().kwarg("go", false)).unwrap();
    assert_eq!(graph.status(c), Some(TaskStatus::Running));
}

#[test]
fn test_start_completes_noop_and_unlocks_children() {
    let mut fx = diamond();
    let outcome = fx.graph.start(fx.a, &Params::new()).unwrap();
    assert_eq!(outcome.status, TaskStatus::Completed);
    assert!(outcome.commands.is_empty());

    // A no-op completes on start, but only finalize propagates to children.
    fx.graph.finalize(fx.a, FinalizeArgs::new()).unwrap();
    assert_eq!(fx.graph.ready_set().unwrap(), vec![fx.b, fx.c]);
}

#[test]
fn test_invalid_transitions_are_usage_errors() {
    let mut fx = diamond();
    fx.graph.finalize(fx.a, FinalizeArgs::new()).unwrap();

    assert!(matches!(
        fx.graph.start(fx.a, &Params::new()),
        Err(DagError::Usage(_))
    ));
    assert!(matches!(
        fx.graph.set_running(fx.a, "1"),
        Err(DagError::Usage(_))
    ));
    assert!(matches!(
        fx.graph.set_fatal(fx.a, &SubmitError),
        Err(DagError::Usage(_))
    ));

    fx.graph.set_fatal(fx.b, &SubmitError).unwrap();
    assert!(matches!(
        fx.graph.finalize(fx.b, FinalizeArgs::new()),
        Err(DagError::Usage(_))
    ));
}

#[test]
fn test_completed_root_stands_in_for_entry_point() {
    let mut graph = Graph::new();
    let root = graph.add_node(Node::completed_root("workflow")).unwrap();
    let x = graph.add_node(Node::new("x")).unwrap();
    let y = graph.add_node(Node::new("y")).unwrap();
    graph.follows(x, root).unwrap();
    graph.follows(y, root).unwrap();

    assert_eq!(graph.ready_set().unwrap(), vec![x, y]);
}

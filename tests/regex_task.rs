// tests/regex_task.rs

mod common;
use crate::common::init_tracing;

use clusterdag::dag::{FinalizeArgs, Graph, Node, NodeId};
use clusterdag::errors::DagError;
use clusterdag::tasks::RegexTask;
use clusterdag::types::{Params, TaskStatus};
use serde_json::json;

const STATS_RE: &str = r"N50: (?P<n50>\d+), contigs: (?P<contigs>\d+)(?P<default_tail>.*)";

/// `assemble` (noop) -> `stats` (regex) -> `polish` (cluster using `{n50}`).
fn pipeline(stop_on_miss: bool) -> (Graph, NodeId, NodeId, NodeId) {
    let mut graph = Graph::new();
    let assemble = graph.add_node(Node::new("assemble")).unwrap();
    let stats = graph
        .add_node(Node::regex("stats", STATS_RE, stop_on_miss).unwrap())
        .unwrap();
    let polish = graph
        .add_node(Node::cluster("polish", "polish --min {n50}").unwrap())
        .unwrap();
    graph.follows(stats, assemble).unwrap();
    graph.follows(polish, stats).unwrap();
    (graph, assemble, stats, polish)
}

#[test]
fn test_named_groups_become_term_arguments() {
    init_tracing();
    let (mut graph, assemble, stats, polish) = pipeline(false);
    graph
        .finalize(
            assemble,
            FinalizeArgs::new().stdout("N50: 1200, contigs: 55 (trailing)\n"),
        )
        .unwrap();

    let outcome = graph.start(stats, &Params::new()).unwrap();
    assert_eq!(outcome.status, TaskStatus::Completed);
    assert!(outcome.commands.is_empty());

    let state = graph.state(stats).unwrap();
    assert_eq!(state.termarg_values("n50"), vec![&json!("1200")]);
    assert_eq!(state.termarg_values("contigs"), vec![&json!("55")]);
    assert!(state.termarg_values("default_tail").is_empty());

    graph.finalize(stats, FinalizeArgs::new()).unwrap();
    assert_eq!(graph.ready_set().unwrap(), vec![polish]);
    assert_eq!(graph.preview(polish).unwrap(), vec!["polish --min 1200"]);
}

#[test]
fn test_miss_without_stop_completes_quietly() {
    let (mut graph, assemble, stats, _polish) = pipeline(false);
    graph
        .finalize(assemble, FinalizeArgs::new().stdout("no stats here"))
        .unwrap();

    let outcome = graph.start(stats, &Params::new()).unwrap();
    assert_eq!(outcome.status, TaskStatus::Completed);
    assert!(graph.state(stats).unwrap().termargs.is_empty());
}

#[test]
fn test_miss_with_stop_on_miss_goes_fatal() {
    let (mut graph, assemble, stats, _polish) = pipeline(true);
    graph
        .finalize(assemble, FinalizeArgs::new().stdout("no stats here"))
        .unwrap();

    let outcome = graph.start(stats, &Params::new()).unwrap();
    assert_eq!(outcome.status, TaskStatus::Fatal);

    let error = graph.state(stats).unwrap().term_error.clone().unwrap();
    assert!(error.starts_with("RegexMiss;"), "{error}");

    match graph.ready_set() {
        Err(DagError::TerminalFailure { slug, .. }) => assert_eq!(slug, "stats"),
        other => panic!("Expected TerminalFailure, got: {:?}", other),
    }
}

#[test]
fn test_scrape_directly() {
    let task = RegexTask::new(r"job (?P<job>\d+) submitted", false).unwrap();
    let mut state = clusterdag::dag::NodeState::new("submit");
    assert!(task.scrape("job 4711 submitted to queue", &mut state));
    assert_eq!(state.termarg_values("job"), vec![&json!("4711")]);
    assert!(!task.scrape("nothing", &mut state));
    assert_eq!(task.pattern(), r"job (?P<job>\d+) submitted");
    assert!(!task.stop_on_miss());
}

#[test]
fn test_invalid_regex_is_a_configuration_error() {
    assert!(matches!(
        Node::regex("bad", "(unclosed", false),
        Err(DagError::Configuration(_))
    ));
}

// tests/graph_structure.rs

mod common;
use crate::common::{diamond, init_tracing};

use clusterdag::dag::{Condition, Graph, Node, slugify};
use clusterdag::errors::DagError;
use clusterdag::types::Params;
use serde_json::json;

#[test]
fn test_first_node_is_root_until_it_follows_another() {
    init_tracing();
    let mut graph = Graph::new();
    let child = graph.add_node(Node::new("child")).unwrap();
    assert_eq!(graph.root(), Some(child));

    let parent = graph.add_node(Node::new("parent")).unwrap();
    assert_eq!(graph.root(), Some(child));

    graph.follows(child, parent).unwrap();
    assert_eq!(graph.root(), Some(parent));
}

#[test]
fn test_set_root_overrides_implicit_root() {
    let mut graph = Graph::new();
    let a = graph.add_node(Node::new("a")).unwrap();
    let b = graph.add_node(Node::new("b")).unwrap();
    graph.set_root(b).unwrap();
    assert_eq!(graph.root(), Some(b));
    assert_ne!(graph.root(), Some(a));
}

#[test]
fn test_cycle_is_rejected_and_graph_unchanged() {
    let mut fx = diamond();
    let children_before = fx.graph.children(fx.d);
    let parents_before = fx.graph.parents(fx.a);

    match fx.graph.follows(fx.a, fx.d) {
        Err(DagError::Cycle(msg)) => {
            assert!(msg.contains("task-a"));
            assert!(msg.contains("task-d"));
        }
        Err(e) => panic!("Expected Cycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    assert_eq!(fx.graph.children(fx.d), children_before);
    assert_eq!(fx.graph.parents(fx.a), parents_before);
    assert_eq!(fx.graph.root(), Some(fx.a));
}

#[test]
fn test_self_loop_is_a_cycle() {
    let mut graph = Graph::new();
    let a = graph.add_node(Node::new("a")).unwrap();
    assert!(matches!(graph.follows(a, a), Err(DagError::Cycle(_))));
    assert!(graph.children(a).is_empty());
}

#[test]
fn test_duplicate_and_empty_slugs_are_rejected() {
    let mut graph = Graph::new();
    graph.add_node(Node::new("Task A")).unwrap();

    assert!(matches!(
        graph.add_node(Node::new("task   a")),
        Err(DagError::Configuration(_))
    ));
    assert!(matches!(
        graph.add_node(Node::new("## !!")),
        Err(DagError::Configuration(_))
    ));
    assert_eq!(graph.len(), 1);
}

#[test]
fn test_relinking_an_edge_keeps_its_conditional() {
    let mut fx = diamond();
    fx.graph.follows(fx.e, fx.c).unwrap();

    let edge = fx.graph.edge(fx.c, fx.e).unwrap();
    let condition = edge.condition().expect("conditional kept");
    assert_eq!(condition.to_string(), "TEST_PARAMETER == \"TEST_VALUE\"");
    assert_eq!(fx.graph.parents(fx.e), vec![fx.c]);
}

#[test]
fn test_children_and_parents_are_sorted_by_slug() {
    let fx = diamond();
    assert_eq!(fx.graph.children(fx.a), vec![fx.b, fx.c]);
    assert_eq!(fx.graph.children(fx.c), vec![fx.d, fx.e]);
    assert_eq!(fx.graph.parents(fx.d), vec![fx.b, fx.c]);
}

#[test]
fn test_depends_on_is_follows() {
    let mut graph = Graph::new();
    let a = graph.add_node(Node::new("a")).unwrap();
    let b = graph.add_node(Node::new("b")).unwrap();
    let handle = graph.depends_on(b, a).unwrap();
    assert_eq!(handle.parent(), a);
    assert_eq!(handle.child(), b);
    assert_eq!(graph.children(a), vec![b]);
}

#[test]
fn test_combinators_require_a_conditional_first() {
    let mut graph = Graph::new();
    let a = graph.add_node(Node::new("a")).unwrap();
    let b = graph.add_node(Node::new("b")).unwrap();
    let c = graph.add_node(Node::new("c")).unwrap();

    let and = graph.follows(b, a).unwrap().and(Condition::equals("x", 1));
    assert!(matches!(and, Err(DagError::Usage(_))));

    let or = graph.follows(b, a).unwrap().or(Condition::equals("x", 1));
    assert!(matches!(or, Err(DagError::Usage(_))));

    let otherwise = graph.follows(b, a).unwrap().otherwise(c);
    assert!(matches!(otherwise, Err(DagError::Usage(_))));
    assert!(graph.children(a) == vec![b]);
}

#[test]
fn test_and_or_combine_conditionals() {
    let mut graph = Graph::new();
    let a = graph.add_node(Node::new("a")).unwrap();
    let b = graph.add_node(Node::new("b")).unwrap();

    graph
        .follows(b, a)
        .unwrap()
        .when("x", 1)
        .and(Condition::equals("y", 2))
        .unwrap()
        .or(Condition::equals("force", true))
        .unwrap();

    let condition = graph.edge(a, b).unwrap().condition().unwrap().clone();
    let kwargs = |pairs: &[(&str, serde_json::Value)]| -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    };

    assert!(condition.evaluate(&kwargs(&[("x", json!(1)), ("y", json!(2))])));
    assert!(!condition.evaluate(&kwargs(&[("x", json!(1)), ("y", json!(3))])));
    assert!(condition.evaluate(&kwargs(&[("force", json!(true))])));
    assert!(!condition.evaluate(&Params::new()));
}

#[test]
fn test_otherwise_links_alternative_with_negated_conditional() {
    let mut graph = Graph::new();
    let qc = graph.add_node(Node::new("qc")).unwrap();
    let pass = graph.add_node(Node::new("pass")).unwrap();
    let fail = graph.add_node(Node::new("fail")).unwrap();

    let handle = graph
        .follows(pass, qc)
        .unwrap()
        .when_fn("score above 30", |kw| {
            kw.get("score").and_then(|v| v.as_i64()).is_some_and(|s| s > 30)
        })
        .otherwise(fail)
        .unwrap();
    assert_eq!(handle.parent(), qc);
    assert_eq!(handle.child(), fail);

    let high: Params = [("score".to_string(), json!(42))].into_iter().collect();
    let low: Params = [("score".to_string(), json!(7))].into_iter().collect();

    let to_pass = graph.edge(qc, pass).unwrap().condition().unwrap();
    let to_fail = graph.edge(qc, fail).unwrap().condition().unwrap();
    assert!(to_pass.evaluate(&high) && !to_fail.evaluate(&high));
    assert!(!to_pass.evaluate(&low) && to_fail.evaluate(&low));
    assert_eq!(to_fail.to_string(), "!<score above 30>");
}

#[test]
fn test_slugify_examples_and_idempotence() {
    assert_eq!(slugify("This -- is a ## test ---"), "this-is-a-test");
    assert_eq!(slugify("  Trim reads (paired)  "), "trim-reads-paired");
    assert_eq!(slugify("my_task 1"), "my_task-1");
    assert_eq!(slugify("Café Prüfung"), "cafe-prufung");
    assert_eq!(slugify("Über große Ångström"), "uber-groe-angstrom");

    for name in ["This -- is a ## test ---", "A/B: c", "--x--", "Über große"] {
        let once = slugify(name);
        assert_eq!(slugify(&once), once);
    }
}

#[test]
fn test_node_slug_follows_name() {
    let node = Node::new("Assemble Contigs!");
    assert_eq!(node.slug(), "assemble-contigs");
    assert_eq!(node.name(), "Assemble Contigs!");
}

#![allow(missing_docs)]

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Once};

use serde_json::json;
use stride::graph::{EdgeKind, LabelSpec, MemGraph, Payload};
use stride::query::ast::{EdgeDirection, Var};
use stride::query::{
    evaluate, evaluate_stride, DirSpec, EdgeSpec, ElemSpec, Executor, ExecutorOptions, Feature,
    JoinStrategy, MatchSpec, NodeSpec, NodeTarget, PatternBuilder, Stride, StrideSpec,
};
use stride::{MatchError, Result};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

fn node(binder: &str, label: &str) -> ElemSpec {
    ElemSpec::Node(NodeSpec::new(Some(Var::from(binder)), LabelSpec::one_of(label)))
}

fn edge(label: &str, dir: DirSpec) -> ElemSpec {
    ElemSpec::Edge(EdgeSpec::new(None, LabelSpec::one_of(label), dir))
}

fn people_and_city() -> Result<(MemGraph, Vec<stride::Elem>)> {
    let mut graph = MemGraph::new();
    let n1 = graph.add_node(["Person"], json!({"name": "Ada"}));
    let n2 = graph.add_node(["Person"], json!({"name": "Grace"}));
    let n3 = graph.add_node(["City"], json!({"name": "London"}));
    let e1 = graph.add_directed(&n1, &n3, "LIVES_IN")?;
    let e2 = graph.add_directed(&n2, &n3, "LIVES_IN")?;
    Ok((graph, vec![n1, n2, n3, e1, e2]))
}

#[test]
fn end_to_end_people_living_in_city() -> Result<()> {
    init_tracing();
    let (graph, elems) = people_and_city()?;
    let (n1, n2, n3, e1, e2) = (&elems[0], &elems[1], &elems[2], &elems[3], &elems[4]);

    let executor = Executor::new(Arc::new(graph), ExecutorOptions::new());
    let result = PatternBuilder::new()
        .node(("p", "Person"))
        .edge("LIVES_IN")
        .node(("c", "City"))
        .execute(&executor)?;

    assert_eq!(result.len(), 2);
    assert_eq!(
        result.rows(),
        &[
            vec![Stride::new([n1.clone(), e1.clone(), n3.clone()])],
            vec![Stride::new([n2.clone(), e2.clone(), n3.clone()])],
        ]
    );
    let first = result.bindings(0)?;
    assert_eq!(&first["p"], n1);
    assert_eq!(&first["c"], n3);
    assert_eq!(first["p"].payload()["name"], json!("Ada"));
    let second = result.bindings(1)?;
    assert_eq!(&second["p"], n2);
    assert_eq!(&second["c"], n3);
    Ok(())
}

#[test]
fn left_or_right_matches_both_orientations_only() -> Result<()> {
    let mut graph = MemGraph::new();
    let a = graph.add_node(["L"], Payload::Null);
    let b = graph.add_node(["R"], Payload::Null);
    let forward = graph.add_directed(&a, &b, "E")?;
    let backward = graph.add_edge(&b, &a, EdgeKind::Directed, ["E"], Payload::Null)?;
    graph.add_undirected(&a, &b, "E")?;

    let spec = StrideSpec::new(vec![
        node("x", "L"),
        edge("E", DirSpec::LEFT_OR_RIGHT),
        node("y", "R"),
    ])?;
    let result = evaluate_stride(&graph, &spec)?;
    let edges: Vec<_> = result.iter().map(|s| s.elems()[1].clone()).collect();
    assert_eq!(edges, vec![forward, backward]);
    Ok(())
}

#[test]
fn undirected_tokens_pick_up_undirected_edges() -> Result<()> {
    let mut graph = MemGraph::new();
    let a = graph.add_node(["L"], Payload::Null);
    let b = graph.add_node(["R"], Payload::Null);
    let near = graph.add_undirected(&a, &b, "E")?;
    let directed = graph.add_directed(&a, &b, "E")?;

    let count = |dir: DirSpec| -> Result<usize> {
        let spec = StrideSpec::new(vec![node("x", "L"), edge("E", dir), node("y", "R")])?;
        Ok(evaluate_stride(&graph, &spec)?.len())
    };
    assert_eq!(count(DirSpec::UNDIRECTED)?, 1);
    assert_eq!(count(DirSpec::RIGHT)?, 1);
    assert_eq!(count(DirSpec::LEFT)?, 0);
    assert_eq!(count(DirSpec::UNDIRECTED_OR_RIGHT)?, 2);
    assert_eq!(count(DirSpec::LEFT_OR_UNDIRECTED)?, 1);
    assert_eq!(count(DirSpec::ANY)?, 2);

    let spec = StrideSpec::new(vec![node("x", "L"), edge("E", DirSpec::ANY), node("y", "R")])?;
    let edges: Vec<_> = evaluate_stride(&graph, &spec)?
        .iter()
        .map(|s| s.elems()[1].clone())
        .collect();
    assert_eq!(edges, vec![near, directed]);
    Ok(())
}

#[test]
fn self_binding_law() -> Result<()> {
    let pattern = || {
        PatternBuilder::new()
            .node(NodeTarget::var("x"))
            .edge("K")
            .node(NodeTarget::var("x"))
            .translate()
    };

    let mut looped = MemGraph::new();
    let n = looped.add_node(["N"], Payload::Null);
    let e = looped.add_directed(&n, &n, "K")?;
    let result = evaluate(&looped, &pattern()?)?;
    assert_eq!(result.rows(), &[vec![Stride::new([n.clone(), e, n])]]);

    let mut open = MemGraph::new();
    let n1 = open.add_node(["N"], Payload::Null);
    let n2 = open.add_node(["N"], Payload::Null);
    open.add_directed(&n1, &n2, "K")?;
    assert!(evaluate(&open, &pattern()?)?.is_empty());
    Ok(())
}

fn chain_spec() -> Result<StrideSpec> {
    StrideSpec::new(vec![
        node("a", "L1"),
        edge("E1", DirSpec::RIGHT),
        node("b", "L2"),
        edge("E2", DirSpec::RIGHT),
        node("c", "L3"),
    ])
}

#[test]
fn join_correctness_across_shared_middle() -> Result<()> {
    init_tracing();
    for strategy in [JoinStrategy::Hash, JoinStrategy::NestedLoop] {
        let mut graph = MemGraph::new();
        let a1 = graph.add_node(["L1"], Payload::Null);
        let b1 = graph.add_node(["L2"], Payload::Null);
        let c1 = graph.add_node(["L3"], Payload::Null);
        let e1 = graph.add_directed(&a1, &b1, "E1")?;
        let e2 = graph.add_directed(&b1, &c1, "E2")?;
        let executor = Executor::new(
            Arc::new(graph),
            ExecutorOptions::new().join_strategy(strategy),
        );
        let result = executor.evaluate_stride(&chain_spec()?)?;
        assert_eq!(result.strides(), &[Stride::new([a1, e1, b1, e2, c1])]);
    }

    let mut split = MemGraph::new();
    let a1 = split.add_node(["L1"], Payload::Null);
    let b1 = split.add_node(["L2"], Payload::Null);
    let b2 = split.add_node(["L2"], Payload::Null);
    let c1 = split.add_node(["L3"], Payload::Null);
    split.add_directed(&a1, &b1, "E1")?;
    split.add_directed(&b2, &c1, "E2")?;
    assert!(evaluate_stride(&split, &chain_spec()?)?.is_empty());
    Ok(())
}

#[test]
fn repeated_binder_across_leaves_closes_cycle() -> Result<()> {
    let mut graph = MemGraph::new();
    let a = graph.add_node(["N"], Payload::Null);
    let b = graph.add_node(["N"], Payload::Null);
    let c = graph.add_node(["N"], Payload::Null);
    graph.add_directed(&a, &b, "K")?;
    graph.add_directed(&b, &a, "K")?;
    graph.add_directed(&b, &c, "K")?;

    let spec = PatternBuilder::new()
        .node(NodeTarget::var("x"))
        .edge("K")
        .node(NodeTarget::var("y"))
        .edge("K")
        .node(NodeTarget::var("x"))
        .translate()?;
    let result = evaluate(&graph, &spec)?;
    let starts: Vec<_> = result
        .rows()
        .iter()
        .map(|row| row[0].elems()[0].clone())
        .collect();
    assert_eq!(starts, vec![a, b]);
    for row in result.rows() {
        assert_eq!(row[0].elems()[0], row[0].elems()[4]);
    }
    Ok(())
}

#[test]
fn node_only_pattern_scans_nodes() -> Result<()> {
    let (graph, elems) = people_and_city()?;
    let spec = PatternBuilder::new().node(("p", "Person")).translate()?;
    let result = evaluate(&graph, &spec)?;
    assert_eq!(
        result.rows(),
        &[
            vec![Stride::new([elems[0].clone()])],
            vec![Stride::new([elems[1].clone()])],
        ]
    );
    Ok(())
}

#[test]
fn bare_edge_pattern_gets_filler_nodes() -> Result<()> {
    let (graph, _) = people_and_city()?;
    let spec = PatternBuilder::new()
        .direction(EdgeDirection::Left)
        .edge(("r", "LIVES_IN"))
        .translate()?;
    assert_eq!(spec.strides()[0].len(), 3);
    let result = evaluate(&graph, &spec)?;
    assert_eq!(result.len(), 2);
    for idx in 0..result.len() {
        let bindings = result.bindings(idx)?;
        assert_eq!(bindings.keys().collect::<Vec<_>>(), vec!["r"]);
    }
    Ok(())
}

#[test]
fn multiple_paths_are_rejected_at_evaluation() -> Result<()> {
    init_tracing();
    let (graph, _) = people_and_city()?;
    let spec = PatternBuilder::new()
        .node(("p", "Person"))
        .path()
        .node(("p", "Person"))
        .edge("LIVES_IN")
        .node(("c", "City"))
        .translate()?;
    assert_eq!(spec.len(), 2);
    let err = evaluate(&graph, &spec).expect_err("cross-stride join");
    assert!(matches!(
        err,
        MatchError::Unsupported(Feature::CrossStrideJoin { strides: 2 })
    ));
    assert_eq!(err.code(), "UnsupportedFeature");
    Ok(())
}

#[test]
fn identity_not_payload_drives_joins() -> Result<()> {
    let mut graph = MemGraph::new();
    let a = graph.add_node(["A"], json!({"name": "same"}));
    let m1 = graph.add_node(["M"], json!({"name": "twin"}));
    let m2 = graph.add_node(["M"], json!({"name": "twin"}));
    let z = graph.add_node(["Z"], json!({"name": "same"}));
    graph.add_directed(&a, &m1, "E")?;
    graph.add_directed(&m2, &z, "E")?;
    let spec = MatchSpec::new(vec![StrideSpec::new(vec![
        node("a", "A"),
        edge("E", DirSpec::RIGHT),
        node("m", "M"),
        edge("E", DirSpec::RIGHT),
        node("z", "Z"),
    ])?])?;
    assert!(evaluate(&graph, &spec)?.is_empty());
    Ok(())
}

#[test]
fn cancellation_is_observed() -> Result<()> {
    let (graph, _) = people_and_city()?;
    let token = Arc::new(AtomicBool::new(true));
    let executor = Executor::new(Arc::new(graph), ExecutorOptions::new().cancel_token(token));
    let err = PatternBuilder::new()
        .node(("p", "Person"))
        .edge("LIVES_IN")
        .node(("c", "City"))
        .execute(&executor)
        .expect_err("cancelled");
    assert!(matches!(err, MatchError::Cancelled));
    Ok(())
}

//! Adjacency and cross-stride joins.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::graph::Elem;
use crate::query::errors::Feature;
use crate::query::executor::{EvalContext, MatchResult, Stride, StrideResult};
use crate::query::planner::JoinStrategy;
use crate::query::profile::{
    profile_timer, record_join_pairs, record_profile_timer, QueryProfileKind,
};
use crate::query::spec::StrideSpec;
use crate::types::{MatchError, Result};

/// Position pairs `(left, right)` whose bound elements must be identical.
///
/// Each binder of `left` is linked from its first position to its first
/// position in `right`. The shared boundary node `(left.len() - 1, 0)` is
/// always included. Both sides are assumed internally consistent.
pub fn join_points(left: &StrideSpec, right: &StrideSpec) -> Vec<(usize, usize)> {
    let mut points = Vec::new();
    for binder in left.binders() {
        if let (Some(l), Some(r)) = (left.first_index_of(binder), right.first_index_of(binder)) {
            points.push((l, r));
        }
    }
    let boundary = (left.len() - 1, 0);
    if !points.contains(&boundary) {
        points.push(boundary);
    }
    points
}

/// Joins two adjacent stride results on their shared node and shared binders.
pub fn join_adjacent_strides(
    left: &StrideResult,
    right: &StrideResult,
    strategy: JoinStrategy,
) -> Result<StrideResult> {
    join_adjacent_with(left, right, strategy, &EvalContext::unbounded())
}

pub(crate) fn join_adjacent_with(
    left: &StrideResult,
    right: &StrideResult,
    strategy: JoinStrategy,
    ctx: &EvalContext<'_>,
) -> Result<StrideResult> {
    if left.spec().last() != right.spec().first() {
        return Err(MatchError::internal(format!(
            "join inputs {} and {} do not share a boundary node",
            left.spec(),
            right.spec()
        )));
    }
    let points = join_points(left.spec(), right.spec());
    let mut elems = left.spec().elems().to_vec();
    elems.extend(right.spec().elems().iter().skip(1).cloned());
    let mut out = StrideResult::new(StrideSpec::from_parts_unchecked(elems));

    let timer = profile_timer();
    let pairs = match strategy {
        JoinStrategy::NestedLoop => nested_loop(left, right, &points, &mut out, ctx)?,
        JoinStrategy::Hash => hash_join(left, right, &points, &mut out, ctx)?,
    };
    record_profile_timer(QueryProfileKind::Join, timer);
    record_join_pairs(pairs);
    debug!(
        strategy = %strategy,
        left = left.len(),
        right = right.len(),
        pairs,
        rows = out.len(),
        "query.join.adjacent"
    );
    Ok(out)
}

fn accepts(points: &[(usize, usize)], left: &Stride, right: &Stride) -> bool {
    points
        .iter()
        .all(|&(i, j)| left.elems()[i] == right.elems()[j])
}

fn emit(
    out: &mut StrideResult,
    left: &Stride,
    right: &Stride,
    ctx: &EvalContext<'_>,
) -> Result<()> {
    if out.insert(left.concat(right))? {
        ctx.check_rows(out.len())?;
    }
    Ok(())
}

fn nested_loop(
    left: &StrideResult,
    right: &StrideResult,
    points: &[(usize, usize)],
    out: &mut StrideResult,
    ctx: &EvalContext<'_>,
) -> Result<u64> {
    let mut pairs = 0u64;
    for l in left {
        ctx.check_cancel()?;
        for r in right {
            pairs += 1;
            if accepts(points, l, r) {
                emit(out, l, r, ctx)?;
            }
        }
    }
    Ok(pairs)
}

fn hash_join(
    left: &StrideResult,
    right: &StrideResult,
    points: &[(usize, usize)],
    out: &mut StrideResult,
    ctx: &EvalContext<'_>,
) -> Result<u64> {
    let mut build: FxHashMap<&Elem, Vec<&Stride>> = FxHashMap::default();
    for r in right {
        let Some(first) = r.first() else {
            return Err(MatchError::internal("hash join build side holds an empty stride"));
        };
        build.entry(first).or_default().push(r);
    }
    let mut pairs = 0u64;
    for l in left {
        ctx.check_cancel()?;
        let Some(last) = l.last() else {
            return Err(MatchError::internal("hash join probe side holds an empty stride"));
        };
        let Some(candidates) = build.get(last) else {
            continue;
        };
        for r in candidates {
            pairs += 1;
            if accepts(points, l, r) {
                emit(out, l, r, ctx)?;
            }
        }
    }
    Ok(pairs)
}

/// Combines per-path results into rows.
///
/// A single path yields one row per stride. Joining two or more independent
/// paths on shared binders is rejected.
pub fn join_strides_on_binders(results: Vec<StrideResult>) -> Result<MatchResult> {
    if results.len() > 1 {
        let strides = results.len();
        warn!(strides, "query.join.cross_stride_rejected");
        return Err(MatchError::Unsupported(Feature::CrossStrideJoin { strides }));
    }
    let Some(only) = results.into_iter().next() else {
        return Err(MatchError::internal("no stride results to combine"));
    };
    let rows = only.iter().map(|stride| vec![stride.clone()]).collect();
    Ok(MatchResult::new(vec![only.spec().clone()], rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LabelSpec, MemGraph, Payload};
    use crate::query::ast::Var;
    use crate::query::executor::evaluate_stride;
    use crate::query::spec::{DirSpec, EdgeSpec, ElemSpec, NodeSpec};

    fn node(binder: Option<&str>) -> ElemSpec {
        ElemSpec::Node(NodeSpec::new(binder.map(Var::from), LabelSpec::Whatever))
    }

    fn edge(binder: Option<&str>, label: &str) -> ElemSpec {
        ElemSpec::Edge(EdgeSpec::new(
            binder.map(Var::from),
            LabelSpec::one_of(label),
            DirSpec::RIGHT,
        ))
    }

    fn spec(elems: Vec<ElemSpec>) -> StrideSpec {
        StrideSpec::new(elems).expect("alternating spec")
    }

    #[test]
    fn boundary_point_is_always_present() {
        let left = spec(vec![node(None), edge(None, "A"), node(None)]);
        let right = spec(vec![node(None), edge(None, "B"), node(None)]);
        assert_eq!(join_points(&left, &right), vec![(2, 0)]);
    }

    #[test]
    fn shared_binders_add_points_once() {
        let left = spec(vec![node(Some("x")), edge(Some("e"), "A"), node(Some("y"))]);
        let right = spec(vec![
            node(Some("y")),
            edge(None, "B"),
            node(Some("x")),
            edge(Some("e"), "A"),
            node(None),
        ]);
        assert_eq!(join_points(&left, &right), vec![(0, 2), (1, 3), (2, 0)]);
    }

    #[test]
    fn mismatched_boundary_is_internal() -> Result<()> {
        let graph = MemGraph::new();
        let left = spec(vec![node(Some("a")), edge(None, "A"), node(Some("b"))]);
        let right = spec(vec![node(Some("c")), edge(None, "B"), node(None)]);
        let left = evaluate_stride(&graph, &left)?;
        let right = evaluate_stride(&graph, &right)?;
        let err = join_adjacent_strides(&left, &right, JoinStrategy::Hash).expect_err("boundary");
        assert!(err.is_internal());
        Ok(())
    }

    #[test]
    fn strategies_agree_on_cycle() -> Result<()> {
        let mut graph = MemGraph::new();
        let a = graph.add_node(["N"], Payload::Null);
        let b = graph.add_node(["N"], Payload::Null);
        let c = graph.add_node(["N"], Payload::Null);
        graph.add_directed(&a, &b, "A")?;
        graph.add_directed(&b, &a, "B")?;
        graph.add_directed(&b, &c, "B")?;
        let left = spec(vec![node(Some("x")), edge(None, "A"), node(Some("y"))]);
        let right = spec(vec![node(Some("y")), edge(None, "B"), node(Some("x"))]);
        let left = evaluate_stride(&graph, &left)?;
        let right = evaluate_stride(&graph, &right)?;
        let hashed = join_adjacent_strides(&left, &right, JoinStrategy::Hash)?;
        let nested = join_adjacent_strides(&left, &right, JoinStrategy::NestedLoop)?;
        assert_eq!(hashed.strides(), nested.strides());
        assert_eq!(hashed.len(), 1);
        assert_eq!(hashed.strides()[0].elems()[4], a);
        assert_eq!(hashed.spec().len(), 5);
        Ok(())
    }

    #[test]
    fn hand_built_inputs_must_fit_their_specs() -> Result<()> {
        let mut graph = MemGraph::new();
        let a = graph.add_node(["N"], Payload::Null);
        let b = graph.add_node(["N"], Payload::Null);
        let c = graph.add_node(["N"], Payload::Null);
        let ab = graph.add_directed(&a, &b, "A")?;
        let bc = graph.add_directed(&b, &c, "B")?;

        let mut left = StrideResult::new(spec(vec![
            node(Some("x")),
            edge(None, "A"),
            node(Some("y")),
        ]));
        let mut right = StrideResult::new(spec(vec![
            node(Some("y")),
            edge(None, "B"),
            node(Some("z")),
        ]));
        assert!(left.insert(Stride::new([a.clone()])).is_err());
        assert!(right.insert(Stride::new([b.clone()])).is_err());
        assert!(left.insert(Stride::new([a.clone(), ab.clone(), b.clone()]))?);
        assert!(right.insert(Stride::new([b.clone(), bc.clone(), c.clone()]))?);

        for strategy in [JoinStrategy::NestedLoop, JoinStrategy::Hash] {
            let joined = join_adjacent_strides(&left, &right, strategy)?;
            assert_eq!(
                joined.strides(),
                &[Stride::new([
                    a.clone(),
                    ab.clone(),
                    b.clone(),
                    bc.clone(),
                    c.clone()
                ])]
            );
        }
        Ok(())
    }

    #[test]
    fn cross_stride_join_is_unsupported() -> Result<()> {
        let graph = MemGraph::new();
        let single = spec(vec![node(Some("x"))]);
        let results = vec![
            evaluate_stride(&graph, &single)?,
            evaluate_stride(&graph, &single)?,
        ];
        let err = join_strides_on_binders(results).expect_err("two strides");
        assert!(matches!(
            err,
            MatchError::Unsupported(Feature::CrossStrideJoin { strides: 2 })
        ));
        assert!(join_strides_on_binders(Vec::new())
            .expect_err("no strides")
            .is_internal());
        Ok(())
    }
}

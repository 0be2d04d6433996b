//! Pattern AST to [`MatchSpec`] translation.
//!
//! Unsupported constructs are rejected here, before any planning, so the
//! evaluator only ever sees shapes it can answer exactly.

use tracing::debug;

use crate::graph::LabelSpec;
use crate::query::ast::{
    EdgeDirection, EdgePattern, GraphPattern, NodePattern, PathPart, PathPattern,
};
use crate::query::errors::Feature;
use crate::query::spec::{DirSpec, EdgeSpec, ElemSpec, MatchSpec, NodeSpec, StrideSpec};
use crate::types::{MatchError, Result};

/// Translates a graph pattern into one stride spec per path pattern.
pub fn translate(pattern: &GraphPattern) -> Result<MatchSpec> {
    if pattern.selector.is_some() {
        return Err(MatchError::Unsupported(Feature::Selector));
    }
    let mut strides = Vec::with_capacity(pattern.paths.len());
    for path in &pattern.paths {
        let mut elems = Vec::new();
        collect_path(path, &mut elems)?;
        let stride = StrideSpec::new(patch_elem_list(elems)?)?;
        debug!(len = stride.len(), stride = %stride, "query.translate.stride");
        strides.push(stride);
    }
    MatchSpec::new(strides)
}

/// Maps a label set onto a single-label constraint.
pub fn translate_labels(labels: &[String]) -> Result<LabelSpec> {
    match labels {
        [] => Ok(LabelSpec::Whatever),
        [label] => Ok(LabelSpec::one_of(label.clone())),
        _ => Err(MatchError::Unsupported(Feature::LabelDisjunction {
            count: labels.len(),
        })),
    }
}

/// Maps a syntactic direction token onto the orientations it accepts.
pub fn translate_direction(direction: EdgeDirection) -> DirSpec {
    match direction {
        EdgeDirection::Left => DirSpec::LEFT,
        EdgeDirection::Undirected => DirSpec::UNDIRECTED,
        EdgeDirection::Right => DirSpec::RIGHT,
        EdgeDirection::LeftOrUndirected => DirSpec::LEFT_OR_UNDIRECTED,
        EdgeDirection::UndirectedOrRight => DirSpec::UNDIRECTED_OR_RIGHT,
        EdgeDirection::LeftOrRight => DirSpec::LEFT_OR_RIGHT,
        EdgeDirection::Any => DirSpec::ANY,
    }
}

/// Restores node/edge alternation by inserting filler nodes.
///
/// A filler goes before an edge that appears where a node was expected, and
/// after a trailing edge. Two nodes in a row have no unambiguous repair and
/// are rejected.
pub fn patch_elem_list(elems: Vec<ElemSpec>) -> Result<Vec<ElemSpec>> {
    let mut patched = Vec::with_capacity(elems.len() * 2 + 1);
    let mut expect_node = true;
    for elem in elems {
        match (expect_node, &elem) {
            (true, ElemSpec::Node(_)) => expect_node = false,
            (true, ElemSpec::Edge(_)) => patched.push(ElemSpec::Node(NodeSpec::filler())),
            (false, ElemSpec::Edge(_)) => expect_node = true,
            (false, ElemSpec::Node(_)) => {
                return Err(MatchError::Malformed(
                    "adjacent node patterns without a connecting edge",
                ))
            }
        }
        patched.push(elem);
    }
    if expect_node {
        patched.push(ElemSpec::Node(NodeSpec::filler()));
    }
    Ok(patched)
}

/// Flattens a path (and any nested subpatterns) into element specs.
fn collect_path(path: &PathPattern, out: &mut Vec<ElemSpec>) -> Result<()> {
    if path.binder.is_some() {
        return Err(MatchError::Unsupported(Feature::PathBinder));
    }
    if path.restrictor.is_some() {
        return Err(MatchError::Unsupported(Feature::PathRestrictor));
    }
    if path.prefilter.is_some() {
        return Err(MatchError::Unsupported(Feature::PathPrefilter));
    }
    if path.quantifier.is_some() {
        return Err(MatchError::Unsupported(Feature::PathQuantifier));
    }
    for part in &path.parts {
        match part {
            PathPart::Node(node) => out.push(ElemSpec::Node(translate_node(node)?)),
            PathPart::Edge(edge) => out.push(ElemSpec::Edge(translate_edge(edge)?)),
            PathPart::Pattern(nested) => collect_path(nested, out)?,
        }
    }
    Ok(())
}

fn translate_node(node: &NodePattern) -> Result<NodeSpec> {
    if node.prefilter.is_some() {
        return Err(MatchError::Unsupported(Feature::ElementPrefilter));
    }
    Ok(NodeSpec::new(
        node.binder.clone(),
        translate_labels(&node.labels)?,
    ))
}

fn translate_edge(edge: &EdgePattern) -> Result<EdgeSpec> {
    if edge.prefilter.is_some() {
        return Err(MatchError::Unsupported(Feature::ElementPrefilter));
    }
    if edge.quantifier.is_some() {
        return Err(MatchError::Unsupported(Feature::ElementQuantifier));
    }
    Ok(EdgeSpec::new(
        edge.binder.clone(),
        translate_labels(&edge.labels)?,
        translate_direction(edge.direction),
    ))
}

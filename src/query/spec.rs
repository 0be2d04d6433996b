//! Declarative stride specs produced by the translator.
//!
//! A [`StrideSpec`] is the unbound shape one path pattern must satisfy: an
//! odd-length sequence of node and edge specs that starts and ends with a
//! node and strictly alternates in between. The planner and evaluator rely
//! on that shape without re-checking it, so the only public constructors are
//! the validating [`StrideSpec::new`] and the translator.

use std::fmt;

use crate::graph::{LabelSpec, LabelTriple};
use crate::query::ast::Var;
use crate::types::{MatchError, Result};

/// Physical orientations that satisfy an edge pattern's direction token.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DirSpec {
    /// Directed edges pointing from the right node to the left node.
    pub want_left: bool,
    /// Undirected edges.
    pub want_undir: bool,
    /// Directed edges pointing from the left node to the right node.
    pub want_right: bool,
}

impl DirSpec {
    /// `<-[]-`
    pub const LEFT: DirSpec = DirSpec::new(true, false, false);
    /// `~[]~`
    pub const UNDIRECTED: DirSpec = DirSpec::new(false, true, false);
    /// `-[]->`
    pub const RIGHT: DirSpec = DirSpec::new(false, false, true);
    /// `<~[]~`
    pub const LEFT_OR_UNDIRECTED: DirSpec = DirSpec::new(true, true, false);
    /// `~[]~>`
    pub const UNDIRECTED_OR_RIGHT: DirSpec = DirSpec::new(false, true, true);
    /// `<-[]->`
    pub const LEFT_OR_RIGHT: DirSpec = DirSpec::new(true, false, true);
    /// `-[]-`
    pub const ANY: DirSpec = DirSpec::new(true, true, true);

    const fn new(want_left: bool, want_undir: bool, want_right: bool) -> Self {
        Self {
            want_left,
            want_undir,
            want_right,
        }
    }

    /// Opening and closing fragments used when rendering an edge spec.
    fn delimiters(&self) -> (&'static str, &'static str) {
        match (self.want_left, self.want_undir, self.want_right) {
            (true, false, false) => ("<-[", "]-"),
            (false, true, false) => ("~[", "]~"),
            (false, false, true) => ("-[", "]->"),
            (true, true, false) => ("<~[", "]~"),
            (false, true, true) => ("~[", "]~>"),
            (true, false, true) => ("<-[", "]->"),
            _ => ("-[", "]-"),
        }
    }

    /// Graph scans whose union yields exactly the triples this direction accepts.
    ///
    /// The undirected scan is independent of the directed ones; at most one
    /// directed scan is selected.
    pub fn scans(&self) -> Vec<ScanKind> {
        let mut scans = Vec::with_capacity(2);
        if self.want_undir {
            scans.push(ScanKind::Undirected);
        }
        match (self.want_left, self.want_right) {
            (true, true) => scans.push(ScanKind::DirectedBlunt),
            (false, true) => scans.push(ScanKind::DirectedStraight),
            (true, false) => scans.push(ScanKind::DirectedFlipped),
            (false, false) => {}
        }
        scans
    }
}

/// Graph scan selected for a leaf step.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ScanKind {
    /// [`crate::graph::Graph::scan_undirected`]
    Undirected,
    /// [`crate::graph::Graph::scan_directed_blunt`]
    DirectedBlunt,
    /// [`crate::graph::Graph::scan_directed_straight`]
    DirectedStraight,
    /// [`crate::graph::Graph::scan_directed_flipped`]
    DirectedFlipped,
}

impl ScanKind {
    /// Short name used in explain output and logs.
    pub fn name(&self) -> &'static str {
        match self {
            ScanKind::Undirected => "undirected",
            ScanKind::DirectedBlunt => "blunt",
            ScanKind::DirectedStraight => "straight",
            ScanKind::DirectedFlipped => "flipped",
        }
    }
}

/// Node position in a stride spec.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct NodeSpec {
    /// Optional binder.
    pub binder: Option<Var>,
    /// Label constraint.
    pub label: LabelSpec,
}

impl NodeSpec {
    /// Creates a node spec.
    pub fn new(binder: Option<Var>, label: LabelSpec) -> Self {
        Self { binder, label }
    }

    /// Unbound, unconstrained node inserted to restore alternation.
    pub fn filler() -> Self {
        Self::default()
    }
}

/// Edge position in a stride spec.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct EdgeSpec {
    /// Optional binder.
    pub binder: Option<Var>,
    /// Label constraint.
    pub label: LabelSpec,
    /// Accepted orientations.
    pub dir: DirSpec,
}

impl EdgeSpec {
    /// Creates an edge spec.
    pub fn new(binder: Option<Var>, label: LabelSpec, dir: DirSpec) -> Self {
        Self { binder, label, dir }
    }
}

/// One position of a stride spec.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ElemSpec {
    /// Node position.
    Node(NodeSpec),
    /// Edge position.
    Edge(EdgeSpec),
}

impl ElemSpec {
    /// Binder at this position, if any.
    pub fn binder(&self) -> Option<&Var> {
        match self {
            ElemSpec::Node(node) => node.binder.as_ref(),
            ElemSpec::Edge(edge) => edge.binder.as_ref(),
        }
    }

    /// Label constraint at this position.
    pub fn label(&self) -> &LabelSpec {
        match self {
            ElemSpec::Node(node) => &node.label,
            ElemSpec::Edge(edge) => &edge.label,
        }
    }

    /// Returns true for node positions.
    pub fn is_node(&self) -> bool {
        matches!(self, ElemSpec::Node(_))
    }

    /// Node spec, if this is a node position.
    pub fn as_node(&self) -> Option<&NodeSpec> {
        match self {
            ElemSpec::Node(node) => Some(node),
            ElemSpec::Edge(_) => None,
        }
    }

    /// Edge spec, if this is an edge position.
    pub fn as_edge(&self) -> Option<&EdgeSpec> {
        match self {
            ElemSpec::Node(_) => None,
            ElemSpec::Edge(edge) => Some(edge),
        }
    }
}

impl From<NodeSpec> for ElemSpec {
    fn from(value: NodeSpec) -> Self {
        ElemSpec::Node(value)
    }
}

impl From<EdgeSpec> for ElemSpec {
    fn from(value: EdgeSpec) -> Self {
        ElemSpec::Edge(value)
    }
}

impl fmt::Display for ElemSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binder = self.binder().map(Var::as_str).unwrap_or("");
        match self {
            ElemSpec::Node(node) => write!(f, "({binder}{})", node.label),
            ElemSpec::Edge(edge) => {
                let (open, close) = edge.dir.delimiters();
                write!(f, "{open}{binder}{}{close}", edge.label)
            }
        }
    }
}

/// Elementary scan unit: a direction plus left/edge/right label constraints.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct StepSpec {
    /// Accepted orientations.
    pub dir: DirSpec,
    /// Label constraints.
    pub labels: LabelTriple,
}

impl StepSpec {
    /// Builds a step from a `(node, edge, node)` leaf.
    pub fn from_leaf(left: &NodeSpec, edge: &EdgeSpec, right: &NodeSpec) -> Self {
        Self {
            dir: edge.dir,
            labels: LabelTriple::new(left.label.clone(), edge.label.clone(), right.label.clone()),
        }
    }
}

/// Alternating node/edge sequence one path pattern must satisfy.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct StrideSpec {
    elems: Vec<ElemSpec>,
}

impl StrideSpec {
    /// Validates alternation and wraps the sequence.
    pub fn new(elems: Vec<ElemSpec>) -> Result<Self> {
        check_alternation(&elems)?;
        Ok(Self { elems })
    }

    /// Wraps a sequence the caller has already proven well-formed, e.g. the
    /// concatenation of two valid specs sharing their boundary node.
    pub(crate) fn from_parts_unchecked(elems: Vec<ElemSpec>) -> Self {
        debug_assert!(check_alternation(&elems).is_ok());
        Self { elems }
    }

    /// Positions in order.
    pub fn elems(&self) -> &[ElemSpec] {
        &self.elems
    }

    /// Number of positions (always odd).
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// Always false; a stride spec has at least one node.
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// First node spec.
    pub fn first(&self) -> &ElemSpec {
        &self.elems[0]
    }

    /// Last node spec.
    pub fn last(&self) -> &ElemSpec {
        &self.elems[self.elems.len() - 1]
    }

    /// Distinct binders in order of first appearance.
    pub fn binders(&self) -> Vec<&Var> {
        let mut seen: Vec<&Var> = Vec::new();
        for binder in self.elems.iter().filter_map(ElemSpec::binder) {
            if !seen.contains(&binder) {
                seen.push(binder);
            }
        }
        seen
    }

    /// Index of the first position bound to `var`.
    pub fn first_index_of(&self, var: &Var) -> Option<usize> {
        self.elems.iter().position(|elem| elem.binder() == Some(var))
    }

    pub(crate) fn into_elems(self) -> Vec<ElemSpec> {
        self.elems
    }
}

impl fmt::Display for StrideSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for elem in &self.elems {
            write!(f, "{elem}")?;
        }
        Ok(())
    }
}

fn check_alternation(elems: &[ElemSpec]) -> Result<()> {
    if elems.is_empty() {
        return Err(MatchError::Malformed("stride spec must contain a node"));
    }
    if elems.len() % 2 == 0 {
        return Err(MatchError::Malformed(
            "stride spec must start and end with a node",
        ));
    }
    for (idx, elem) in elems.iter().enumerate() {
        if elem.is_node() != (idx % 2 == 0) {
            return Err(MatchError::Malformed(
                "stride spec must alternate node and edge positions",
            ));
        }
    }
    Ok(())
}

/// Ordered, non-empty list of stride specs, one per path pattern.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MatchSpec {
    strides: Vec<StrideSpec>,
}

impl MatchSpec {
    /// Wraps the stride specs, rejecting an empty list.
    pub fn new(strides: Vec<StrideSpec>) -> Result<Self> {
        if strides.is_empty() {
            return Err(MatchError::Malformed(
                "graph pattern requires at least one path pattern",
            ));
        }
        Ok(Self { strides })
    }

    /// Stride specs in source order.
    pub fn strides(&self) -> &[StrideSpec] {
        &self.strides
    }

    /// Number of path patterns.
    pub fn len(&self) -> usize {
        self.strides.len()
    }

    /// Always false for a constructed spec.
    pub fn is_empty(&self) -> bool {
        self.strides.is_empty()
    }
}

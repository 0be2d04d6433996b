#![forbid(unsafe_code)]

//! Graph capability consumed by the matcher.
//!
//! The evaluator never navigates adjacency directly. Every lookup it needs is
//! one of the label-filtered scans on [`Graph`], which lets the backing
//! representation be anything from the in-memory [`MemGraph`] to an external
//! store, as long as it honours the identity contract: scanning the same
//! underlying element twice must yield elements that compare equal.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::types::{ElemId, Result};

/// In-memory graph implementation and JSON fixtures.
pub mod memory;

pub use memory::{EdgeFixture, GraphFixture, MemGraph, NodeFixture};

/// Opaque payload carried by an element and handed to downstream evaluation.
pub type Payload = serde_json::Value;

/// Physical orientation of an edge.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Edge with a source and a destination.
    Directed,
    /// Edge without orientation.
    Undirected,
}

/// Discriminates nodes from edges.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ElemKind {
    /// A graph node.
    Node,
    /// A graph edge of the given orientation.
    Edge(EdgeKind),
}

struct ElemData {
    id: ElemId,
    kind: ElemKind,
    labels: BTreeSet<String>,
    payload: Payload,
}

/// A matched graph entity.
///
/// Cloning is cheap and preserves identity. Equality and hashing use the
/// element kind and [`ElemId`] only, so two elements with identical labels and
/// payload are still distinct unless the graph assigned them the same id.
/// Identity is only meaningful among elements produced by one graph.
#[derive(Clone)]
pub struct Elem(Arc<ElemData>);

impl Elem {
    /// Creates a node element.
    pub fn node<I, S>(id: ElemId, labels: I, payload: Payload) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_kind(id, ElemKind::Node, labels, payload)
    }

    /// Creates an edge element of the given orientation.
    pub fn edge<I, S>(id: ElemId, kind: EdgeKind, labels: I, payload: Payload) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_kind(id, ElemKind::Edge(kind), labels, payload)
    }

    fn with_kind<I, S>(id: ElemId, kind: ElemKind, labels: I, payload: Payload) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Arc::new(ElemData {
            id,
            kind,
            labels: labels.into_iter().map(Into::into).collect(),
            payload,
        }))
    }

    /// Identifier assigned by the owning graph.
    pub fn id(&self) -> ElemId {
        self.0.id
    }

    /// Node or edge discriminator.
    pub fn kind(&self) -> ElemKind {
        self.0.kind
    }

    /// True when both handles point at the same allocation, not merely the
    /// same id. Ids are only unique within one graph.
    pub(crate) fn same_entity(&self, other: &Elem) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns true for nodes.
    pub fn is_node(&self) -> bool {
        matches!(self.0.kind, ElemKind::Node)
    }

    /// Returns true for edges of either orientation.
    pub fn is_edge(&self) -> bool {
        matches!(self.0.kind, ElemKind::Edge(_))
    }

    /// Labels attached to the element.
    pub fn labels(&self) -> &BTreeSet<String> {
        &self.0.labels
    }

    /// Whether the element carries `label`.
    pub fn has_label(&self, label: &str) -> bool {
        self.0.labels.contains(label)
    }

    /// Opaque payload for downstream consumers.
    pub fn payload(&self) -> &Payload {
        &self.0.payload
    }

    fn kind_tag(&self) -> &'static str {
        match self.0.kind {
            ElemKind::Node => "node",
            ElemKind::Edge(EdgeKind::Directed) => "directed_edge",
            ElemKind::Edge(EdgeKind::Undirected) => "undirected_edge",
        }
    }
}

impl PartialEq for Elem {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || (self.0.id == other.0.id && self.0.kind == other.0.kind)
    }
}

impl Eq for Elem {}

impl Hash for Elem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
        self.is_node().hash(state);
    }
}

impl fmt::Debug for Elem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_node() { "Node" } else { "Edge" };
        write!(f, "{kind}{}", self.0.id)?;
        if !self.0.labels.is_empty() {
            let labels: Vec<&str> = self.0.labels.iter().map(String::as_str).collect();
            write!(f, "({})", labels.join("|"))?;
        }
        Ok(())
    }
}

impl Serialize for Elem {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Elem", 4)?;
        state.serialize_field("id", &self.0.id)?;
        state.serialize_field("kind", self.kind_tag())?;
        state.serialize_field("labels", &self.0.labels)?;
        state.serialize_field("payload", &self.0.payload)?;
        state.end()
    }
}

/// Label constraint on a single pattern element.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSpec {
    /// Matches any label set, including the empty one.
    #[default]
    Whatever,
    /// Matches iff the label is present on the element.
    OneOf(String),
}

impl LabelSpec {
    /// Creates a single-label constraint.
    pub fn one_of(label: impl Into<String>) -> Self {
        LabelSpec::OneOf(label.into())
    }

    /// Tests the constraint against an element.
    pub fn matches(&self, elem: &Elem) -> bool {
        match self {
            LabelSpec::Whatever => true,
            LabelSpec::OneOf(label) => elem.has_label(label),
        }
    }
}

impl fmt::Display for LabelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelSpec::Whatever => Ok(()),
            LabelSpec::OneOf(label) => write!(f, ":{label}"),
        }
    }
}

/// Label constraints for a `(left, edge, right)` scan.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct LabelTriple {
    /// Constraint on the left node.
    pub left: LabelSpec,
    /// Constraint on the edge.
    pub edge: LabelSpec,
    /// Constraint on the right node.
    pub right: LabelSpec,
}

impl LabelTriple {
    /// Creates a triple from its three constraints.
    pub fn new(left: LabelSpec, edge: LabelSpec, right: LabelSpec) -> Self {
        Self { left, edge, right }
    }

    /// Tests the left/edge/right constraints against concrete elements.
    pub fn matches(&self, left: &Elem, edge: &Elem, right: &Elem) -> bool {
        self.left.matches(left) && self.edge.matches(edge) && self.right.matches(right)
    }
}

/// A `(left node, edge, right node)` scan result.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Triple {
    /// Node in the pattern's left position.
    pub left: Elem,
    /// The connecting edge.
    pub edge: Elem,
    /// Node in the pattern's right position.
    pub right: Elem,
}

impl Triple {
    /// Creates a triple.
    pub fn new(left: Elem, edge: Elem, right: Elem) -> Self {
        Self { left, edge, right }
    }
}

/// Data-source contract consumed by the evaluator.
///
/// Every scan returns a finite, fully materialised collection. Triples are
/// always reported in pattern orientation: `left` is the node bound to the
/// pattern's left position regardless of which way the edge physically
/// points.
pub trait Graph: Send + Sync {
    /// Nodes satisfying `label`.
    fn scan_nodes(&self, label: &LabelSpec) -> Result<Vec<Elem>>;

    /// Undirected edges, reported once per orientation that satisfies the
    /// left/right constraints.
    fn scan_undirected(&self, labels: &LabelTriple) -> Result<Vec<Triple>>;

    /// Directed edges pointing from `left` to `right`.
    fn scan_directed_straight(&self, labels: &LabelTriple) -> Result<Vec<Triple>>;

    /// Directed edges pointing from `right` to `left`.
    fn scan_directed_flipped(&self, labels: &LabelTriple) -> Result<Vec<Triple>>;

    /// Directed edges in either orientation, reported as if undirected.
    fn scan_directed_blunt(&self, labels: &LabelTriple) -> Result<Vec<Triple>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equality_ignores_payload() {
        let a = Elem::node(ElemId(1), ["Person"], json!({"name": "Ada"}));
        let b = Elem::node(ElemId(2), ["Person"], json!({"name": "Ada"}));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn equality_uses_graph_identity() {
        let first = Elem::node(ElemId(7), ["Person"], Payload::Null);
        let rescanned = Elem::node(ElemId(7), ["Person"], Payload::Null);
        assert_eq!(first, rescanned);
        let edge = Elem::edge(ElemId(7), EdgeKind::Directed, ["KNOWS"], Payload::Null);
        assert_ne!(first, edge);
    }

    #[test]
    fn label_spec_matching() {
        let node = Elem::node(ElemId(1), ["Person", "Admin"], Payload::Null);
        assert!(LabelSpec::Whatever.matches(&node));
        assert!(LabelSpec::one_of("Admin").matches(&node));
        assert!(!LabelSpec::one_of("City").matches(&node));
        let bare = Elem::node(ElemId(2), Vec::<String>::new(), Payload::Null);
        assert!(LabelSpec::Whatever.matches(&bare));
        assert!(!LabelSpec::one_of("Person").matches(&bare));
    }

    #[test]
    fn elem_serializes_with_kind_tag() {
        let edge = Elem::edge(ElemId(3), EdgeKind::Undirected, ["NEAR"], json!(5));
        let value = serde_json::to_value(&edge).expect("serialize");
        assert_eq!(value["id"], json!(3));
        assert_eq!(value["kind"], json!("undirected_edge"));
        assert_eq!(value["labels"], json!(["NEAR"]));
        assert_eq!(value["payload"], json!(5));
    }
}

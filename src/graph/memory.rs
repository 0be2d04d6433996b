use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::graph::{EdgeKind, Elem, ElemKind, Graph, LabelSpec, LabelTriple, Payload, Triple};
use crate::types::{ElemId, MatchError, Result};

struct MemEdge {
    edge: Elem,
    src: Elem,
    dst: Elem,
}

/// Simple in-memory graph used for tests, fixtures and prototyping.
///
/// Scans are linear over the stored elements. Node and edge ids share one
/// counter, so every element of a `MemGraph` has a distinct [`ElemId`].
#[derive(Default)]
pub struct MemGraph {
    nodes: Vec<Elem>,
    edges: Vec<MemEdge>,
    node_index: FxHashMap<ElemId, usize>,
    keys: FxHashMap<ElemId, String>,
    next_id: u64,
}

impl MemGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges of either orientation.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Adds a node and returns its element handle.
    pub fn add_node<I, S>(&mut self, labels: I, payload: Payload) -> Elem
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.allocate_id();
        let node = Elem::node(id, labels, payload);
        self.node_index.insert(id, self.nodes.len());
        self.nodes.push(node.clone());
        node
    }

    /// Adds an edge between two nodes already present in this graph.
    pub fn add_edge<I, S>(
        &mut self,
        src: &Elem,
        dst: &Elem,
        kind: EdgeKind,
        labels: I,
        payload: Payload,
    ) -> Result<Elem>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for endpoint in [src, dst] {
            if !self.owns_node(endpoint) {
                return Err(MatchError::Invalid(format!(
                    "edge endpoint {endpoint:?} is not a node of this graph"
                )));
            }
        }
        let id = self.allocate_id();
        let edge = Elem::edge(id, kind, labels, payload);
        self.edges.push(MemEdge {
            edge: edge.clone(),
            src: src.clone(),
            dst: dst.clone(),
        });
        Ok(edge)
    }

    /// Adds a directed edge `src -> dst` with a single label.
    pub fn add_directed(&mut self, src: &Elem, dst: &Elem, label: &str) -> Result<Elem> {
        self.add_edge(src, dst, EdgeKind::Directed, [label], Payload::Null)
    }

    /// Adds an undirected edge `a ~ b` with a single label.
    pub fn add_undirected(&mut self, a: &Elem, b: &Elem, label: &str) -> Result<Elem> {
        self.add_edge(a, b, EdgeKind::Undirected, [label], Payload::Null)
    }

    /// Fixture key the element was loaded under, if any.
    pub fn key_of(&self, elem: &Elem) -> Option<&str> {
        self.keys.get(&elem.id()).map(String::as_str)
    }

    /// Builds a graph from a fixture, resolving edge endpoints by node key.
    pub fn from_fixture(fixture: &GraphFixture) -> Result<Self> {
        let mut graph = MemGraph::new();
        let mut by_key: FxHashMap<&str, Elem> = FxHashMap::default();
        for node in &fixture.nodes {
            if by_key.contains_key(node.key.as_str()) {
                return Err(MatchError::Invalid(format!(
                    "duplicate node key '{}'",
                    node.key
                )));
            }
            let elem = graph.add_node(node.labels.iter().cloned(), node.payload.clone());
            graph.keys.insert(elem.id(), node.key.clone());
            by_key.insert(node.key.as_str(), elem);
        }
        for edge in &fixture.edges {
            let resolve = |key: &str| {
                by_key.get(key).cloned().ok_or_else(|| {
                    MatchError::Invalid(format!("edge references unknown node '{key}'"))
                })
            };
            let src = resolve(&edge.from)?;
            let dst = resolve(&edge.to)?;
            let kind = if edge.directed {
                EdgeKind::Directed
            } else {
                EdgeKind::Undirected
            };
            let elem = graph.add_edge(
                &src,
                &dst,
                kind,
                edge.labels.iter().cloned(),
                edge.payload.clone(),
            )?;
            if let Some(key) = &edge.key {
                if graph.keys.values().any(|existing| existing == key) {
                    return Err(MatchError::Invalid(format!("duplicate element key '{key}'")));
                }
                graph.keys.insert(elem.id(), key.clone());
            }
        }
        Ok(graph)
    }

    fn allocate_id(&mut self) -> ElemId {
        self.next_id += 1;
        ElemId(self.next_id)
    }

    fn owns_node(&self, elem: &Elem) -> bool {
        self.node_index
            .get(&elem.id())
            .is_some_and(|&idx| self.nodes[idx].same_entity(elem))
    }

    fn edges_of(&self, kind: EdgeKind, label: &LabelSpec) -> impl Iterator<Item = &MemEdge> {
        let label = label.clone();
        self.edges.iter().filter(move |entry| {
            entry.edge.kind() == ElemKind::Edge(kind) && label.matches(&entry.edge)
        })
    }
}

impl Graph for MemGraph {
    fn scan_nodes(&self, label: &LabelSpec) -> Result<Vec<Elem>> {
        let nodes: Vec<Elem> = self
            .nodes
            .iter()
            .filter(|node| label.matches(node))
            .cloned()
            .collect();
        trace!(label = %label, hits = nodes.len(), "graph.memory.scan_nodes");
        Ok(nodes)
    }

    fn scan_undirected(&self, labels: &LabelTriple) -> Result<Vec<Triple>> {
        let mut out = Vec::new();
        for entry in self.edges_of(EdgeKind::Undirected, &labels.edge) {
            push_oriented(&mut out, labels, entry, true, true);
        }
        trace!(hits = out.len(), "graph.memory.scan_undirected");
        Ok(out)
    }

    fn scan_directed_straight(&self, labels: &LabelTriple) -> Result<Vec<Triple>> {
        let mut out = Vec::new();
        for entry in self.edges_of(EdgeKind::Directed, &labels.edge) {
            push_oriented(&mut out, labels, entry, true, false);
        }
        trace!(hits = out.len(), "graph.memory.scan_directed_straight");
        Ok(out)
    }

    fn scan_directed_flipped(&self, labels: &LabelTriple) -> Result<Vec<Triple>> {
        let mut out = Vec::new();
        for entry in self.edges_of(EdgeKind::Directed, &labels.edge) {
            push_oriented(&mut out, labels, entry, false, true);
        }
        trace!(hits = out.len(), "graph.memory.scan_directed_flipped");
        Ok(out)
    }

    fn scan_directed_blunt(&self, labels: &LabelTriple) -> Result<Vec<Triple>> {
        let mut out = Vec::new();
        for entry in self.edges_of(EdgeKind::Directed, &labels.edge) {
            push_oriented(&mut out, labels, entry, true, true);
        }
        trace!(hits = out.len(), "graph.memory.scan_directed_blunt");
        Ok(out)
    }
}

/// Emits `src-edge-dst` and/or `dst-edge-src` when the endpoint labels fit.
/// A self-loop is reported once even when both orientations are requested.
fn push_oriented(
    out: &mut Vec<Triple>,
    labels: &LabelTriple,
    entry: &MemEdge,
    straight: bool,
    flipped: bool,
) {
    let mut emitted = false;
    if straight && labels.left.matches(&entry.src) && labels.right.matches(&entry.dst) {
        out.push(Triple::new(
            entry.src.clone(),
            entry.edge.clone(),
            entry.dst.clone(),
        ));
        emitted = true;
    }
    let self_loop = entry.src == entry.dst;
    if flipped
        && !(emitted && self_loop)
        && labels.left.matches(&entry.dst)
        && labels.right.matches(&entry.src)
    {
        out.push(Triple::new(
            entry.dst.clone(),
            entry.edge.clone(),
            entry.src.clone(),
        ));
    }
}

/// JSON fixture describing a small graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphFixture {
    /// Nodes, addressed by key from edges.
    #[serde(default)]
    pub nodes: Vec<NodeFixture>,
    /// Edges between fixture nodes.
    #[serde(default)]
    pub edges: Vec<EdgeFixture>,
}

impl GraphFixture {
    /// Parses a fixture from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Fixture node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeFixture {
    /// Unique key used by edges and output rendering.
    pub key: String,
    /// Node labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Opaque payload.
    #[serde(default)]
    pub payload: Payload,
}

/// Fixture edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeFixture {
    /// Optional key used for output rendering.
    #[serde(default)]
    pub key: Option<String>,
    /// Source node key (or either endpoint for undirected edges).
    pub from: String,
    /// Destination node key.
    pub to: String,
    /// Edge labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Whether the edge is directed.
    #[serde(default = "default_directed")]
    pub directed: bool,
    /// Opaque payload.
    #[serde(default)]
    pub payload: Payload,
}

fn default_directed() -> bool {
    true
}

//! Pattern AST handed over by the surrounding query parser.
//!
//! The structures mirror the surface syntax of a `MATCH` graph pattern,
//! including constructs the engine does not evaluate (selectors,
//! quantifiers, prefilters, restrictors). Those are carried here so the
//! translator can reject them explicitly instead of the parser silently
//! dropping them. Every type round-trips through serde so patterns can be
//! stored as JSON.

use serde::{Deserialize, Serialize};

/// Identifier of a binder (pattern variable).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Var(pub String);

impl Var {
    /// Creates a binder from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Var(name.into())
    }

    /// Binder name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Var {
    fn from(value: &str) -> Self {
        Var(value.to_owned())
    }
}

/// A complete graph pattern: one or more comma-separated path patterns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPattern {
    /// Path patterns in source order.
    pub paths: Vec<PathPattern>,
    /// Optional selector applied to the whole pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,
}

/// Path selector keywords.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// `ANY`
    Any,
    /// `ANY SHORTEST`
    AnyShortest,
    /// `ALL SHORTEST`
    AllShortest,
    /// `ANY k`
    AnyK(u32),
    /// `SHORTEST k`
    ShortestK(u32),
    /// `SHORTEST k GROUPS`
    ShortestKGroups(u32),
}

/// Path restrictor keywords.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Restrictor {
    /// `TRAIL`: no repeated edges.
    Trail,
    /// `ACYCLIC`: no repeated nodes.
    Acyclic,
    /// `SIMPLE`: no repeated nodes except first and last.
    Simple,
}

/// Repetition bounds `{lower, upper}`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Quantifier {
    /// Minimum repetitions.
    pub lower: u32,
    /// Maximum repetitions, unbounded when absent.
    #[serde(default)]
    pub upper: Option<u32>,
}

/// Inline predicate. Its expression is opaque to the matcher.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Prefilter {
    /// Predicate source text.
    pub expr: String,
}

/// A single path pattern, possibly nested inside another one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathPattern {
    /// Variable bound to the whole path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binder: Option<Var>,
    /// Path restrictor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictor: Option<Restrictor>,
    /// Inline predicate over the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefilter: Option<Prefilter>,
    /// Repetition of the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantifier: Option<Quantifier>,
    /// Ordered parts.
    pub parts: Vec<PathPart>,
}

/// Element of a path pattern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathPart {
    /// `(binder:Label)`
    Node(NodePattern),
    /// `-[binder:Label]->` and friends.
    Edge(EdgePattern),
    /// Parenthesised subpattern, inlined into the enclosing path.
    Pattern(PathPattern),
}

/// Node element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePattern {
    /// Optional binder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binder: Option<Var>,
    /// Label set; at most one label is supported.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Inline predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefilter: Option<Prefilter>,
}

/// Edge element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgePattern {
    /// Optional binder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binder: Option<Var>,
    /// Label set; at most one label is supported.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Syntactic direction token.
    pub direction: EdgeDirection,
    /// Inline predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefilter: Option<Prefilter>,
    /// Repetition of the edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantifier: Option<Quantifier>,
}

/// The seven edge direction tokens of the pattern syntax.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    /// `<-[]-`
    Left,
    /// `~[]~`
    Undirected,
    /// `-[]->`
    #[default]
    Right,
    /// `<~[]~`
    LeftOrUndirected,
    /// `~[]~>`
    UndirectedOrRight,
    /// `<-[]->`
    LeftOrRight,
    /// `-[]-`
    Any,
}

impl EdgeDirection {
    /// All tokens in declaration order.
    pub const ALL: [EdgeDirection; 7] = [
        EdgeDirection::Left,
        EdgeDirection::Undirected,
        EdgeDirection::Right,
        EdgeDirection::LeftOrUndirected,
        EdgeDirection::UndirectedOrRight,
        EdgeDirection::LeftOrRight,
        EdgeDirection::Any,
    ];
}

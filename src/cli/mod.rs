#![forbid(unsafe_code)]

//! Library-side helpers for the `stride` binary.
//!
//! Loads graph fixtures and pattern ASTs from JSON files and renders match
//! rows using fixture keys instead of raw element ids.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::graph::{Elem, GraphFixture, MemGraph};
use crate::query::ast::GraphPattern;
use crate::query::executor::MatchResult;
use crate::types::{MatchError, Result};

/// Reads a JSON graph fixture and builds an in-memory graph from it.
pub fn load_graph(path: &Path) -> Result<MemGraph> {
    let text = fs::read_to_string(path)?;
    let fixture = GraphFixture::from_json(&text)?;
    let graph = MemGraph::from_fixture(&fixture)?;
    debug!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "cli.load_graph"
    );
    Ok(graph)
}

/// Reads a JSON-serialised pattern AST.
pub fn load_pattern(path: &Path) -> Result<GraphPattern> {
    let text = fs::read_to_string(path)?;
    parse_pattern(&text)
}

/// Parses a JSON-serialised pattern AST.
pub fn parse_pattern(text: &str) -> Result<GraphPattern> {
    let pattern: GraphPattern = serde_json::from_str(text)?;
    if pattern.paths.is_empty() {
        return Err(MatchError::Invalid(
            "pattern file must contain at least one path".into(),
        ));
    }
    Ok(pattern)
}

/// Display name of an element: its fixture key, or its id.
pub fn elem_name(graph: &MemGraph, elem: &Elem) -> String {
    match graph.key_of(elem) {
        Some(key) => key.to_owned(),
        None => elem.id().to_string(),
    }
}

/// One match row prepared for output.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RenderedRow {
    /// Binder name to element name.
    pub bindings: BTreeMap<String, String>,
    /// Element names of each stride, in pattern order.
    pub strides: Vec<Vec<String>>,
}

impl RenderedRow {
    /// Single-line text form, e.g. `c=london p=ada  [ada, lives, london]`.
    pub fn to_text(&self) -> String {
        let bindings: Vec<String> = self
            .bindings
            .iter()
            .map(|(binder, name)| format!("{binder}={name}"))
            .collect();
        let strides: Vec<String> = self
            .strides
            .iter()
            .map(|stride| format!("[{}]", stride.join(", ")))
            .collect();
        if bindings.is_empty() {
            strides.join(" ")
        } else {
            format!("{}  {}", bindings.join(" "), strides.join(" "))
        }
    }
}

/// Renders every row of a match result against the graph it came from.
pub fn render_rows(graph: &MemGraph, result: &MatchResult) -> Result<Vec<RenderedRow>> {
    let mut rows = Vec::with_capacity(result.len());
    for (idx, strides) in result.rows().iter().enumerate() {
        let bindings = result
            .bindings(idx)?
            .into_iter()
            .map(|(binder, elem)| (binder, elem_name(graph, &elem)))
            .collect();
        let strides = strides
            .iter()
            .map(|stride| {
                stride
                    .elems()
                    .iter()
                    .map(|elem| elem_name(graph, elem))
                    .collect()
            })
            .collect();
        rows.push(RenderedRow { bindings, strides });
    }
    Ok(rows)
}

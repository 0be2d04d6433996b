//! Fluent pattern builder.
//!
//! Builds the same [`GraphPattern`] the surrounding parser would hand over,
//! for callers that construct patterns in Rust.

use std::mem;

use crate::query::{
    ast::{
        EdgeDirection, EdgePattern, GraphPattern, NodePattern, PathPart, PathPattern, Selector,
        Var,
    },
    executor::{Executor, MatchResult},
    planner::{PlanExplain, Planner, PlannerOutput},
    spec::MatchSpec,
    translate::translate,
};
use crate::types::{MatchError, Result};

/// Fluent builder for graph patterns.
///
/// Errors are recorded and surfaced by [`PatternBuilder::build`], so calls can
/// be chained without intermediate checks.
#[derive(Debug, Default)]
pub struct PatternBuilder {
    pattern: GraphPattern,
    current: PathPattern,
    pending_direction: EdgeDirection,
    error: Option<MatchError>,
}

impl PatternBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node to the current path.
    pub fn node<T>(mut self, target: T) -> Self
    where
        T: Into<NodeTarget>,
    {
        if self.error.is_some() {
            return self;
        }
        let NodeTarget { binder, label }: NodeTarget = target.into();
        match check_names(binder.as_deref(), label.as_deref()) {
            Ok(()) => self.current.parts.push(PathPart::Node(NodePattern {
                binder: binder.map(Var),
                labels: label.into_iter().collect(),
                prefilter: None,
            })),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Appends an edge using the pending direction, then resets it to `->`.
    pub fn edge<E>(mut self, target: E) -> Self
    where
        E: Into<EdgeTarget>,
    {
        if self.error.is_some() {
            return self;
        }
        let EdgeTarget { binder, label }: EdgeTarget = target.into();
        if let Err(err) = check_names(binder.as_deref(), label.as_deref()) {
            self.error = Some(err);
            return self;
        }
        self.current.parts.push(PathPart::Edge(EdgePattern {
            binder: binder.map(Var),
            labels: label.into_iter().collect(),
            direction: mem::take(&mut self.pending_direction),
            prefilter: None,
            quantifier: None,
        }));
        self
    }

    /// Sets the direction of the next edge.
    pub fn direction(mut self, dir: EdgeDirection) -> Self {
        self.pending_direction = dir;
        self
    }

    /// Shorthand for an `-[]-` edge matching any orientation.
    pub fn any_direction(self) -> Self {
        self.direction(EdgeDirection::Any)
    }

    /// Appends a parenthesised subpattern built by `build`.
    pub fn nested<F>(mut self, build: F) -> Self
    where
        F: FnOnce(PatternBuilder) -> PatternBuilder,
    {
        if self.error.is_some() {
            return self;
        }
        let inner = build(PatternBuilder::new());
        if let Some(err) = inner.error {
            self.error = Some(err);
            return self;
        }
        self.current.parts.push(PathPart::Pattern(inner.current));
        self
    }

    /// Closes the current path pattern and starts the next one.
    pub fn path(mut self) -> Self {
        let finished = mem::take(&mut self.current);
        self.pattern.paths.push(finished);
        self
    }

    /// Applies a selector to the whole pattern.
    pub fn selector(mut self, selector: Selector) -> Self {
        self.pattern.selector = Some(selector);
        self
    }

    /// Returns the pattern AST.
    pub fn build(mut self) -> Result<GraphPattern> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.pattern.paths.push(self.current);
        Ok(self.pattern)
    }

    /// Builds and translates the pattern.
    pub fn translate(self) -> Result<MatchSpec> {
        translate(&self.build()?)
    }

    /// Requests a plan from the supplied planner.
    pub fn plan(self, planner: &Planner) -> Result<PlannerOutput> {
        planner.plan(&self.translate()?)
    }

    /// Explains the plan using the supplied planner.
    pub fn explain(self, planner: &Planner) -> Result<PlanExplain> {
        Ok(self.plan(planner)?.explain)
    }

    /// Evaluates the pattern with the supplied executor.
    pub fn execute(self, executor: &Executor) -> Result<MatchResult> {
        executor.evaluate(&self.translate()?)
    }
}

fn check_names(binder: Option<&str>, label: Option<&str>) -> Result<()> {
    if binder.is_some_and(str::is_empty) {
        return Err(MatchError::Invalid("binder name must not be empty".into()));
    }
    if label.is_some_and(str::is_empty) {
        return Err(MatchError::Invalid("label must not be empty".into()));
    }
    Ok(())
}

/// Node target accepted by [`PatternBuilder::node`].
#[derive(Clone, Debug, Default)]
pub struct NodeTarget {
    /// Optional binder.
    pub binder: Option<String>,
    /// Optional label.
    pub label: Option<String>,
}

impl NodeTarget {
    /// Unbound node with no label constraint.
    pub fn any() -> Self {
        Self::default()
    }

    /// Bound node with no label constraint.
    pub fn var(name: &str) -> Self {
        Self {
            binder: Some(name.to_owned()),
            label: None,
        }
    }
}

impl From<&str> for NodeTarget {
    fn from(label: &str) -> Self {
        Self {
            binder: None,
            label: Some(label.to_owned()),
        }
    }
}

impl From<(&str, &str)> for NodeTarget {
    fn from((var, label): (&str, &str)) -> Self {
        Self {
            binder: Some(var.to_owned()),
            label: Some(label.to_owned()),
        }
    }
}

impl From<(&str, Option<&str>)> for NodeTarget {
    fn from((var, label): (&str, Option<&str>)) -> Self {
        Self {
            binder: Some(var.to_owned()),
            label: label.map(|l| l.to_owned()),
        }
    }
}

/// Edge target accepted by [`PatternBuilder::edge`].
#[derive(Clone, Debug, Default)]
pub struct EdgeTarget {
    /// Optional binder.
    pub binder: Option<String>,
    /// Optional label.
    pub label: Option<String>,
}

impl From<&str> for EdgeTarget {
    fn from(label: &str) -> Self {
        Self {
            binder: None,
            label: Some(label.to_owned()),
        }
    }
}

impl From<Option<&str>> for EdgeTarget {
    fn from(label: Option<&str>) -> Self {
        Self {
            binder: None,
            label: label.map(|l| l.to_owned()),
        }
    }
}

impl From<(&str, &str)> for EdgeTarget {
    fn from((var, label): (&str, &str)) -> Self {
        Self {
            binder: Some(var.to_owned()),
            label: Some(label.to_owned()),
        }
    }
}

//! Stride: graph pattern matching over pluggable graph sources.
//!
//! A declarative graph pattern is translated into alternating node/edge
//! stride specs, each stride is planned as a left-deep tree of pairwise
//! joins, and the plan is evaluated against any [`graph::Graph`]
//! implementation using label-filtered scans only.

#![warn(missing_docs)]

pub mod cli;
pub mod graph;
pub mod query;
pub mod types;

pub use graph::{Elem, Graph, LabelSpec, MemGraph};
pub use query::{
    evaluate, translate, Executor, ExecutorOptions, MatchResult, MatchSpec, PatternBuilder,
    Planner, PlannerConfig,
};
pub use types::{MatchError, Result};

#![forbid(unsafe_code)]

//! Pattern translation, planning and evaluation.
//!
//! Data flows `ast` → [`translate`] → [`MatchSpec`] → [`Planner`] →
//! [`Executor`] → [`MatchResult`].

/// Pattern AST handed over by the query parser.
pub mod ast;

/// Fluent builder for pattern ASTs.
pub mod builder;

/// Rejected pattern constructs.
pub mod errors;

/// Stride evaluation and result types.
///
/// Runs verified plans against a graph and materialises every witness.
pub mod executor;

/// Adjacency and cross-stride joins.
pub mod join;

/// Stride planning.
///
/// Splits each stride into `(node, edge, node)` leaves joined left-deep,
/// with explain output and a deterministic plan hash.
pub mod planner;

/// Performance profiling for scans and joins.
pub mod profile;

/// Declarative stride specs.
pub mod spec;

/// Pattern AST to stride spec translation.
pub mod translate;

pub use builder::{EdgeTarget, NodeTarget, PatternBuilder};
pub use errors::Feature;
pub use executor::{
    evaluate, evaluate_plan, evaluate_stride, Executor, ExecutorOptions, MatchResult, Stride,
    StrideResult,
};
pub use join::{join_adjacent_strides, join_points, join_strides_on_binders};
pub use planner::{
    plan_stride, restore_stride_spec, JoinStrategy, PlanExplain, Planner, PlannerConfig,
    PlannerOutput, StrideTree,
};
pub use spec::{DirSpec, EdgeSpec, ElemSpec, MatchSpec, NodeSpec, StepSpec, StrideSpec};
pub use translate::translate;

//! Stride evaluation against a [`Graph`].
//!
//! Evaluation is a single recursive walk over each stride's plan. Leaves are
//! answered by graph scans, joins by [`crate::query::join`]. Every
//! intermediate [`StrideResult`] is fully materialised before it is joined.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::graph::{Elem, Graph, Triple};
use crate::query::join::{join_adjacent_with, join_strides_on_binders};
use crate::query::planner::{
    plan_stride, verify_plan, JoinStrategy, PlannedStride, Planner, PlannerConfig,
    PlannerOutput, StridePlan, StrideTree,
};
use crate::query::profile::{profile_timer, record_profile_timer, QueryProfileKind};
use crate::query::spec::{ElemSpec, MatchSpec, NodeSpec, ScanKind, StepSpec, StrideSpec};
use crate::types::{MatchError, Result};

/// Concrete alternating sequence of bound elements witnessing a stride spec.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Stride {
    elems: SmallVec<[Elem; 5]>,
}

impl Stride {
    /// Wraps bound elements in pattern order.
    pub fn new(elems: impl IntoIterator<Item = Elem>) -> Self {
        Self {
            elems: elems.into_iter().collect(),
        }
    }

    /// Bound elements in pattern order.
    pub fn elems(&self) -> &[Elem] {
        &self.elems
    }

    /// Number of bound elements.
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// True only for a stride with no elements, which evaluation never yields.
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// First bound node.
    pub fn first(&self) -> Option<&Elem> {
        self.elems.first()
    }

    /// Last bound node.
    pub fn last(&self) -> Option<&Elem> {
        self.elems.last()
    }

    /// Concatenates `self` with `right`, dropping `right`'s shared first node.
    pub(crate) fn concat(&self, right: &Stride) -> Stride {
        let mut elems = self.elems.clone();
        elems.extend(right.elems.iter().skip(1).cloned());
        Stride { elems }
    }
}

impl From<Triple> for Stride {
    fn from(triple: Triple) -> Self {
        Stride::new([triple.left, triple.edge, triple.right])
    }
}

impl fmt::Debug for Stride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.elems.iter()).finish()
    }
}

impl Serialize for Stride {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.elems.iter())
    }
}

/// All witnesses of one stride spec, deduplicated by elementwise identity.
///
/// Strides keep the order in which evaluation first produced them.
#[derive(Clone, Debug)]
pub struct StrideResult {
    spec: StrideSpec,
    strides: Vec<Stride>,
    seen: FxHashSet<Stride>,
}

impl StrideResult {
    /// Creates an empty result for `spec`.
    pub fn new(spec: StrideSpec) -> Self {
        Self {
            spec,
            strides: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    /// Spec every stride satisfies.
    pub fn spec(&self) -> &StrideSpec {
        &self.spec
    }

    /// Distinct witnesses.
    pub fn strides(&self) -> &[Stride] {
        &self.strides
    }

    /// Number of distinct witnesses.
    pub fn len(&self) -> usize {
        self.strides.len()
    }

    /// Whether no witness was found.
    pub fn is_empty(&self) -> bool {
        self.strides.is_empty()
    }

    /// Adds a witness unless an identical one is present.
    ///
    /// Returns whether the stride was new. A stride whose length differs from
    /// the spec is rejected, since joins index strides by spec position.
    pub fn insert(&mut self, stride: Stride) -> Result<bool> {
        if stride.len() != self.spec.len() {
            return Err(MatchError::Invalid(format!(
                "stride of length {} does not fit spec {} of length {}",
                stride.len(),
                self.spec,
                self.spec.len()
            )));
        }
        if !self.seen.insert(stride.clone()) {
            return Ok(false);
        }
        self.strides.push(stride);
        Ok(true)
    }

    /// Iterates over the witnesses.
    pub fn iter(&self) -> std::slice::Iter<'_, Stride> {
        self.strides.iter()
    }
}

impl<'a> IntoIterator for &'a StrideResult {
    type Item = &'a Stride;
    type IntoIter = std::slice::Iter<'a, Stride>;

    fn into_iter(self) -> Self::IntoIter {
        self.strides.iter()
    }
}

/// Final evaluation output: parallel rows, one stride per spec per row.
#[derive(Clone, Debug, Serialize)]
pub struct MatchResult {
    #[serde(skip)]
    specs: Vec<StrideSpec>,
    rows: Vec<Vec<Stride>>,
}

impl MatchResult {
    pub(crate) fn new(specs: Vec<StrideSpec>, rows: Vec<Vec<Stride>>) -> Self {
        Self { specs, rows }
    }

    /// Stride specs, parallel to each row.
    pub fn specs(&self) -> &[StrideSpec] {
        &self.specs
    }

    /// Result rows.
    pub fn rows(&self) -> &[Vec<Stride>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the pattern matched nothing.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Projects row `row` onto binder names.
    pub fn bindings(&self, row: usize) -> Result<BTreeMap<String, Elem>> {
        let strides = self
            .rows
            .get(row)
            .ok_or_else(|| MatchError::Invalid(format!("row {row} out of range")))?;
        let mut out: BTreeMap<String, Elem> = BTreeMap::new();
        for (spec, stride) in self.specs.iter().zip(strides) {
            for (elem_spec, elem) in spec.elems().iter().zip(stride.elems()) {
                let Some(binder) = elem_spec.binder() else {
                    continue;
                };
                match out.get(binder.as_str()) {
                    Some(bound) if bound != elem => {
                        return Err(MatchError::internal(format!(
                            "binder {} bound to {bound:?} and {elem:?}",
                            binder.as_str()
                        )))
                    }
                    Some(_) => {}
                    None => {
                        out.insert(binder.as_str().to_owned(), elem.clone());
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Options controlling one [`Executor`].
#[derive(Clone, Debug, Default)]
pub struct ExecutorOptions {
    /// Planner configuration used by [`Executor::evaluate`].
    pub planner: PlannerConfig,
    /// Cooperative cancellation flag.
    pub cancel_token: Option<Arc<AtomicBool>>,
    /// Upper bound on any materialised stride result.
    pub max_rows: Option<usize>,
}

impl ExecutorOptions {
    /// Default options: hash joins, no cancellation, no row limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the adjacency join algorithm.
    pub fn join_strategy(mut self, strategy: JoinStrategy) -> Self {
        self.planner.join_strategy = strategy;
        self
    }

    /// Installs a cancellation flag checked between strides and join probes.
    pub fn cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Fails evaluation once any intermediate result exceeds `rows`.
    pub fn max_rows(mut self, rows: usize) -> Self {
        self.max_rows = Some(rows);
        self
    }
}

/// Per-call evaluation limits shared by the evaluator and the joins.
pub(crate) struct EvalContext<'a> {
    cancel: Option<&'a AtomicBool>,
    max_rows: Option<usize>,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn unbounded() -> Self {
        Self {
            cancel: None,
            max_rows: None,
        }
    }

    fn from_options(options: &'a ExecutorOptions) -> Self {
        Self {
            cancel: options.cancel_token.as_deref(),
            max_rows: options.max_rows,
        }
    }

    pub(crate) fn check_cancel(&self) -> Result<()> {
        if let Some(flag) = self.cancel {
            if flag.load(Ordering::SeqCst) {
                return Err(MatchError::Cancelled);
            }
        }
        Ok(())
    }

    pub(crate) fn check_rows(&self, rows: usize) -> Result<()> {
        match self.max_rows {
            Some(limit) if rows > limit => Err(MatchError::Invalid(format!(
                "row limit exceeded: more than {limit} rows"
            ))),
            _ => Ok(()),
        }
    }
}

/// Evaluates match specs against one graph.
pub struct Executor {
    graph: Arc<dyn Graph>,
    options: ExecutorOptions,
}

impl Executor {
    /// Creates an executor over `graph`.
    pub fn new(graph: Arc<dyn Graph>, options: ExecutorOptions) -> Self {
        Self { graph, options }
    }

    /// Executor options.
    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Planner configured from the executor options.
    pub fn planner(&self) -> Planner {
        Planner::new(self.options.planner)
    }

    /// Plans and executes `spec`.
    pub fn evaluate(&self, spec: &MatchSpec) -> Result<MatchResult> {
        let output = self.planner().plan(spec)?;
        self.execute(&output)
    }

    /// Executes previously planned strides and combines them into rows.
    pub fn execute(&self, output: &PlannerOutput) -> Result<MatchResult> {
        let ctx = EvalContext::from_options(&self.options);
        let strategy = output.config.join_strategy;
        let mut results = Vec::with_capacity(output.plans.len());
        for planned in &output.plans {
            ctx.check_cancel()?;
            results.push(run_planned(self.graph.as_ref(), planned, strategy, &ctx)?);
        }
        let result = join_strides_on_binders(results)?;
        debug!(rows = result.len(), plan_hash = output.plan_hash, "query.exec.complete");
        Ok(result)
    }

    /// Evaluates a single stride spec with the executor's options.
    pub fn evaluate_stride(&self, spec: &StrideSpec) -> Result<StrideResult> {
        let ctx = EvalContext::from_options(&self.options);
        evaluate_stride_with(
            self.graph.as_ref(),
            spec,
            self.options.planner.join_strategy,
            &ctx,
        )
    }
}

/// Evaluates `spec` with default options.
pub fn evaluate(graph: &dyn Graph, spec: &MatchSpec) -> Result<MatchResult> {
    let ctx = EvalContext::unbounded();
    let strategy = JoinStrategy::default();
    let mut results = Vec::with_capacity(spec.len());
    for stride in spec.strides() {
        results.push(evaluate_stride_with(graph, stride, strategy, &ctx)?);
    }
    join_strides_on_binders(results)
}

/// Computes every witness of one stride spec.
pub fn evaluate_stride(graph: &dyn Graph, spec: &StrideSpec) -> Result<StrideResult> {
    evaluate_stride_with(graph, spec, JoinStrategy::default(), &EvalContext::unbounded())
}

/// Evaluates a verified plan tree.
pub fn evaluate_plan(graph: &dyn Graph, plan: &StrideTree) -> Result<StrideResult> {
    evaluate_plan_with(graph, plan, JoinStrategy::default(), &EvalContext::unbounded())
}

fn run_planned(
    graph: &dyn Graph,
    planned: &PlannedStride,
    strategy: JoinStrategy,
    ctx: &EvalContext<'_>,
) -> Result<StrideResult> {
    let result = match &planned.plan {
        StridePlan::NodeScan { node } => scan_node_stride(graph, &planned.spec, node, ctx)?,
        StridePlan::Tree(tree) => evaluate_plan_with(graph, tree, strategy, ctx)?,
    };
    debug!(stride = %planned.spec, rows = result.len(), "query.exec.stride");
    Ok(result)
}

fn evaluate_stride_with(
    graph: &dyn Graph,
    spec: &StrideSpec,
    strategy: JoinStrategy,
    ctx: &EvalContext<'_>,
) -> Result<StrideResult> {
    let result = match spec.elems() {
        [ElemSpec::Node(node)] => scan_node_stride(graph, spec, node, ctx)?,
        _ => {
            let plan = plan_stride(spec)?;
            verify_plan(spec, &plan)?;
            evaluate_plan_with(graph, &plan, strategy, ctx)?
        }
    };
    debug!(stride = %spec, rows = result.len(), "query.exec.stride");
    Ok(result)
}

fn scan_node_stride(
    graph: &dyn Graph,
    spec: &StrideSpec,
    node: &NodeSpec,
    ctx: &EvalContext<'_>,
) -> Result<StrideResult> {
    let timer = profile_timer();
    let nodes = graph.scan_nodes(&node.label)?;
    record_profile_timer(QueryProfileKind::Scan, timer);
    let mut result = StrideResult::new(spec.clone());
    for elem in nodes {
        if result.insert(Stride::new([elem]))? {
            ctx.check_rows(result.len())?;
        }
    }
    Ok(result)
}

pub(crate) fn evaluate_plan_with(
    graph: &dyn Graph,
    plan: &StrideTree,
    strategy: JoinStrategy,
    ctx: &EvalContext<'_>,
) -> Result<StrideResult> {
    match plan {
        StrideTree::Leaf { stride } => evaluate_leaf(graph, stride, ctx),
        StrideTree::Join { left, right } => {
            let left = evaluate_plan_with(graph, left, strategy, ctx)?;
            let right = evaluate_plan_with(graph, right, strategy, ctx)?;
            join_adjacent_with(&left, &right, strategy, ctx)
        }
    }
}

fn evaluate_leaf(
    graph: &dyn Graph,
    spec: &StrideSpec,
    ctx: &EvalContext<'_>,
) -> Result<StrideResult> {
    let [ElemSpec::Node(left), ElemSpec::Edge(edge), ElemSpec::Node(right)] = spec.elems() else {
        return Err(MatchError::internal(format!(
            "leaf {spec} is not a node-edge-node step"
        )));
    };
    let step = StepSpec::from_leaf(left, edge, right);
    let bound_pairs = repeated_binders(spec);
    let mut result = StrideResult::new(spec.clone());
    for scan in step.dir.scans() {
        let timer = profile_timer();
        let triples = match scan {
            ScanKind::Undirected => graph.scan_undirected(&step.labels)?,
            ScanKind::DirectedBlunt => graph.scan_directed_blunt(&step.labels)?,
            ScanKind::DirectedStraight => graph.scan_directed_straight(&step.labels)?,
            ScanKind::DirectedFlipped => graph.scan_directed_flipped(&step.labels)?,
        };
        record_profile_timer(QueryProfileKind::Scan, timer);
        trace!(scan = scan.name(), hits = triples.len(), "query.exec.scan");
        for triple in triples {
            let stride = Stride::from(triple);
            let consistent = bound_pairs
                .iter()
                .all(|&(i, j)| stride.elems()[i] == stride.elems()[j]);
            if consistent && result.insert(stride)? {
                ctx.check_rows(result.len())?;
            }
        }
    }
    Ok(result)
}

/// Position pairs of a leaf that share a binder and must bind the same element.
fn repeated_binders(spec: &StrideSpec) -> Vec<(usize, usize)> {
    let elems = spec.elems();
    let mut pairs = Vec::new();
    for i in 0..elems.len() {
        let Some(binder) = elems[i].binder() else {
            continue;
        };
        for (j, other) in elems.iter().enumerate().skip(i + 1) {
            if other.binder() == Some(binder) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

//! Left-deep stride planning.
//!
//! Every stride of three or more positions is split into `(node, edge, node)`
//! leaves joined pairwise from the left. Keeping each join binary means the
//! evaluator needs a single join operator regardless of path length. Plans are
//! checked against their source spec before they are handed out.

use std::fmt;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use tracing::debug;
use xxhash_rust::xxh64::Xxh64;

use crate::graph::LabelSpec;
use crate::query::join::join_points;
use crate::query::spec::{EdgeSpec, ElemSpec, MatchSpec, NodeSpec, StepSpec, StrideSpec};
use crate::types::{MatchError, Result};

/// Binary plan for one stride.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StrideTree {
    /// A single `(node, edge, node)` step answered by graph scans.
    Leaf {
        /// Exactly three positions.
        stride: StrideSpec,
    },
    /// Adjacency join; `left`'s last node is `right`'s first node.
    Join {
        /// Left input.
        left: Box<StrideTree>,
        /// Right input.
        right: Box<StrideTree>,
    },
}

impl StrideTree {
    /// Spec covered by this subtree.
    pub fn spec(&self) -> StrideSpec {
        restore_stride_spec(self)
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        match self {
            StrideTree::Leaf { .. } => 1,
            StrideTree::Join { left, right } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Node, edge and node spec of a leaf, or `None` for joins.
    pub fn leaf_parts(&self) -> Option<(&NodeSpec, &EdgeSpec, &NodeSpec)> {
        let StrideTree::Leaf { stride } = self else {
            return None;
        };
        match stride.elems() {
            [ElemSpec::Node(left), ElemSpec::Edge(edge), ElemSpec::Node(right)] => {
                Some((left, edge, right))
            }
            _ => None,
        }
    }
}

/// Builds the left-deep plan for a stride of length three or more.
pub fn plan_stride(spec: &StrideSpec) -> Result<StrideTree> {
    if spec.len() < 3 {
        return Err(MatchError::internal(format!(
            "stride of length {} has no join plan",
            spec.len()
        )));
    }
    Ok(plan_elems(spec.elems()))
}

fn plan_elems(elems: &[ElemSpec]) -> StrideTree {
    let leaf = StrideTree::Leaf {
        stride: StrideSpec::from_parts_unchecked(elems[..3].to_vec()),
    };
    if elems.len() == 3 {
        return leaf;
    }
    StrideTree::Join {
        left: Box::new(leaf),
        right: Box::new(plan_elems(&elems[2..])),
    }
}

/// Reassembles the spec a plan covers, dropping each shared join node once.
pub fn restore_stride_spec(plan: &StrideTree) -> StrideSpec {
    let mut elems = Vec::new();
    append_elems(plan, &mut elems);
    StrideSpec::from_parts_unchecked(elems)
}

fn append_elems(plan: &StrideTree, out: &mut Vec<ElemSpec>) {
    match plan {
        StrideTree::Leaf { stride } => {
            let skip = usize::from(!out.is_empty());
            out.extend(stride.elems()[skip..].iter().cloned());
        }
        StrideTree::Join { left, right } => {
            append_elems(left, out);
            append_elems(right, out);
        }
    }
}

/// Fails with an internal error unless `plan` reconstructs `spec` exactly.
pub fn verify_plan(spec: &StrideSpec, plan: &StrideTree) -> Result<()> {
    let restored = restore_stride_spec(plan);
    if &restored != spec {
        return Err(MatchError::internal(format!(
            "plan covers {restored} but stride is {spec}"
        )));
    }
    Ok(())
}

/// Adjacency join algorithm.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinStrategy {
    /// Compare every left/right pair.
    NestedLoop,
    /// Index the right input on its first node and probe with the left.
    #[default]
    Hash,
}

impl JoinStrategy {
    /// Operator name shown in explain output.
    pub fn op_name(&self) -> &'static str {
        match self {
            JoinStrategy::NestedLoop => "NestedLoopJoin",
            JoinStrategy::Hash => "HashJoin",
        }
    }
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinStrategy::NestedLoop => f.write_str("nested-loop"),
            JoinStrategy::Hash => f.write_str("hash"),
        }
    }
}

/// Planner inputs that influence operator selection.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PlannerConfig {
    /// Algorithm used for every adjacency join.
    pub join_strategy: JoinStrategy,
}

/// Executable plan for one stride.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StridePlan {
    /// Node-only stride answered by a single node scan.
    NodeScan {
        /// Node constraint.
        node: NodeSpec,
    },
    /// Verified join tree.
    Tree(StrideTree),
}

/// A stride spec together with its plan.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlannedStride {
    /// Source spec.
    pub spec: StrideSpec,
    /// Plan covering `spec`.
    pub plan: StridePlan,
}

/// Planner output for a whole match spec.
#[derive(Clone, Debug)]
pub struct PlannerOutput {
    /// One plan per stride, in source order.
    pub plans: Vec<PlannedStride>,
    /// Configuration the plans were built with.
    pub config: PlannerConfig,
    /// Human-readable explain tree.
    pub explain: PlanExplain,
    /// Deterministic plan hash for explain/caching.
    pub plan_hash: u64,
}

/// Explain forest, one root per stride.
#[derive(Clone, Debug, Serialize)]
pub struct PlanExplain {
    /// Root nodes in stride order.
    pub roots: Vec<ExplainNode>,
    /// Deterministic hash for the plan.
    pub plan_hash: u64,
}

impl PlanExplain {
    /// Renders the forest as an indented tree.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for root in &self.roots {
            render_node(root, 0, &mut out);
        }
        out
    }
}

fn render_node(node: &ExplainNode, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(&node.op);
    if !node.props.is_empty() {
        let props: Vec<String> = node
            .props
            .iter()
            .map(|prop| format!("{}={}", prop.key, prop.value))
            .collect();
        out.push_str(&format!(" [{}]", props.join(", ")));
    }
    out.push('\n');
    for child in &node.inputs {
        render_node(child, depth + 1, out);
    }
}

/// Explain node representing an operator with optional metadata.
#[derive(Clone, Debug, Serialize)]
pub struct ExplainNode {
    /// Operator name
    pub op: String,
    /// Additional properties describing the operator
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<ExplainProp>,
    /// Input operators
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<ExplainNode>,
}

impl ExplainNode {
    /// Creates a new explain node with the given operator name.
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            props: Vec::new(),
            inputs: Vec::new(),
        }
    }

    fn with_prop(mut self, key: &str, value: impl Into<String>) -> Self {
        self.props.push(ExplainProp {
            key: key.to_owned(),
            value: value.into(),
        });
        self
    }
}

/// Single property associated with an [`ExplainNode`].
#[derive(Clone, Debug, Serialize)]
pub struct ExplainProp {
    /// Property key.
    pub key: String,
    /// Property value serialized for display.
    pub value: String,
}

/// Plans every stride of a match spec.
#[derive(Clone, Debug, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    /// Creates a planner with the given configuration.
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Planner configuration.
    pub fn config(&self) -> PlannerConfig {
        self.config
    }

    /// Plans and verifies each stride, then builds the explain forest.
    pub fn plan(&self, spec: &MatchSpec) -> Result<PlannerOutput> {
        let plans = spec
            .strides()
            .iter()
            .map(|stride| self.plan_stride(stride))
            .collect::<Result<Vec<_>>>()?;
        let roots: Vec<ExplainNode> = plans
            .iter()
            .map(|planned| self.explain_stride(planned))
            .collect();
        let plan_hash = compute_plan_hash(&roots);
        debug!(
            strides = plans.len(),
            join = %self.config.join_strategy,
            plan_hash,
            "query.plan.complete"
        );
        Ok(PlannerOutput {
            plans,
            config: self.config,
            explain: PlanExplain { roots, plan_hash },
            plan_hash,
        })
    }

    /// Plans a single stride.
    pub fn plan_stride(&self, spec: &StrideSpec) -> Result<PlannedStride> {
        let plan = match spec.elems() {
            [ElemSpec::Node(node)] => StridePlan::NodeScan { node: node.clone() },
            [_] => {
                return Err(MatchError::internal(
                    "single-position stride does not hold a node",
                ))
            }
            _ => {
                let tree = plan_stride(spec)?;
                verify_plan(spec, &tree)?;
                StridePlan::Tree(tree)
            }
        };
        debug!(len = spec.len(), stride = %spec, "query.plan.stride");
        Ok(PlannedStride {
            spec: spec.clone(),
            plan,
        })
    }

    fn explain_stride(&self, planned: &PlannedStride) -> ExplainNode {
        let mut root = ExplainNode::new("Stride").with_prop("pattern", planned.spec.to_string());
        let input = match &planned.plan {
            StridePlan::NodeScan { node } => explain_node_scan(node),
            StridePlan::Tree(tree) => self.explain_tree(tree),
        };
        root.inputs.push(input);
        root
    }

    fn explain_tree(&self, tree: &StrideTree) -> ExplainNode {
        match tree {
            StrideTree::Leaf { stride } => explain_step(stride),
            StrideTree::Join { left, right } => {
                let on: Vec<String> = join_points(&left.spec(), &right.spec())
                    .into_iter()
                    .map(|(l, r)| format!("{l}={r}"))
                    .collect();
                let mut node = ExplainNode::new(self.config.join_strategy.op_name())
                    .with_prop("on", on.join(","));
                node.inputs = vec![self.explain_tree(left), self.explain_tree(right)];
                node
            }
        }
    }
}

fn label_text(label: &LabelSpec) -> String {
    match label {
        LabelSpec::Whatever => "*".to_owned(),
        LabelSpec::OneOf(label) => label.clone(),
    }
}

fn explain_node_scan(node: &NodeSpec) -> ExplainNode {
    let mut explain = ExplainNode::new("NodeScan").with_prop("label", label_text(&node.label));
    if let Some(binder) = &node.binder {
        explain = explain.with_prop("as", binder.as_str());
    }
    explain
}

fn explain_step(stride: &StrideSpec) -> ExplainNode {
    let mut explain = ExplainNode::new("Step").with_prop("pattern", stride.to_string());
    if let [ElemSpec::Node(left), ElemSpec::Edge(edge), ElemSpec::Node(right)] = stride.elems() {
        let step = StepSpec::from_leaf(left, edge, right);
        let scans: Vec<&str> = step.dir.scans().iter().map(|scan| scan.name()).collect();
        explain = explain.with_prop("scans", scans.join("+"));
        if left.binder.is_some() && left.binder == right.binder {
            explain = explain.with_prop("self_bound", "true");
        }
    }
    explain
}

fn compute_plan_hash(roots: &[ExplainNode]) -> u64 {
    let mut hasher = Xxh64::new(0);
    hasher.write_u64(roots.len() as u64);
    for root in roots {
        hash_explain_node(root, &mut hasher);
    }
    hasher.finish()
}

fn hash_explain_node(node: &ExplainNode, hasher: &mut Xxh64) {
    hasher.write(node.op.as_bytes());
    for prop in &node.props {
        hasher.write(prop.key.as_bytes());
        hasher.write(prop.value.as_bytes());
    }
    hasher.write_u64(node.inputs.len() as u64);
    for child in &node.inputs {
        hash_explain_node(child, hasher);
    }
}

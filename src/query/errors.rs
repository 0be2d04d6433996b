#![forbid(unsafe_code)]

use std::fmt;

/// Pattern constructs rejected by the translator or the evaluator.
///
/// These surface through [`crate::types::MatchError::Unsupported`] so callers
/// can tell which construct was refused instead of receiving an approximated
/// result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    /// Path selectors such as `ANY SHORTEST`.
    Selector,
    /// A variable bound to a whole path.
    PathBinder,
    /// Path restrictors such as `TRAIL` or `ACYCLIC`.
    PathRestrictor,
    /// Inline `WHERE` attached to a path.
    PathPrefilter,
    /// Repetition applied to a path or subpattern.
    PathQuantifier,
    /// Inline `WHERE` attached to a node or edge.
    ElementPrefilter,
    /// Repetition applied to a single edge.
    ElementQuantifier,
    /// More than one label on a single element.
    LabelDisjunction {
        /// Number of labels supplied.
        count: usize,
    },
    /// Joining independent path patterns on shared binders.
    CrossStrideJoin {
        /// Number of path patterns supplied.
        strides: usize,
    },
}

impl Feature {
    /// Returns a machine-readable code for the feature.
    pub fn code(&self) -> &'static str {
        match self {
            Feature::Selector => "Selector",
            Feature::PathBinder => "PathBinder",
            Feature::PathRestrictor => "PathRestrictor",
            Feature::PathPrefilter => "PathPrefilter",
            Feature::PathQuantifier => "PathQuantifier",
            Feature::ElementPrefilter => "ElementPrefilter",
            Feature::ElementQuantifier => "ElementQuantifier",
            Feature::LabelDisjunction { .. } => "LabelDisjunction",
            Feature::CrossStrideJoin { .. } => "CrossStrideJoin",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Selector => write!(f, "path selectors"),
            Feature::PathBinder => write!(f, "path binders"),
            Feature::PathRestrictor => write!(f, "path restrictors"),
            Feature::PathPrefilter => write!(f, "path prefilters"),
            Feature::PathQuantifier => write!(f, "path quantifiers"),
            Feature::ElementPrefilter => write!(f, "element prefilters"),
            Feature::ElementQuantifier => write!(f, "edge quantifiers"),
            Feature::LabelDisjunction { count } => {
                write!(f, "label sets with more than one label (got {count})")
            }
            Feature::CrossStrideJoin { strides } => {
                write!(f, "joining {strides} path patterns on shared binders")
            }
        }
    }
}

#![forbid(unsafe_code)]

//! Identifiers and the crate-wide error type.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::query::errors::Feature;

/// Stable identity assigned to a graph element by its backing graph.
///
/// Two elements are the same entity iff their kinds and ids agree; payload
/// content never participates in equality.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElemId(pub u64);

impl fmt::Display for ElemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for ElemId {
    fn from(value: u64) -> Self {
        ElemId(value)
    }
}

/// Errors raised while translating, planning or evaluating a pattern.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The pattern uses a construct this engine rejects up front.
    #[error("unsupported feature: {0}")]
    Unsupported(Feature),
    /// The pattern has a structural shape that cannot be patched.
    #[error("malformed pattern: {0}")]
    Malformed(&'static str),
    /// A planner or evaluator invariant failed; never caused by user input.
    #[error("internal invariant violated: {0}")]
    Internal(String),
    /// Evaluation observed the caller's cancellation token.
    #[error("evaluation cancelled")]
    Cancelled,
    /// Caller input outside the pattern itself was rejected.
    #[error("invalid argument: {0}")]
    Invalid(String),
    /// Underlying I/O failure (fixture and pattern loading).
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// JSON or TOML payload could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MatchError>;

impl MatchError {
    /// Builds an [`MatchError::Internal`] and records it at `error` level.
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(%message, "query.internal_invariant");
        MatchError::Internal(message)
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::Unsupported(_) => "UnsupportedFeature",
            MatchError::Malformed(_) => "MalformedPattern",
            MatchError::Internal(_) => "InternalInvariantViolation",
            MatchError::Cancelled => "Cancelled",
            MatchError::Invalid(_) => "InvalidArgument",
            MatchError::Io(_) => "Io",
            MatchError::Serialization(_) => "Serialization",
        }
    }

    /// Whether this error indicates an engine defect rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, MatchError::Internal(_))
    }
}

impl From<serde_json::Error> for MatchError {
    fn from(err: serde_json::Error) -> Self {
        MatchError::Serialization(err.to_string())
    }
}

/// Convenience wrapper that formats errors with their codes.
pub struct MatchErrorWithCode<'a>(pub &'a MatchError);

impl fmt::Display for MatchErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}

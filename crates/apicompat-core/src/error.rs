//! Error taxonomy for the mapping engine.

use thiserror::Error;

/// Failures surfaced by the engine.
///
/// Configuration errors are raised at the point of misuse, before any tree
/// work happens. Rule failures abort the comparison that triggered them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompatError {
    #[error("an assembly set needs at least one right-side source")]
    NoRightSources,
    #[error("right index {index} is out of range for {count} right-side source(s)")]
    RightIndexOutOfRange { index: usize, count: usize },
    #[error("a mapper node needs at least one present element")]
    EmptyNode,
    #[error("reference right index {index} is out of range for {count} right-side source(s)")]
    ReferenceOutOfRange { index: usize, count: usize },
    #[error("rule '{rule_id}' failed at '{element_path}': {message}")]
    RuleFailed {
        rule_id: String,
        element_path: String,
        message: String,
    },
}

/// Error returned by an individual rule unit.
///
/// The runner wraps it into [`CompatError::RuleFailed`] with the rule id and
/// the element path of the node being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RuleError(pub String);

impl RuleError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

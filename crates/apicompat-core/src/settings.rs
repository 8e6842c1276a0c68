//! Comparison settings shared by every node and rule invocation.
//!
//! Settings are built once, wrapped in an `Arc`, and never mutated afterwards.
//! Nodes only hold the shared handle.

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::difference::Severity;
use crate::element::ElementKind;
use crate::error::CompatError;

/// Immutable configuration for one comparison run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperSettings {
    /// Kinds that take part in child alignment. `None` includes every kind.
    /// Top-level assemblies are always mapped.
    pub include_kinds: Option<BTreeSet<ElementKind>>,
    /// Whether identity comparison of qualified names is case-sensitive.
    pub case_sensitive: bool,
    /// Candidate treated as the reference by rules that need asymmetric context.
    pub reference_right: Option<usize>,
    /// Strict mode lets rules report additions, not only removals.
    pub strict_mode: bool,
    /// Findings at or above this severity are actionable; the rest are informational.
    pub actionable_severity: Severity,
    /// Display name of the baseline.
    pub left_name: String,
    /// Display names of the candidates, by index. Missing entries fall back to `right[i]`.
    pub right_names: Vec<String>,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            include_kinds: None,
            case_sensitive: true,
            reference_right: None,
            strict_mode: false,
            actionable_severity: Severity::Warning,
            left_name: "left".to_string(),
            right_names: Vec::new(),
        }
    }
}

impl MapperSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict child alignment to the given kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = ElementKind>) -> Self {
        self.include_kinds = Some(kinds.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    #[must_use]
    pub fn with_reference_right(mut self, index: usize) -> Self {
        self.reference_right = Some(index);
        self
    }

    #[must_use]
    pub fn with_strict_mode(mut self, strict_mode: bool) -> Self {
        self.strict_mode = strict_mode;
        self
    }

    #[must_use]
    pub fn with_actionable_severity(mut self, severity: Severity) -> Self {
        self.actionable_severity = severity;
        self
    }

    #[must_use]
    pub fn with_names(
        mut self,
        left: impl Into<String>,
        right: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.left_name = left.into();
        self.right_names = right.into_iter().map(Into::into).collect();
        self
    }

    /// Check settings against the number of right-side sources.
    pub fn validate(&self, right_count: usize) -> Result<(), CompatError> {
        if right_count == 0 {
            return Err(CompatError::NoRightSources);
        }
        match self.reference_right {
            Some(index) if index >= right_count => Err(CompatError::ReferenceOutOfRange {
                index,
                count: right_count,
            }),
            _ => Ok(()),
        }
    }

    /// Returns true if elements of `kind` take part in child alignment.
    #[must_use]
    pub fn includes(&self, kind: ElementKind) -> bool {
        self.include_kinds
            .as_ref()
            .is_none_or(|kinds| kinds.contains(&kind))
    }

    /// Identity key for a qualified name under the configured matching mode.
    #[must_use]
    pub fn identity_key<'a>(&self, qualified_name: &'a str) -> Cow<'a, str> {
        if self.case_sensitive {
            Cow::Borrowed(qualified_name)
        } else {
            Cow::Owned(qualified_name.to_lowercase())
        }
    }

    #[must_use]
    pub fn is_actionable(&self, severity: Severity) -> bool {
        severity >= self.actionable_severity
    }

    #[must_use]
    pub fn right_name(&self, index: usize) -> Cow<'_, str> {
        match self.right_names.get(index) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(format!("right[{index}]")),
        }
    }
}

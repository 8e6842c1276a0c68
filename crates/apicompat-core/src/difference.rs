//! Difference records emitted by rules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a finding. Ordered `Info < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" | "informational" | "note" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "error" | "err" => Some(Self::Error),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the element on the right compared to the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferenceType {
    Added,
    Removed,
    Changed,
}

/// One compatibility finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatDifference {
    pub rule_id: String,
    pub right_index: usize,
    /// Qualified name of the element the finding is about.
    pub element_path: String,
    pub code: String,
    pub message: String,
    pub severity: Severity,
    pub difference_type: DifferenceType,
}

impl CompatDifference {
    #[must_use]
    pub fn new(
        rule_id: impl Into<String>,
        right_index: usize,
        element_path: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        difference_type: DifferenceType,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            right_index,
            element_path: element_path.into(),
            code: code.into(),
            message: message.into(),
            severity,
            difference_type,
        }
    }
}

impl fmt::Display for CompatDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] right[{}] {}: {}",
            self.severity, self.code, self.rule_id, self.right_index, self.element_path, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_info_below_error() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(Severity::from_str_loose("WARN"), Some(Severity::Warning));
        assert_eq!(Severity::from_str_loose("fatal"), None);
    }

    #[test]
    fn difference_serializes_lowercase_enums() {
        let diff = CompatDifference::new(
            "ElementMustExist",
            1,
            "Lib.Ns.Type",
            "CP0001",
            "Type 'Lib.Ns.Type' exists on left but not on right[1]",
            Severity::Error,
            DifferenceType::Removed,
        );
        let json: serde_json::Value = serde_json::to_value(&diff).unwrap();
        assert_eq!(json["severity"], "error");
        assert_eq!(json["difference_type"], "removed");
        assert_eq!(json["right_index"], 1);
        assert!(diff.to_string().starts_with("error CP0001 [ElementMustExist] right[1]"));
    }
}

//! Built-in compatibility rules.
//!
//! | id | code | finding |
//! |----|------|---------|
//! | `ElementMustExist` | CP1001 / CP0001 / CP0002 | assembly, type or member present on the left is missing on the right |
//! | `AssemblyIdentityMustMatch` | CP0003 | positionally matched assemblies carry different names |
//! | `KindMustMatch` | CP0005 | the same identity has a different kind on the right |
//! | `ElementAdded` | CP0010 | strict mode only: element present on the right but not on the left |
//!
//! Missing types and members are reported by the closest ancestor present on
//! both sides, so a removed type is one finding rather than one per member.

use apicompat_core::{
    CompatDifference, DifferenceType, Element, ElementKind, ElementMapper, Rule, RuleContext,
    RuleError, Severity,
};

use crate::error::HarnessError;

pub const ELEMENT_MUST_EXIST: &str = "ElementMustExist";
pub const ASSEMBLY_IDENTITY_MUST_MATCH: &str = "AssemblyIdentityMustMatch";
pub const KIND_MUST_MATCH: &str = "KindMustMatch";
pub const ELEMENT_ADDED: &str = "ElementAdded";

/// Rule ids of the default catalog, in execution order.
pub const DEFAULT_RULE_IDS: [&str; 4] = [
    ELEMENT_MUST_EXIST,
    ASSEMBLY_IDENTITY_MUST_MATCH,
    KIND_MUST_MATCH,
    ELEMENT_ADDED,
];

/// The default catalog, in execution order.
#[must_use]
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    DEFAULT_RULE_IDS
        .iter()
        .filter_map(|id| catalog_rule(id))
        .collect()
}

/// Look up a catalog rule by id.
#[must_use]
pub fn catalog_rule(id: &str) -> Option<Box<dyn Rule>> {
    match id {
        ELEMENT_MUST_EXIST => Some(Box::new(ElementMustExist)),
        ASSEMBLY_IDENTITY_MUST_MATCH => Some(Box::new(AssemblyIdentityMustMatch)),
        KIND_MUST_MATCH => Some(Box::new(KindMustMatch)),
        ELEMENT_ADDED => Some(Box::new(ElementAdded)),
        _ => None,
    }
}

/// Resolve a list of ids into rules, keeping the given order.
pub fn rules_by_id<S: AsRef<str>>(ids: &[S]) -> Result<Vec<Box<dyn Rule>>, HarnessError> {
    ids.iter()
        .map(|id| {
            let id = id.as_ref();
            catalog_rule(id).ok_or_else(|| HarnessError::UnknownRule(id.to_string()))
        })
        .collect()
}

fn side_names(cx: &RuleContext<'_>) -> (String, String) {
    (
        cx.settings.left_name.clone(),
        cx.settings.right_name(cx.right_index).into_owned(),
    )
}

fn kind_label(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Assembly => "Assembly",
        ElementKind::Namespace => "Namespace",
        ElementKind::Type => "Type",
        ElementKind::Member => "Member",
    }
}

/// Baseline elements must exist in every candidate.
pub struct ElementMustExist;

impl ElementMustExist {
    fn code(kind: ElementKind) -> &'static str {
        match kind {
            ElementKind::Assembly => "CP1001",
            ElementKind::Member => "CP0002",
            ElementKind::Type | ElementKind::Namespace => "CP0001",
        }
    }

    fn missing(cx: &RuleContext<'_>, element: &dyn Element) -> CompatDifference {
        let (left, right) = side_names(cx);
        CompatDifference::new(
            ELEMENT_MUST_EXIST,
            cx.right_index,
            element.qualified_name(),
            Self::code(element.kind()),
            format!(
                "{} '{}' exists on {left} but not on {right}",
                kind_label(element.kind()),
                element.qualified_name()
            ),
            Severity::Error,
            DifferenceType::Removed,
        )
    }

    // A namespace missing on the right is not itself a break; its types are.
    fn collect_missing(cx: &RuleContext<'_>, child: &ElementMapper, out: &mut Vec<CompatDifference>) {
        let Some(left) = child.left() else {
            return;
        };
        if child.right_at(cx.right_index).is_some() {
            return;
        }
        match left.kind() {
            ElementKind::Namespace => {
                for grandchild in child.children() {
                    Self::collect_missing(cx, grandchild, out);
                }
            }
            _ => out.push(Self::missing(cx, left.as_ref())),
        }
    }
}

impl Rule for ElementMustExist {
    fn id(&self) -> &str {
        ELEMENT_MUST_EXIST
    }

    fn evaluate(&self, cx: &RuleContext<'_>) -> Result<Vec<CompatDifference>, RuleError> {
        let mut out = Vec::new();
        match (cx.left, cx.right) {
            (Some(left), None) if left.kind() == ElementKind::Assembly => {
                out.push(Self::missing(cx, left.as_ref()));
            }
            (Some(_), Some(_)) => {
                for child in cx.node.children() {
                    Self::collect_missing(cx, child, &mut out);
                }
            }
            _ => {}
        }
        Ok(out)
    }
}

/// Positionally matched assemblies should carry the same name.
pub struct AssemblyIdentityMustMatch;

impl Rule for AssemblyIdentityMustMatch {
    fn id(&self) -> &str {
        ASSEMBLY_IDENTITY_MUST_MATCH
    }

    fn evaluate(&self, cx: &RuleContext<'_>) -> Result<Vec<CompatDifference>, RuleError> {
        let (Some(left), Some(right)) = (cx.left, cx.right) else {
            return Ok(Vec::new());
        };
        if left.kind() != ElementKind::Assembly || right.kind() != ElementKind::Assembly {
            return Ok(Vec::new());
        }
        let left_key = cx.settings.identity_key(left.qualified_name());
        let right_key = cx.settings.identity_key(right.qualified_name());
        if left_key == right_key {
            return Ok(Vec::new());
        }
        let (left_name, right_name) = side_names(cx);
        Ok(vec![CompatDifference::new(
            ASSEMBLY_IDENTITY_MUST_MATCH,
            cx.right_index,
            left.qualified_name(),
            "CP0003",
            format!(
                "Assembly '{}' on {left_name} is matched with '{}' on {right_name}",
                left.qualified_name(),
                right.qualified_name()
            ),
            Severity::Warning,
            DifferenceType::Changed,
        )])
    }
}

/// An identity must keep its kind.
pub struct KindMustMatch;

impl Rule for KindMustMatch {
    fn id(&self) -> &str {
        KIND_MUST_MATCH
    }

    fn evaluate(&self, cx: &RuleContext<'_>) -> Result<Vec<CompatDifference>, RuleError> {
        let (Some(left), Some(right)) = (cx.left, cx.right) else {
            return Ok(Vec::new());
        };
        if left.kind() == right.kind() {
            return Ok(Vec::new());
        }
        let (left_name, right_name) = side_names(cx);
        Ok(vec![CompatDifference::new(
            KIND_MUST_MATCH,
            cx.right_index,
            cx.element_path(),
            "CP0005",
            format!(
                "'{}' is a {} on {left_name} but a {} on {right_name}",
                cx.element_path(),
                left.kind(),
                right.kind()
            ),
            Severity::Error,
            DifferenceType::Changed,
        )])
    }
}

/// Reports additions in strict mode. Informational.
pub struct ElementAdded;

impl ElementAdded {
    fn added(cx: &RuleContext<'_>, element: &dyn Element) -> CompatDifference {
        let (left, right) = side_names(cx);
        CompatDifference::new(
            ELEMENT_ADDED,
            cx.right_index,
            element.qualified_name(),
            "CP0010",
            format!(
                "{} '{}' exists on {right} but not on {left}",
                kind_label(element.kind()),
                element.qualified_name()
            ),
            Severity::Info,
            DifferenceType::Added,
        )
    }
}

impl Rule for ElementAdded {
    fn id(&self) -> &str {
        ELEMENT_ADDED
    }

    fn evaluate(&self, cx: &RuleContext<'_>) -> Result<Vec<CompatDifference>, RuleError> {
        if !cx.settings.strict_mode {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        match (cx.left, cx.right) {
            (None, Some(right)) if right.kind() == ElementKind::Assembly => {
                out.push(Self::added(cx, right.as_ref()));
            }
            (Some(_), Some(_)) => {
                for child in cx.node.children() {
                    if child.left().is_some() {
                        continue;
                    }
                    if let Some(right) = child.right_at(cx.right_index) {
                        out.push(Self::added(cx, right.as_ref()));
                    }
                }
            }
            _ => {}
        }
        Ok(out)
    }
}

//! Element capability consumed from symbol providers.
//!
//! The engine never looks past [`Element::qualified_name`], [`Element::kind`]
//! and [`Element::children`]. Providers are expected to return the same child
//! sequence every time `children()` is called on the same element during a run;
//! the engine does not verify this.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Level of an element in an API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Assembly,
    Namespace,
    Type,
    Member,
}

impl ElementKind {
    pub const ALL: [Self; 4] = [Self::Assembly, Self::Namespace, Self::Type, Self::Member];

    /// Parse from string (case-insensitive). Returns `None` for unknown names.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assembly" | "module" => Some(Self::Assembly),
            "namespace" | "ns" => Some(Self::Namespace),
            "type" | "class" | "struct" | "interface" | "enum" => Some(Self::Type),
            "member" | "method" | "field" | "property" | "event" => Some(Self::Member),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assembly => "assembly",
            Self::Namespace => "namespace",
            Self::Type => "type",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, kind-tagged, child-bearing unit of an API surface.
pub trait Element: fmt::Debug + Send + Sync {
    /// Stable qualified name. Used as the element's identity below the
    /// assembly level.
    fn qualified_name(&self) -> &str;

    fn kind(&self) -> ElementKind;

    /// Children in provider order. The engine does not re-sort them.
    fn children(&self) -> Vec<ElementRef>;
}

/// Shared read-only handle to an element.
pub type ElementRef = Arc<dyn Element>;

/// Which side of the comparison a batch of elements belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementSide {
    /// The baseline.
    Left,
    /// The candidate with the given index.
    Right(usize),
}

/// Owned in-memory element tree.
///
/// This is the adapter used by surface files and tests: the provider hands
/// over fully materialized data, so `children()` only clones handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiElement {
    pub name: String,
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Arc<ApiElement>>,
}

impl ApiElement {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn assembly(name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Assembly)
    }

    #[must_use]
    pub fn namespace(name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Namespace)
    }

    #[must_use]
    pub fn ty(name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Type)
    }

    #[must_use]
    pub fn member(name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Member)
    }

    /// Append a child, builder style.
    #[must_use]
    pub fn with_child(mut self, child: ApiElement) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    /// Append several children in order.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = ApiElement>) -> Self {
        self.children.extend(children.into_iter().map(Arc::new));
        self
    }

    /// Wrap into a shared handle for registration.
    #[must_use]
    pub fn into_ref(self) -> ElementRef {
        Arc::new(self)
    }

    /// Total number of elements in this subtree, including `self`.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| child.subtree_len())
            .sum::<usize>()
    }
}

impl Element for ApiElement {
    fn qualified_name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn children(&self) -> Vec<ElementRef> {
        self.children
            .iter()
            .map(|child| Arc::clone(child) as ElementRef)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_loosely() {
        assert_eq!(ElementKind::from_str_loose("Type"), Some(ElementKind::Type));
        assert_eq!(ElementKind::from_str_loose(" ns "), Some(ElementKind::Namespace));
        assert_eq!(ElementKind::from_str_loose("method"), Some(ElementKind::Member));
        assert_eq!(ElementKind::from_str_loose("widget"), None);
    }

    #[test]
    fn api_element_children_preserve_order() {
        let ns = ApiElement::namespace("N")
            .with_child(ApiElement::ty("N.B"))
            .with_child(ApiElement::ty("N.A"));
        let names: Vec<String> = ns
            .children()
            .iter()
            .map(|c| c.qualified_name().to_string())
            .collect();
        assert_eq!(names, vec!["N.B", "N.A"]);
        assert_eq!(ns.subtree_len(), 3);
    }

    #[test]
    fn api_element_deserializes_without_children() {
        let json = r#"{"name":"Lib","kind":"assembly","children":[{"name":"Lib.Ns","kind":"namespace"}]}"#;
        let asm: ApiElement = serde_json::from_str(json).unwrap();
        assert_eq!(asm.kind, ElementKind::Assembly);
        assert_eq!(asm.children.len(), 1);
        assert!(asm.children[0].children.is_empty());
    }
}

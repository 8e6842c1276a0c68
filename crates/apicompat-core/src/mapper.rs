//! Mapper nodes: one baseline slot aligned with N candidate slots.
//!
//! Children are aligned by identity (qualified name under the configured
//! matching mode) and materialized lazily on first access. The scan order is
//! left, then right[0], right[1], ... right[N-1], each side in provider order,
//! and the resulting child order is first-seen order across that scan.
//!
//! Kinds excluded by the settings are transparent: an excluded child is
//! replaced in the scan by its nearest included descendants, in pre-order.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::element::{ElementKind, ElementRef, ElementSide};
use crate::error::CompatError;
use crate::settings::MapperSettings;

/// Tree node aligning one optional left element with N optional right elements.
pub struct ElementMapper {
    left: Option<ElementRef>,
    right: Box<[Option<ElementRef>]>,
    settings: Arc<MapperSettings>,
    children: OnceLock<MappedChildren>,
}

struct MappedChildren {
    nodes: Vec<Arc<ElementMapper>>,
    by_identity: HashMap<String, usize>,
    duplicates: usize,
}

/// Slots collected for a child before it is frozen into a node.
struct PendingSlots {
    left: Option<ElementRef>,
    right: Vec<Option<ElementRef>>,
}

impl PendingSlots {
    fn new(right_count: usize) -> Self {
        Self {
            left: None,
            right: vec![None; right_count],
        }
    }

    // Last write wins when a side reports the same identity twice.
    fn set(&mut self, side: ElementSide, element: ElementRef) {
        match side {
            ElementSide::Left => self.left = Some(element),
            ElementSide::Right(index) => self.right[index] = Some(element),
        }
    }
}

impl ElementMapper {
    /// Build a node from explicit slots.
    ///
    /// `right` fixes the candidate count for this node and everything below it.
    /// Settings must validate against that count, and a node with every slot
    /// absent is rejected.
    pub fn new(
        left: Option<ElementRef>,
        right: Vec<Option<ElementRef>>,
        settings: Arc<MapperSettings>,
    ) -> Result<Self, CompatError> {
        settings.validate(right.len())?;
        if left.is_none() && right.iter().all(Option::is_none) {
            return Err(CompatError::EmptyNode);
        }
        Ok(Self::from_slots(left, right.into_boxed_slice(), settings))
    }

    pub(crate) fn from_slots(
        left: Option<ElementRef>,
        right: Box<[Option<ElementRef>]>,
        settings: Arc<MapperSettings>,
    ) -> Self {
        debug_assert!(left.is_some() || right.iter().any(Option::is_some));
        Self {
            left,
            right,
            settings,
            children: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn left(&self) -> Option<&ElementRef> {
        self.left.as_ref()
    }

    /// All right slots, indexed by candidate.
    #[must_use]
    pub fn right(&self) -> &[Option<ElementRef>] {
        &self.right
    }

    /// Right slot for one candidate. Out-of-range indices read as absent.
    #[must_use]
    pub fn right_at(&self, index: usize) -> Option<&ElementRef> {
        self.right.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn right_count(&self) -> usize {
        self.right.len()
    }

    #[must_use]
    pub fn settings(&self) -> &Arc<MapperSettings> {
        &self.settings
    }

    /// The first present element, scanning left then right in index order.
    #[must_use]
    pub fn representative(&self) -> &ElementRef {
        match self.left.as_ref().or_else(|| self.right.iter().flatten().next()) {
            Some(element) => element,
            // Constructors reject nodes with every slot absent.
            None => unreachable!("mapper node without any element"),
        }
    }

    /// Qualified name of the node, taken from its representative element.
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        self.representative().qualified_name()
    }

    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.representative().kind()
    }

    /// Returns true if the element is present on the left and on every right side.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.right.iter().all(Option::is_some)
    }

    /// Child nodes in first-seen order. Built on first call, memoized afterwards.
    pub fn children(&self) -> &[Arc<ElementMapper>] {
        &self.realized_children().nodes
    }

    /// Look up a child by qualified name under the configured matching mode.
    pub fn child(&self, qualified_name: &str) -> Option<&Arc<ElementMapper>> {
        let realized = self.realized_children();
        let key = self.settings.identity_key(qualified_name);
        realized
            .by_identity
            .get(key.as_ref())
            .map(|&position| &realized.nodes[position])
    }

    /// Returns true once the children of this node have been built.
    #[must_use]
    pub fn children_realized(&self) -> bool {
        self.children.get().is_some()
    }

    /// Number of child registrations that repeated an identity already seen on
    /// the same side. Realizes children.
    pub fn duplicate_identities(&self) -> usize {
        self.realized_children().duplicates
    }

    fn realized_children(&self) -> &MappedChildren {
        self.children.get_or_init(|| self.align_children())
    }

    fn align_children(&self) -> MappedChildren {
        let right_count = self.right.len();
        let mut pending: Vec<PendingSlots> = Vec::new();
        let mut by_identity: HashMap<String, usize> = HashMap::new();
        let mut duplicates = 0;

        let sides = std::iter::once((ElementSide::Left, self.left.as_ref())).chain(
            self.right
                .iter()
                .enumerate()
                .map(|(index, slot)| (ElementSide::Right(index), slot.as_ref())),
        );

        for (side, parent) in sides {
            let Some(parent) = parent else {
                continue;
            };
            let mut seen_on_side = HashSet::new();
            for child in self.included_children(parent) {
                let key = self.settings.identity_key(child.qualified_name()).into_owned();
                let position = *by_identity.entry(key).or_insert_with(|| {
                    pending.push(PendingSlots::new(right_count));
                    pending.len() - 1
                });
                if !seen_on_side.insert(position) {
                    duplicates += 1;
                }
                pending[position].set(side, child);
            }
        }

        let nodes = pending
            .into_iter()
            .map(|slots| {
                Arc::new(Self::from_slots(
                    slots.left,
                    slots.right.into_boxed_slice(),
                    Arc::clone(&self.settings),
                ))
            })
            .collect();

        MappedChildren {
            nodes,
            by_identity,
            duplicates,
        }
    }

    /// Children of `parent` whose kind is included, looking through excluded ones.
    fn included_children(&self, parent: &ElementRef) -> Vec<ElementRef> {
        let mut included = Vec::new();
        let mut stack: Vec<ElementRef> = parent.children();
        stack.reverse();
        while let Some(element) = stack.pop() {
            if self.settings.includes(element.kind()) {
                included.push(element);
            } else {
                stack.extend(element.children().into_iter().rev());
            }
        }
        included
    }
}

impl fmt::Debug for ElementMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let right: Vec<Option<&str>> = self
            .right
            .iter()
            .map(|slot| slot.as_ref().map(|element| element.qualified_name()))
            .collect();
        f.debug_struct("ElementMapper")
            .field("left", &self.left.as_ref().map(|element| element.qualified_name()))
            .field("right", &right)
            .field("children_realized", &self.children_realized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ApiElement;

    fn node(left: Option<ApiElement>, right: Vec<Option<ApiElement>>) -> ElementMapper {
        node_with(left, right, MapperSettings::default())
    }

    fn node_with(
        left: Option<ApiElement>,
        right: Vec<Option<ApiElement>>,
        settings: MapperSettings,
    ) -> ElementMapper {
        ElementMapper::new(
            left.map(ApiElement::into_ref),
            right.into_iter().map(|r| r.map(ApiElement::into_ref)).collect(),
            Arc::new(settings),
        )
        .unwrap()
    }

    fn names(nodes: &[Arc<ElementMapper>]) -> Vec<&str> {
        nodes.iter().map(|n| n.qualified_name()).collect()
    }

    #[test]
    fn aligns_children_by_identity() {
        let left = ApiElement::namespace("N")
            .with_children([ApiElement::ty("N.X"), ApiElement::ty("N.Y")]);
        let right = ApiElement::namespace("N")
            .with_children([ApiElement::ty("N.Y"), ApiElement::ty("N.Z")]);
        let mapper = node(Some(left), vec![Some(right)]);

        let children = mapper.children();
        assert_eq!(names(children), vec!["N.X", "N.Y", "N.Z"]);

        let x = mapper.child("N.X").unwrap();
        assert!(x.left().is_some());
        assert!(x.right_at(0).is_none());

        let y = mapper.child("N.Y").unwrap();
        assert!(y.is_complete());

        let z = mapper.child("N.Z").unwrap();
        assert!(z.left().is_none());
        assert!(z.right_at(0).is_some());
    }

    #[test]
    fn first_seen_order_spans_all_right_sides() {
        let left = ApiElement::namespace("N").with_child(ApiElement::ty("N.B"));
        let right0 = ApiElement::namespace("N")
            .with_children([ApiElement::ty("N.D"), ApiElement::ty("N.B")]);
        let right1 = ApiElement::namespace("N")
            .with_children([ApiElement::ty("N.A"), ApiElement::ty("N.D")]);
        let mapper = node(Some(left), vec![Some(right0), Some(right1)]);

        assert_eq!(names(mapper.children()), vec!["N.B", "N.D", "N.A"]);
        let d = mapper.child("N.D").unwrap();
        assert!(d.left().is_none());
        assert!(d.right_at(0).is_some());
        assert!(d.right_at(1).is_some());
        assert_eq!(d.right_count(), 2);
    }

    #[test]
    fn children_are_memoized() {
        let left = ApiElement::namespace("N").with_child(ApiElement::ty("N.A"));
        let mapper = node(Some(left.clone()), vec![Some(left)]);
        assert!(!mapper.children_realized());

        let first = Arc::clone(&mapper.children()[0]);
        assert!(mapper.children_realized());
        let second = Arc::clone(&mapper.children()[0]);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn identity_absent_everywhere_has_no_node() {
        let left = ApiElement::namespace("N").with_child(ApiElement::ty("N.A"));
        let mapper = node(Some(left), vec![None, None]);
        assert_eq!(mapper.children().len(), 1);
        assert!(mapper.child("N.Missing").is_none());
        for child in mapper.children() {
            assert!(child.left().is_some() || child.right().iter().any(Option::is_some));
        }
    }

    #[test]
    fn duplicate_identity_on_one_side_reuses_node() {
        let first = ApiElement::ty("N.A").with_child(ApiElement::member("N.A.First"));
        let second = ApiElement::ty("N.A").with_child(ApiElement::member("N.A.Second"));
        let left = ApiElement::namespace("N").with_children([first, second]);
        let mapper = node(Some(left), vec![None]);

        assert_eq!(mapper.children().len(), 1);
        assert_eq!(mapper.duplicate_identities(), 1);
        let a = mapper.child("N.A").unwrap();
        let members: Vec<String> = a
            .left()
            .unwrap()
            .children()
            .iter()
            .map(|m| m.qualified_name().to_string())
            .collect();
        assert_eq!(members, vec!["N.A.Second"]);
    }

    #[test]
    fn kind_filter_skips_excluded_children() {
        let left = ApiElement::ty("N.A")
            .with_children([ApiElement::member("N.A.M"), ApiElement::ty("N.A.Nested")]);
        let settings = MapperSettings::new().with_kinds([ElementKind::Type]);
        let mapper = node_with(Some(left.clone()), vec![Some(left)], settings);
        assert_eq!(names(mapper.children()), vec!["N.A.Nested"]);
    }

    #[test]
    fn kind_filter_hoists_types_through_excluded_namespaces() {
        let left = ApiElement::assembly("Lib").with_children([
            ApiElement::namespace("Lib.A").with_children([
                ApiElement::ty("Lib.A.X"),
                ApiElement::namespace("Lib.A.Inner").with_child(ApiElement::ty("Lib.A.Inner.Y")),
            ]),
            ApiElement::namespace("Lib.B").with_child(ApiElement::ty("Lib.B.Z")),
        ]);
        let right = ApiElement::assembly("Lib")
            .with_child(ApiElement::namespace("Lib.A").with_child(ApiElement::ty("Lib.A.X")));
        let settings = MapperSettings::new().with_kinds([ElementKind::Type]);
        let mapper = node_with(Some(left), vec![Some(right)], settings);

        assert_eq!(
            names(mapper.children()),
            vec!["Lib.A.X", "Lib.A.Inner.Y", "Lib.B.Z"]
        );
        assert!(mapper.child("Lib.A.X").unwrap().is_complete());
        assert!(mapper.child("Lib.B.Z").unwrap().right_at(0).is_none());
        assert!(mapper.child("Lib.A").is_none());
    }

    #[test]
    fn case_insensitive_matching_merges_identities() {
        let left = ApiElement::namespace("N").with_child(ApiElement::ty("N.Foo"));
        let right = ApiElement::namespace("N").with_child(ApiElement::ty("n.foo"));
        let settings = MapperSettings::new().with_case_sensitive(false);
        let mapper = node_with(Some(left), vec![Some(right)], settings);

        assert_eq!(mapper.children().len(), 1);
        let child = mapper.child("N.FOO").unwrap();
        assert!(child.is_complete());
        assert_eq!(child.qualified_name(), "N.Foo");
    }

    #[test]
    fn constructor_rejects_invalid_slots() {
        let settings = Arc::new(MapperSettings::default());
        let err = ElementMapper::new(Some(ApiElement::ty("T").into_ref()), vec![], Arc::clone(&settings))
            .unwrap_err();
        assert_eq!(err, CompatError::NoRightSources);
        let err = ElementMapper::new(None, vec![None, None], settings).unwrap_err();
        assert_eq!(err, CompatError::EmptyNode);
    }

    #[test]
    fn constructor_checks_reference_against_right_count() {
        let settings = Arc::new(MapperSettings::new().with_reference_right(2));
        let err = ElementMapper::new(
            Some(ApiElement::ty("T").into_ref()),
            vec![Some(ApiElement::ty("T").into_ref())],
            settings,
        )
        .unwrap_err();
        assert_eq!(err, CompatError::ReferenceOutOfRange { index: 2, count: 1 });
    }

    #[test]
    fn empty_sides_contribute_nothing() {
        let mapper = node(Some(ApiElement::namespace("N")), vec![Some(ApiElement::namespace("N"))]);
        assert!(mapper.children().is_empty());
        assert_eq!(mapper.duplicate_identities(), 0);
    }
}

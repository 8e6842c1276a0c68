//! Root of the mapped tree: the left and right assembly lists.
//!
//! Assemblies are matched by position, not by name: the k-th registered
//! assembly on the left corresponds to the k-th registered assembly on every
//! right side. Below the assembly level, matching is by identity (see
//! [`ElementMapper`]).

use std::sync::{Arc, OnceLock};

use crate::element::{ElementRef, ElementSide};
use crate::error::CompatError;
use crate::mapper::ElementMapper;
use crate::settings::MapperSettings;

/// Batch-registered left/right assembly lists plus the realized assembly nodes.
pub struct AssemblySetMapper {
    left: Vec<ElementRef>,
    right: Box<[Vec<ElementRef>]>,
    settings: Arc<MapperSettings>,
    assemblies: OnceLock<Vec<Arc<ElementMapper>>>,
}

impl AssemblySetMapper {
    /// Create an empty set for `right_count` candidates.
    pub fn new(settings: impl Into<Arc<MapperSettings>>, right_count: usize) -> Result<Self, CompatError> {
        let settings = settings.into();
        settings.validate(right_count)?;
        Ok(Self {
            left: Vec::new(),
            right: vec![Vec::new(); right_count].into_boxed_slice(),
            settings,
            assemblies: OnceLock::new(),
        })
    }

    /// Append a batch of top-level elements to one side.
    ///
    /// Batches accumulate. Registering after [`get_assemblies`](Self::get_assemblies)
    /// has run is allowed but does not change the already realized assemblies.
    pub fn add_element(
        &mut self,
        batch: impl IntoIterator<Item = ElementRef>,
        side: ElementSide,
    ) -> Result<(), CompatError> {
        let target = match side {
            ElementSide::Left => &mut self.left,
            ElementSide::Right(index) => {
                let count = self.right.len();
                self.right
                    .get_mut(index)
                    .ok_or(CompatError::RightIndexOutOfRange { index, count })?
            }
        };
        target.extend(batch);
        Ok(())
    }

    /// Registered left elements, in registration order.
    #[must_use]
    pub fn left(&self) -> &[ElementRef] {
        &self.left
    }

    /// Registered right elements, one list per candidate.
    #[must_use]
    pub fn right(&self) -> &[Vec<ElementRef>] {
        &self.right
    }

    #[must_use]
    pub fn right_count(&self) -> usize {
        self.right.len()
    }

    #[must_use]
    pub fn settings(&self) -> &Arc<MapperSettings> {
        &self.settings
    }

    /// Realize the assembly nodes on first call; later calls return the same nodes.
    pub fn get_assemblies(&self) -> &[Arc<ElementMapper>] {
        self.assemblies.get_or_init(|| self.align_assemblies())
    }

    /// Number of realized assembly nodes. Zero until the first realization.
    #[must_use]
    pub fn assembly_count(&self) -> usize {
        self.assemblies.get().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_realized(&self) -> bool {
        self.assemblies.get().is_some()
    }

    fn align_assemblies(&self) -> Vec<Arc<ElementMapper>> {
        let len = self
            .right
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.left.len()))
            .max()
            .unwrap_or(0);

        (0..len)
            .map(|position| {
                let left = self.left.get(position).cloned();
                let right: Box<[Option<ElementRef>]> = self
                    .right
                    .iter()
                    .map(|side| side.get(position).cloned())
                    .collect();
                Arc::new(ElementMapper::from_slots(left, right, Arc::clone(&self.settings)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ApiElement;

    fn assemblies(prefix: &str, count: usize) -> Vec<ElementRef> {
        (0..count)
            .map(|i| {
                ApiElement::assembly(format!("{prefix}-{i}"))
                    .with_child(ApiElement::namespace(format!("NamespaceInAssembly{i}")))
                    .into_ref()
            })
            .collect()
    }

    #[test]
    fn new_sets_properties() {
        let settings = Arc::new(MapperSettings::default());
        let set = AssemblySetMapper::new(Arc::clone(&settings), 5).unwrap();
        assert!(set.left().is_empty());
        assert_eq!(set.right().len(), 5);
        assert_eq!(set.right_count(), 5);
        assert!(Arc::ptr_eq(set.settings(), &settings));
        assert_eq!(set.assembly_count(), 0);
    }

    #[test]
    fn zero_right_sources_is_rejected() {
        let err = AssemblySetMapper::new(MapperSettings::default(), 0).err();
        assert_eq!(err, Some(CompatError::NoRightSources));
    }

    #[test]
    fn out_of_range_right_index_is_rejected() {
        let mut set = AssemblySetMapper::new(MapperSettings::default(), 2).unwrap();
        let err = set
            .add_element(assemblies("asm", 1), ElementSide::Right(2))
            .unwrap_err();
        assert_eq!(err, CompatError::RightIndexOutOfRange { index: 2, count: 2 });
    }

    #[test]
    fn empty_set_realizes_nothing() {
        let set = AssemblySetMapper::new(MapperSettings::default(), 1).unwrap();
        assert!(set.get_assemblies().is_empty());
        assert_eq!(set.assembly_count(), 0);
        assert!(set.is_realized());
    }

    #[test]
    fn assemblies_align_by_position() {
        let mut set = AssemblySetMapper::new(MapperSettings::default(), 2).unwrap();
        set.add_element(assemblies("asm", 3), ElementSide::Left).unwrap();
        set.add_element(assemblies("asm", 4), ElementSide::Right(0)).unwrap();
        set.add_element(assemblies("asm", 4), ElementSide::Right(1)).unwrap();

        assert_eq!(set.assembly_count(), 0);
        let realized = set.get_assemblies();
        assert_eq!(set.assembly_count(), 4);
        assert_eq!(realized.len(), 4);

        let left_names: Vec<Option<&str>> = realized
            .iter()
            .map(|a| a.left().map(|e| e.qualified_name()))
            .collect();
        assert_eq!(left_names, vec![Some("asm-0"), Some("asm-1"), Some("asm-2"), None]);

        for (i, assembly) in realized.iter().enumerate() {
            assert_eq!(assembly.right().len(), 2);
            let expected = format!("asm-{i}");
            assert!(
                assembly
                    .right()
                    .iter()
                    .all(|r| r.as_ref().map(|e| e.qualified_name()) == Some(expected.as_str()))
            );
        }
    }

    #[test]
    fn positional_matching_ignores_names() {
        let mut set = AssemblySetMapper::new(MapperSettings::default(), 1).unwrap();
        set.add_element(assemblies("baseline", 2), ElementSide::Left).unwrap();
        set.add_element(assemblies("candidate", 1), ElementSide::Right(0)).unwrap();

        let realized = set.get_assemblies();
        assert_eq!(realized.len(), 2);
        assert_eq!(realized[0].left().unwrap().qualified_name(), "baseline-0");
        assert_eq!(realized[0].right_at(0).unwrap().qualified_name(), "candidate-0");
        assert!(realized[1].right_at(0).is_none());
    }

    #[test]
    fn realization_is_idempotent() {
        let mut set = AssemblySetMapper::new(MapperSettings::default(), 1).unwrap();
        set.add_element(assemblies("asm", 2), ElementSide::Left).unwrap();
        let first: Vec<Arc<ElementMapper>> = set.get_assemblies().to_vec();
        let second = set.get_assemblies();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[test]
    fn batches_accumulate() {
        let all = assemblies("asm", 2);
        let mut batched = AssemblySetMapper::new(MapperSettings::default(), 1).unwrap();
        batched.add_element([Arc::clone(&all[0])], ElementSide::Left).unwrap();
        batched.add_element([Arc::clone(&all[1])], ElementSide::Left).unwrap();

        let mut single = AssemblySetMapper::new(MapperSettings::default(), 1).unwrap();
        single.add_element(all.iter().cloned(), ElementSide::Left).unwrap();

        let batched_names: Vec<&str> = batched
            .get_assemblies()
            .iter()
            .map(|a| a.qualified_name())
            .collect();
        let single_names: Vec<&str> = single
            .get_assemblies()
            .iter()
            .map(|a| a.qualified_name())
            .collect();
        assert_eq!(batched_names, vec!["asm-0", "asm-1"]);
        assert_eq!(batched_names, single_names);
    }

    #[test]
    fn registration_after_realization_is_not_retroactive() {
        let mut set = AssemblySetMapper::new(MapperSettings::default(), 1).unwrap();
        set.add_element(assemblies("asm", 1), ElementSide::Left).unwrap();
        assert_eq!(set.get_assemblies().len(), 1);

        set.add_element(assemblies("late", 2), ElementSide::Right(0)).unwrap();
        assert_eq!(set.right()[0].len(), 2);
        assert_eq!(set.get_assemblies().len(), 1);
        assert_eq!(set.assembly_count(), 1);
    }
}

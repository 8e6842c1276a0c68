//! Depth-first comparison driver.
//!
//! Visits every realized node parent-first (assemblies in realized order,
//! children in first-seen order) and runs the rule runner at each node. The
//! visitation order is the order of the returned differences.

use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::assembly_set::AssemblySetMapper;
use crate::difference::CompatDifference;
use crate::error::CompatError;
use crate::mapper::ElementMapper;
use crate::rules::RuleRunner;
use crate::settings::MapperSettings;

/// Result of one comparison walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonOutcome {
    pub differences: Vec<CompatDifference>,
    pub nodes_visited: usize,
    /// Repeated identities reported by providers within one side's children.
    pub duplicate_identities: usize,
}

impl ComparisonOutcome {
    /// Differences at or above the actionable threshold.
    pub fn actionable<'a>(
        &'a self,
        settings: &'a MapperSettings,
    ) -> impl Iterator<Item = &'a CompatDifference> + 'a {
        self.differences
            .iter()
            .filter(|difference| settings.is_actionable(difference.severity))
    }

    #[must_use]
    pub fn has_actionable(&self, settings: &MapperSettings) -> bool {
        self.actionable(settings).next().is_some()
    }

    fn absorb(&mut self, other: ComparisonOutcome) {
        self.differences.extend(other.differences);
        self.nodes_visited += other.nodes_visited;
        self.duplicate_identities += other.duplicate_identities;
    }
}

/// What the observer sees for each visited node.
#[derive(Debug, Clone, Copy)]
pub struct NodeVisit<'a> {
    pub node: &'a ElementMapper,
    /// Zero for assemblies.
    pub depth: usize,
    pub differences: &'a [CompatDifference],
    pub duplicate_identities: usize,
}

/// Walks a realized assembly set and applies a rule runner to every node.
pub struct ApiComparer {
    runner: RuleRunner,
}

impl ApiComparer {
    #[must_use]
    pub fn new(runner: RuleRunner) -> Self {
        Self { runner }
    }

    #[must_use]
    pub fn runner(&self) -> &RuleRunner {
        &self.runner
    }

    /// Realize `set` if needed and compare every node.
    pub fn compare(&self, set: &AssemblySetMapper) -> Result<ComparisonOutcome, CompatError> {
        self.compare_with(set, &mut |_| {})
    }

    /// Like [`compare`](Self::compare), calling `observer` once per visited node.
    pub fn compare_with(
        &self,
        set: &AssemblySetMapper,
        observer: &mut dyn FnMut(&NodeVisit<'_>),
    ) -> Result<ComparisonOutcome, CompatError> {
        let mut outcome = ComparisonOutcome::default();
        for assembly in set.get_assemblies() {
            outcome.absorb(self.compare_subtree(assembly, 0, observer)?);
        }
        Ok(outcome)
    }

    /// Compare one node and everything below it.
    pub fn compare_node(&self, node: &ElementMapper) -> Result<ComparisonOutcome, CompatError> {
        self.compare_subtree(node, 0, &mut |_| {})
    }

    /// Same output as [`compare`](Self::compare); assemblies are spread over
    /// scoped worker threads and merged back in realized order.
    pub fn compare_parallel(&self, set: &AssemblySetMapper) -> Result<ComparisonOutcome, CompatError> {
        let assemblies = set.get_assemblies();
        if assemblies.len() <= 1 {
            return self.compare(set);
        }

        let workers = std::thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .min(assemblies.len());
        let table: Mutex<Vec<Option<Result<ComparisonOutcome, CompatError>>>> =
            Mutex::new((0..assemblies.len()).map(|_| None).collect());

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let table = &table;
                scope.spawn(move || {
                    let assigned = assemblies.iter().enumerate().skip(worker).step_by(workers);
                    for (position, assembly) in assigned {
                        let result = self.compare_node(assembly);
                        table.lock()[position] = Some(result);
                    }
                });
            }
        });

        let mut outcome = ComparisonOutcome::default();
        for result in table.into_inner().into_iter().flatten() {
            outcome.absorb(result?);
        }
        Ok(outcome)
    }

    fn compare_subtree(
        &self,
        root: &ElementMapper,
        root_depth: usize,
        observer: &mut dyn FnMut(&NodeVisit<'_>),
    ) -> Result<ComparisonOutcome, CompatError> {
        let mut outcome = ComparisonOutcome::default();
        let mut pending: Vec<(&ElementMapper, usize)> = vec![(root, root_depth)];

        while let Some((node, depth)) = pending.pop() {
            let differences = self.runner.run(node)?;
            let duplicates = node.duplicate_identities();
            observer(&NodeVisit {
                node,
                depth,
                differences: &differences,
                duplicate_identities: duplicates,
            });

            outcome.nodes_visited += 1;
            outcome.duplicate_identities += duplicates;
            outcome.differences.extend(differences);

            pending.extend(
                node.children()
                    .iter()
                    .rev()
                    .map(|child| (Arc::as_ref(child), depth + 1)),
            );
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difference::{DifferenceType, Severity};
    use crate::element::{ApiElement, ElementSide};
    use crate::error::RuleError;
    use crate::rules::{FnRule, RuleContext};

    fn missing_on_right() -> FnRule<impl Fn(&RuleContext<'_>) -> Result<Vec<CompatDifference>, RuleError> + Send + Sync> {
        FnRule::new("Missing", |cx: &RuleContext<'_>| {
            if cx.left.is_some() && cx.right.is_none() {
                Ok(vec![CompatDifference::new(
                    "Missing",
                    cx.right_index,
                    cx.element_path(),
                    "T0001",
                    "missing",
                    Severity::Error,
                    DifferenceType::Removed,
                )])
            } else {
                Ok(Vec::new())
            }
        })
    }

    fn library(types: &[&str]) -> ApiElement {
        ApiElement::assembly("Lib").with_child(
            ApiElement::namespace("Lib.Ns").with_children(types.iter().map(|t| {
                ApiElement::ty(format!("Lib.Ns.{t}"))
                    .with_child(ApiElement::member(format!("Lib.Ns.{t}.Run()")))
            })),
        )
    }

    fn set_of(left: Vec<ApiElement>, right: Vec<ApiElement>) -> AssemblySetMapper {
        let mut set = AssemblySetMapper::new(MapperSettings::default(), 1).unwrap();
        set.add_element(left.into_iter().map(ApiElement::into_ref), ElementSide::Left)
            .unwrap();
        set.add_element(right.into_iter().map(ApiElement::into_ref), ElementSide::Right(0))
            .unwrap();
        set
    }

    #[test]
    fn walk_is_parent_first_in_first_seen_order() {
        let set = set_of(vec![library(&["A", "B"])], vec![library(&["B"])]);
        let comparer = ApiComparer::new(RuleRunner::default());
        let mut visited = Vec::new();
        let outcome = comparer
            .compare_with(&set, &mut |visit| {
                visited.push((visit.node.qualified_name().to_string(), visit.depth));
            })
            .unwrap();

        let expected = vec![
            ("Lib".to_string(), 0),
            ("Lib.Ns".to_string(), 1),
            ("Lib.Ns.A".to_string(), 2),
            ("Lib.Ns.A.Run()".to_string(), 3),
            ("Lib.Ns.B".to_string(), 2),
            ("Lib.Ns.B.Run()".to_string(), 3),
        ];
        assert_eq!(visited, expected);
        assert_eq!(outcome.nodes_visited, 6);
    }

    #[test]
    fn differences_follow_visitation_order() {
        let set = set_of(vec![library(&["A", "B", "C"])], vec![library(&["B"])]);
        let comparer = ApiComparer::new(RuleRunner::default().with_rule(missing_on_right()));
        let outcome = comparer.compare(&set).unwrap();
        let paths: Vec<&str> = outcome
            .differences
            .iter()
            .map(|d| d.element_path.as_str())
            .collect();
        assert_eq!(
            paths,
            vec!["Lib.Ns.A", "Lib.Ns.A.Run()", "Lib.Ns.C", "Lib.Ns.C.Run()"]
        );
        assert!(outcome.has_actionable(set.settings()));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let set = set_of(vec![library(&["A", "B"])], vec![library(&["C"])]);
        let comparer = ApiComparer::new(RuleRunner::default().with_rule(missing_on_right()));
        let first = comparer.compare(&set).unwrap();
        let second = comparer.compare(&set).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parallel_walk_matches_sequential_walk() {
        let left: Vec<ApiElement> = (0..6)
            .map(|i| library(&["A", "B"]).with_child(ApiElement::namespace(format!("Extra{i}"))))
            .collect();
        let right: Vec<ApiElement> = (0..4).map(|_| library(&["B"])).collect();
        let set = set_of(left, right);
        let comparer = ApiComparer::new(RuleRunner::default().with_rule(missing_on_right()));
        let sequential = comparer.compare(&set).unwrap();
        let parallel = comparer.compare_parallel(&set).unwrap();
        assert_eq!(sequential, parallel);
        assert!(!parallel.differences.is_empty());
    }

    #[test]
    fn rule_failure_stops_the_walk() {
        let set = set_of(vec![library(&["A"])], vec![library(&["A"])]);
        let comparer = ApiComparer::new(RuleRunner::default().with_rule(FnRule::new(
            "Fails",
            |cx: &RuleContext<'_>| {
                if cx.node.kind() == crate::element::ElementKind::Member {
                    Err(RuleError::new("boom"))
                } else {
                    Ok(Vec::new())
                }
            },
        )));
        let err = comparer.compare(&set).unwrap_err();
        assert!(matches!(err, CompatError::RuleFailed { ref rule_id, .. } if rule_id == "Fails"));
        assert!(comparer.compare_parallel(&set).is_err());
    }

    #[test]
    fn informational_findings_are_not_actionable() {
        let outcome = ComparisonOutcome {
            differences: vec![CompatDifference::new(
                "Added",
                0,
                "Lib.Ns.New",
                "T0010",
                "added",
                Severity::Info,
                DifferenceType::Added,
            )],
            nodes_visited: 1,
            duplicate_identities: 0,
        };
        let settings = MapperSettings::default();
        assert!(!outcome.has_actionable(&settings));
        assert_eq!(outcome.actionable(&settings).count(), 0);
    }
}

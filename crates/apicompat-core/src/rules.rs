//! Rule contract and the runner that applies rules to one mapper node.

use crate::difference::CompatDifference;
use crate::element::ElementRef;
use crate::error::{CompatError, RuleError};
use crate::mapper::ElementMapper;
use crate::settings::MapperSettings;

/// Inputs for one rule evaluation: a node and one of its right slots.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// The node under evaluation. Rules may read its children but cannot mutate it.
    pub node: &'a ElementMapper,
    pub left: Option<&'a ElementRef>,
    pub right: Option<&'a ElementRef>,
    pub right_index: usize,
    pub settings: &'a MapperSettings,
}

impl<'a> RuleContext<'a> {
    #[must_use]
    pub fn new(node: &'a ElementMapper, right_index: usize) -> Self {
        Self {
            node,
            left: node.left(),
            right: node.right_at(right_index),
            right_index,
            settings: node.settings(),
        }
    }

    /// Qualified name used as the element path of emitted differences.
    #[must_use]
    pub fn element_path(&self) -> &'a str {
        self.node.qualified_name()
    }

    /// Returns true if this right index is the configured reference candidate.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.settings.reference_right == Some(self.right_index)
    }
}

/// A pure compatibility check over one aligned left/right pair.
///
/// Implementations must not keep mutable state between calls and must not
/// depend on the order in which sibling nodes are visited.
pub trait Rule: Send + Sync {
    /// Stable rule identifier, copied into every emitted difference.
    fn id(&self) -> &str;

    fn evaluate(&self, cx: &RuleContext<'_>) -> Result<Vec<CompatDifference>, RuleError>;
}

/// Adapter turning a closure into a [`Rule`].
pub struct FnRule<F> {
    id: String,
    check: F,
}

impl<F> FnRule<F>
where
    F: Fn(&RuleContext<'_>) -> Result<Vec<CompatDifference>, RuleError> + Send + Sync,
{
    #[must_use]
    pub fn new(id: impl Into<String>, check: F) -> Self {
        Self {
            id: id.into(),
            check,
        }
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&RuleContext<'_>) -> Result<Vec<CompatDifference>, RuleError> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluate(&self, cx: &RuleContext<'_>) -> Result<Vec<CompatDifference>, RuleError> {
        (self.check)(cx)
    }
}

/// Ordered list of rules applied to each node.
#[derive(Default)]
pub struct RuleRunner {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRunner {
    #[must_use]
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Append a rule; it runs after every rule already registered.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.iter().map(|rule| rule.id())
    }

    /// Evaluate every rule against every right index of `node`.
    ///
    /// Output is grouped by right index; within one index, rules appear in
    /// registration order. The first failing rule aborts the run.
    pub fn run(&self, node: &ElementMapper) -> Result<Vec<CompatDifference>, CompatError> {
        let mut differences = Vec::new();
        for right_index in 0..node.right_count() {
            differences.extend(self.run_for(node, right_index)?);
        }
        Ok(differences)
    }

    /// Same output as [`run`](Self::run), with right indices evaluated on scoped threads.
    pub fn run_concurrent(&self, node: &ElementMapper) -> Result<Vec<CompatDifference>, CompatError> {
        let per_index: Vec<Result<Vec<CompatDifference>, CompatError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..node.right_count())
                .map(|right_index| scope.spawn(move || self.run_for(node, right_index)))
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut differences = Vec::new();
        for result in per_index {
            differences.extend(result?);
        }
        Ok(differences)
    }

    /// Evaluate every rule for a single right index.
    pub fn run_for(
        &self,
        node: &ElementMapper,
        right_index: usize,
    ) -> Result<Vec<CompatDifference>, CompatError> {
        let cx = RuleContext::new(node, right_index);
        let mut differences = Vec::new();
        for rule in &self.rules {
            let emitted = rule.evaluate(&cx).map_err(|err| CompatError::RuleFailed {
                rule_id: rule.id().to_string(),
                element_path: cx.element_path().to_string(),
                message: err.to_string(),
            })?;
            differences.extend(emitted);
        }
        Ok(differences)
    }
}

//! # apicompat-core
//!
//! Mapping and rule-execution engine for API compatibility checks.
//!
//! A baseline ("left") API surface is compared against one or more candidate
//! ("right") surfaces:
//! - [`AssemblySetMapper`] collects top-level elements in batches and aligns
//!   them by position.
//! - [`ElementMapper`] aligns children by identity, lazily and exactly once.
//! - [`RuleRunner`] applies an ordered list of [`Rule`]s to each node.
//! - [`ApiComparer`] walks the mapped tree depth-first and collects
//!   [`CompatDifference`]s in a deterministic order.
//!
//! The engine does not interpret language semantics. Elements are opaque
//! named nodes with a kind and children, supplied through the [`Element`]
//! trait.

#![forbid(unsafe_code)]

pub mod assembly_set;
pub mod comparer;
pub mod difference;
pub mod element;
pub mod error;
pub mod mapper;
pub mod rules;
pub mod settings;

pub use assembly_set::AssemblySetMapper;
pub use comparer::{ApiComparer, ComparisonOutcome, NodeVisit};
pub use difference::{CompatDifference, DifferenceType, Severity};
pub use element::{ApiElement, Element, ElementKind, ElementRef, ElementSide};
pub use error::{CompatError, RuleError};
pub use mapper::ElementMapper;
pub use rules::{FnRule, Rule, RuleContext, RuleRunner};
pub use settings::MapperSettings;

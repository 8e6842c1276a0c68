//! Comparison harness for apicompat.
//!
//! This crate provides:
//! - Surface files: JSON symbol provider for one side of a comparison
//! - Rule catalog: the built-in compatibility rules, selectable by id
//! - Configuration: JSON config file plus the `APICOMPAT_MODE` override
//! - Runner: loads surfaces, maps them and applies the rules
//! - Report generation: machine-readable JSON + markdown summaries
//! - Structured logging: JSONL run events and their validator

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod report;
pub mod rules;
pub mod runner;
pub mod structured_log;
pub mod surface;

pub use config::{CompatMode, HarnessConfig};
pub use error::HarnessError;
pub use report::{CompatReport, Verdict};
pub use runner::{CompatRunner, NamedSurface};
pub use surface::SurfaceFile;

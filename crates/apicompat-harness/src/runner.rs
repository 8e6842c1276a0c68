//! End-to-end comparison runs.
//!
//! A run loads one baseline surface and one or more candidate surfaces,
//! registers them with an [`AssemblySetMapper`], walks the mapped tree with
//! the configured rules and turns the outcome into a [`CompatReport`].
//! Progress is written to a [`LogEmitter`] as JSONL events.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use apicompat_core::{
    ApiComparer, AssemblySetMapper, ComparisonOutcome, ElementMapper, ElementSide, MapperSettings,
    RuleRunner,
};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::report::{CompatReport, ReportContext};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, now_utc};
use crate::surface::SurfaceFile;

/// A surface together with the name it is reported under.
#[derive(Debug, Clone)]
pub struct NamedSurface {
    pub name: String,
    pub surface: SurfaceFile,
}

impl NamedSurface {
    /// Load a surface file; the name comes from the file or its stem.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let surface = SurfaceFile::from_file(path)?;
        Ok(Self {
            name: surface.display_name(path),
            surface,
        })
    }

    #[must_use]
    pub fn new(name: impl Into<String>, surface: SurfaceFile) -> Self {
        Self {
            name: name.into(),
            surface,
        }
    }
}

/// Drives one comparison from surfaces to report.
#[derive(Debug, Clone, Default)]
pub struct CompatRunner {
    config: HarnessConfig,
    generated_utc: Option<String>,
}

impl CompatRunner {
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            generated_utc: None,
        }
    }

    /// Pin the report timestamp (for reproducible reports).
    #[must_use]
    pub fn with_timestamp(mut self, generated_utc: impl Into<String>) -> Self {
        self.generated_utc = Some(generated_utc.into());
        self
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Load `left` and every path in `right`, then compare.
    pub fn run_files(
        &self,
        left: &Path,
        right: &[PathBuf],
        log: &mut LogEmitter,
    ) -> Result<CompatReport, HarnessError> {
        let left = NamedSurface::load(left)?;
        let right = right
            .iter()
            .map(|path| NamedSurface::load(path))
            .collect::<Result<Vec<_>, _>>()?;
        self.run(left, right, log)
    }

    /// Compare `left` against every surface in `right`.
    ///
    /// Configured side names win over surface names.
    pub fn run(
        &self,
        left: NamedSurface,
        right: Vec<NamedSurface>,
        log: &mut LogEmitter,
    ) -> Result<CompatReport, HarnessError> {
        let started = Instant::now();
        let settings = self.effective_settings(&left, &right);
        let mode = self.config.mode();
        let rules = self.config.build_rules()?;
        let rule_ids: Vec<String> = rules.iter().map(|rule| rule.id().to_string()).collect();

        log.emit_entry(
            LogEntry::new("", LogLevel::Info, "comparison_start")
                .with_mode(mode_str(mode.is_strict()))
                .with_details(serde_json::json!({
                    "left": settings.left_name,
                    "right": settings.right_names,
                    "rules": rule_ids,
                    "parallel": self.config.parallel,
                })),
        )?;

        let mut set = AssemblySetMapper::new(settings, right.len())?;
        set.add_element(left.surface.into_batch(), ElementSide::Left)?;
        for (index, candidate) in right.into_iter().enumerate() {
            set.add_element(candidate.surface.into_batch(), ElementSide::Right(index))?;
        }

        let assemblies = set.get_assemblies().len();
        log.emit_entry(
            LogEntry::new("", LogLevel::Debug, "assemblies_realized").with_details(serde_json::json!({
                "assemblies": assemblies,
                "left": set.left().len(),
                "right": set.right().iter().map(Vec::len).collect::<Vec<_>>(),
            })),
        )?;

        let comparer = ApiComparer::new(RuleRunner::new(rules));

        let result = self.compare(&comparer, &set, log);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                log.emit_entry(
                    LogEntry::new("", LogLevel::Error, "comparison_end")
                        .with_mode(mode_str(mode.is_strict()))
                        .with_outcome(Outcome::Error)
                        .with_duration_ms(elapsed_ms(started))
                        .with_details(serde_json::json!({ "error": err.to_string() })),
                )?;
                log.flush()?;
                return Err(err);
            }
        };

        for difference in &outcome.differences {
            let level = if set.settings().is_actionable(difference.severity) {
                LogLevel::Warn
            } else {
                LogLevel::Info
            };
            log.emit_entry(
                LogEntry::new("", level, "difference")
                    .with_element(&difference.element_path, Some(difference.right_index))
                    .with_finding(&difference.rule_id, &difference.code, difference.severity)
                    .with_details(serde_json::json!({ "message": difference.message })),
            )?;
        }

        let report = CompatReport::build(
            &outcome,
            ReportContext {
                settings: set.settings(),
                right_count: set.right_count(),
                assemblies,
                rules: rule_ids,
                generated_utc: self.generated_utc.clone().unwrap_or_else(now_utc),
            },
        )?;

        log.emit_entry(
            LogEntry::new("", LogLevel::Info, "comparison_end")
                .with_mode(mode_str(mode.is_strict()))
                .with_outcome(if report.is_compatible() {
                    Outcome::Pass
                } else {
                    Outcome::Fail
                })
                .with_duration_ms(elapsed_ms(started))
                .with_details(serde_json::json!({
                    "differences": report.summary.total,
                    "actionable": report.summary.actionable,
                    "nodes_visited": report.summary.nodes_visited,
                    "duplicate_identities": report.summary.duplicate_identities,
                    "differences_sha256": report.differences_sha256,
                })),
        )?;
        log.flush()?;
        Ok(report)
    }

    fn effective_settings(&self, left: &NamedSurface, right: &[NamedSurface]) -> MapperSettings {
        let mut settings = self.config.settings.clone();
        if settings.left_name == MapperSettings::default().left_name {
            settings.left_name.clone_from(&left.name);
        }
        if settings.right_names.is_empty() {
            settings.right_names = right.iter().map(|candidate| candidate.name.clone()).collect();
        }
        settings
    }

    /// Both modes log every node that had duplicate identities, in walk order.
    fn compare(
        &self,
        comparer: &ApiComparer,
        set: &AssemblySetMapper,
        log: &mut LogEmitter,
    ) -> Result<ComparisonOutcome, HarnessError> {
        let (outcome, duplicates) = if self.config.parallel {
            (comparer.compare_parallel(set)?, duplicate_sites(set))
        } else {
            let mut duplicates: Vec<(String, usize)> = Vec::new();
            let outcome = comparer.compare_with(set, &mut |visit| {
                if visit.duplicate_identities > 0 {
                    duplicates.push((visit.node.qualified_name().to_string(), visit.duplicate_identities));
                }
            })?;
            (outcome, duplicates)
        };
        for (path, count) in duplicates {
            log.emit_entry(
                LogEntry::new("", LogLevel::Warn, "duplicate_identity")
                    .with_element(path, None)
                    .with_details(serde_json::json!({ "count": count })),
            )?;
        }
        Ok(outcome)
    }
}

// Pre-order over an already realized tree, matching the sequential walk.
fn duplicate_sites(set: &AssemblySetMapper) -> Vec<(String, usize)> {
    let mut sites = Vec::new();
    let mut pending: Vec<&ElementMapper> = set.get_assemblies().iter().rev().map(Arc::as_ref).collect();
    while let Some(node) = pending.pop() {
        let count = node.duplicate_identities();
        if count > 0 {
            sites.push((node.qualified_name().to_string(), count));
        }
        pending.extend(node.children().iter().rev().map(Arc::as_ref));
    }
    sites
}

fn mode_str(strict: bool) -> &'static str {
    if strict { "strict" } else { "default" }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

//! Comparison report generation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use apicompat_core::{CompatDifference, ComparisonOutcome, MapperSettings, Severity};

pub const REPORT_SCHEMA_VERSION: &str = "v1";

/// Overall verdict of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// No actionable differences.
    Compatible,
    /// At least one actionable difference.
    Breaking,
}

/// Aggregate counts for a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub verdict: Verdict,
    pub total: usize,
    pub actionable: usize,
    pub informational: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_code: BTreeMap<String, usize>,
    /// Difference count per candidate, indexed like the right sides.
    pub by_right: Vec<usize>,
    pub assemblies: usize,
    pub nodes_visited: usize,
    pub duplicate_identities: usize,
}

/// Machine-readable comparison report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatReport {
    pub schema_version: String,
    pub generated_utc: String,
    pub mode: String,
    pub left: String,
    pub right: Vec<String>,
    pub rules: Vec<String>,
    pub summary: ReportSummary,
    /// SHA-256 over the canonical JSON of `differences`.
    pub differences_sha256: String,
    pub differences: Vec<CompatDifference>,
}

/// Inputs describing the run, as opposed to its findings.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub settings: &'a MapperSettings,
    pub right_count: usize,
    pub assemblies: usize,
    pub rules: Vec<String>,
    pub generated_utc: String,
}

impl CompatReport {
    /// Build a report from a comparison outcome.
    pub fn build(outcome: &ComparisonOutcome, cx: ReportContext<'_>) -> Result<Self, serde_json::Error> {
        let settings = cx.settings;
        let mut by_severity: BTreeMap<String, usize> = [Severity::Error, Severity::Warning, Severity::Info]
            .iter()
            .map(|severity| (severity.to_string(), 0))
            .collect();
        let mut by_code: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_right = vec![0; cx.right_count];
        let mut actionable = 0;

        for difference in &outcome.differences {
            *by_severity.entry(difference.severity.to_string()).or_default() += 1;
            *by_code.entry(difference.code.clone()).or_default() += 1;
            if let Some(count) = by_right.get_mut(difference.right_index) {
                *count += 1;
            }
            if settings.is_actionable(difference.severity) {
                actionable += 1;
            }
        }

        let total = outcome.differences.len();
        let summary = ReportSummary {
            verdict: if actionable == 0 {
                Verdict::Compatible
            } else {
                Verdict::Breaking
            },
            total,
            actionable,
            informational: total - actionable,
            by_severity,
            by_code,
            by_right,
            assemblies: cx.assemblies,
            nodes_visited: outcome.nodes_visited,
            duplicate_identities: outcome.duplicate_identities,
        };

        Ok(Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_utc: cx.generated_utc,
            mode: if settings.strict_mode { "strict" } else { "default" }.to_string(),
            left: settings.left_name.clone(),
            right: (0..cx.right_count)
                .map(|index| settings.right_name(index).into_owned())
                .collect(),
            rules: cx.rules,
            summary,
            differences_sha256: differences_digest(&outcome.differences)?,
            differences: outcome.differences.clone(),
        })
    }

    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.summary.verdict == Verdict::Compatible
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Human-readable markdown rendering.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# API Compatibility Report\n\n");
        out.push_str(&format!("- Generated: {}\n", self.generated_utc));
        out.push_str(&format!("- Mode: {}\n", self.mode));
        out.push_str(&format!("- Baseline: {}\n", self.left));
        out.push_str(&format!("- Candidates: {}\n", self.right.join(", ")));
        out.push_str(&format!("- Rules: {}\n", self.rules.join(", ")));
        out.push_str(&format!(
            "- Verdict: **{}**\n\n",
            match self.summary.verdict {
                Verdict::Compatible => "compatible",
                Verdict::Breaking => "breaking",
            }
        ));

        out.push_str("## Summary\n\n");
        out.push_str("| Metric | Value |\n|--------|-------|\n");
        out.push_str(&format!("| Differences | {} |\n", self.summary.total));
        out.push_str(&format!("| Actionable | {} |\n", self.summary.actionable));
        out.push_str(&format!("| Informational | {} |\n", self.summary.informational));
        out.push_str(&format!("| Assemblies | {} |\n", self.summary.assemblies));
        out.push_str(&format!("| Nodes visited | {} |\n", self.summary.nodes_visited));
        out.push_str(&format!(
            "| Duplicate identities | {} |\n\n",
            self.summary.duplicate_identities
        ));

        if self.differences.is_empty() {
            out.push_str("No differences found.\n");
            return out;
        }

        for (index, name) in self.right.iter().enumerate() {
            let rows: Vec<&CompatDifference> = self
                .differences
                .iter()
                .filter(|difference| difference.right_index == index)
                .collect();
            if rows.is_empty() {
                continue;
            }
            out.push_str(&format!("## {name}\n\n"));
            out.push_str("| Severity | Code | Element | Message |\n");
            out.push_str("|----------|------|---------|---------|\n");
            for difference in rows {
                out.push_str(&format!(
                    "| {} | {} | `{}` | {} |\n",
                    difference.severity,
                    difference.code,
                    difference.element_path,
                    difference.message.replace('|', "\\|")
                ));
            }
            out.push('\n');
        }
        out
    }
}

/// Lowercase hex SHA-256 of the canonical JSON encoding of `differences`.
pub fn differences_digest(differences: &[CompatDifference]) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(differences)?;
    Ok(hex_lower(&Sha256::digest(&canonical)))
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(&mut out, "{b:02x}").expect("writing to String should not fail");
    }
    out
}

//! Harness configuration.
//!
//! Settings come from an optional JSON config file; the `APICOMPAT_MODE`
//! environment variable then selects the comparison mode:
//! - `default` (default): only removals and changes are reported.
//! - `strict`: rules may also report additions.

use std::path::Path;

use serde::{Deserialize, Serialize};

use apicompat_core::{MapperSettings, Rule};

use crate::error::HarnessError;
use crate::rules;

/// Environment variable overriding the comparison mode.
pub const MODE_ENV: &str = "APICOMPAT_MODE";

/// Comparison mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatMode {
    #[default]
    Default,
    Strict,
}

impl CompatMode {
    /// Parse from string (case-insensitive). Unknown values fall back to `Default`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" | "full" | "additions" => Self::Strict,
            _ => Self::Default,
        }
    }

    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// Configuration for one harness run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Mapper settings threaded through the whole tree.
    pub settings: MapperSettings,
    /// Rule ids to run, in order. `None` runs the default catalog.
    pub rules: Option<Vec<String>>,
    /// Spread assemblies over worker threads.
    pub parallel: bool,
}

impl HarnessConfig {
    /// Load configuration from JSON string.
    pub fn from_json(json: &str) -> Result<Self, HarnessError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|source| HarnessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Serialize configuration to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Apply a mode override, typically the value of [`MODE_ENV`].
    #[must_use]
    pub fn with_mode_override(mut self, raw: Option<&str>) -> Self {
        if let Some(raw) = raw {
            self.settings.strict_mode = CompatMode::from_str_loose(raw).is_strict();
        }
        self
    }

    /// Apply the [`MODE_ENV`] environment variable if it is set.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        let raw = std::env::var(MODE_ENV).ok();
        self.with_mode_override(raw.as_deref())
    }

    #[must_use]
    pub fn mode(&self) -> CompatMode {
        if self.settings.strict_mode {
            CompatMode::Strict
        } else {
            CompatMode::Default
        }
    }

    /// Instantiate the configured rules.
    pub fn build_rules(&self) -> Result<Vec<Box<dyn Rule>>, HarnessError> {
        match &self.rules {
            Some(ids) if ids.is_empty() => Err(HarnessError::Config(
                "rule list is empty; omit it to run the default catalog".to_string(),
            )),
            Some(ids) => rules::rules_by_id(ids),
            None => Ok(rules::default_rules()),
        }
    }
}

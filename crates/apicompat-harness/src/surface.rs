//! API surface files: the JSON symbol provider.
//!
//! A surface file lists the assemblies of one side of a comparison:
//!
//! ```json
//! { "version": "v1", "name": "net8.0", "assemblies": [
//!     { "name": "Lib", "kind": "assembly", "children": [ ... ] } ] }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use apicompat_core::{ApiElement, ElementKind, ElementRef};

use crate::error::HarnessError;

pub const SURFACE_VERSION: &str = "v1";

/// One side of a comparison, as loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceFile {
    /// Schema version.
    pub version: String,
    /// Display name for the side (target framework, build flavor, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Top-level elements, in the order that defines positional matching.
    pub assemblies: Vec<ApiElement>,
}

impl SurfaceFile {
    /// Parse and validate a surface from JSON. `origin` names the source in errors.
    pub fn from_json(json: &str, origin: &str) -> Result<Self, HarnessError> {
        let surface: Self = serde_json::from_str(json)?;
        surface.validate(origin)?;
        Ok(surface)
    }

    /// Load a surface from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|source| HarnessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Name to show for this side, falling back to the file stem of `path`.
    #[must_use]
    pub fn display_name(&self, path: &Path) -> String {
        self.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
        })
    }

    /// Total number of elements across every assembly.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.assemblies.iter().map(ApiElement::subtree_len).sum()
    }

    /// Hand the assemblies over as a registration batch.
    #[must_use]
    pub fn into_batch(self) -> Vec<ElementRef> {
        self.assemblies
            .into_iter()
            .map(|assembly| Arc::new(assembly) as ElementRef)
            .collect()
    }

    fn validate(&self, origin: &str) -> Result<(), HarnessError> {
        let invalid = |message: String| HarnessError::InvalidSurface {
            origin: origin.to_string(),
            message,
        };
        if self.version != SURFACE_VERSION {
            return Err(invalid(format!(
                "unsupported version '{}', expected '{SURFACE_VERSION}'",
                self.version
            )));
        }
        for assembly in &self.assemblies {
            if assembly.kind != ElementKind::Assembly {
                return Err(invalid(format!(
                    "top-level element '{}' is a {}, expected an assembly",
                    assembly.name, assembly.kind
                )));
            }
            if assembly.name.trim().is_empty() {
                return Err(invalid("assembly with empty name".to_string()));
            }
        }
        Ok(())
    }
}

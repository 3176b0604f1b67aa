//! Import configuration

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Base name used when the caller does not supply one
pub const DEFAULT_MODEL_NAME: &str = "model";

/// When the importer computes normals from face geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalMode {
    /// Synthesize only when no NORMAL channel is declared
    #[default]
    Auto,
    /// Always synthesize, ignoring supplied normals
    Always,
    /// Never synthesize; missing normals stay zero
    Never,
}

impl NormalMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "auto" => Some(NormalMode::Auto),
            "always" => Some(NormalMode::Always),
            "never" => Some(NormalMode::Never),
            _ => None,
        }
    }
}

/// Options controlling one document import
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Base model name; geometries are numbered when a document holds several
    pub model_name: Option<String>,
    pub normals: NormalMode,
    /// Negate synthesized normals (meshes with reversed winding)
    pub invert_normals: bool,
    /// Treat corners with equal position and texcoords but different normals as distinct vertices
    pub split_normal_seams: bool,
    /// Fan-triangulate polygons after reconciliation
    pub triangulate: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            model_name: None,
            normals: NormalMode::Auto,
            invert_normals: false,
            split_normal_seams: true,
            triangulate: true,
        }
    }
}

impl ImportOptions {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse import options")
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file: {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn base_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL_NAME)
    }

    /// Model name for the geometry at `index` out of `total` in one document
    pub fn model_name_for(&self, index: usize, total: usize) -> String {
        if total > 1 {
            format!("{}{}", self.base_name(), index + 1)
        } else {
            self.base_name().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let options = ImportOptions::from_json_str("{}").unwrap();
        assert_eq!(options, ImportOptions::default());
        assert!(options.triangulate);
        assert!(options.split_normal_seams);
    }

    #[test]
    fn test_partial_json_overrides() {
        let options = ImportOptions::from_json_str(
            r#"{"model_name": "ship", "normals": "always", "invert_normals": true}"#,
        )
        .unwrap();
        assert_eq!(options.base_name(), "ship");
        assert_eq!(options.normals, NormalMode::Always);
        assert!(options.invert_normals);
        assert!(options.triangulate);
    }

    #[test]
    fn test_model_naming() {
        let options = ImportOptions::default();
        assert_eq!(options.model_name_for(0, 1), "model");
        assert_eq!(options.model_name_for(0, 3), "model1");
        assert_eq!(options.model_name_for(2, 3), "model3");
    }

    #[test]
    fn test_normal_mode_parse() {
        assert_eq!(NormalMode::parse("ALWAYS"), Some(NormalMode::Always));
        assert_eq!(NormalMode::parse("sometimes"), None);
    }
}

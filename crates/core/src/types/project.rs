use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::TargetConfiguration;

/// Per-project contribution produced by a plugin's build phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, TargetConfiguration>,
}

/// Sparse graph fragment returned from `create_nodes`, keyed by project
/// root. An empty result means "no contribution", not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateNodesResult {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, ProjectConfiguration>,
}

impl CreateNodesResult {
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// The subset of a `package.json` manifest inference cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: Option<String>,
    /// `None` when the manifest declares no `scripts` block at all; plugins
    /// distinguish that from an empty one.
    pub scripts: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::ConfigError(format!("failed to parse {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_relevant_fields() {
        let manifest: PackageManifest = serde_json::from_str(
            r#"{
                "name": "@acme/web",
                "private": true,
                "scripts": { "build": "next build", "dev": "next dev" },
                "devDependencies": { "next": "^14.0.0" }
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.name.as_deref(), Some("@acme/web"));
        assert_eq!(manifest.scripts.as_ref().unwrap()["build"], "next build");
        assert!(manifest.dev_dependencies.contains_key("next"));
    }

    #[test]
    fn absent_scripts_block_is_distinguishable_from_an_empty_one() {
        let without: PackageManifest = serde_json::from_str(r#"{"name":"web"}"#).unwrap();
        assert!(without.scripts.is_none());

        let empty: PackageManifest =
            serde_json::from_str(r#"{"name":"web","scripts":{}}"#).unwrap();
        assert_eq!(empty.scripts, Some(BTreeMap::new()));
    }

    #[test]
    fn empty_result_is_no_contribution() {
        let result = CreateNodesResult::default();
        assert!(result.is_empty());
        assert_eq!(serde_json::to_string(&result).unwrap(), "{}");
    }
}

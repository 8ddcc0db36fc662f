use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// A named, executable task synthesized for an inferred project.
///
/// This is the wire shape persisted in the target cache and handed to the
/// graph-assembly layer, so field names serialize as camelCase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<TargetOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<TargetInput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TargetDependency>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configurations: BTreeMap<String, TargetConfiguration>,
}

impl TargetConfiguration {
    /// A target flagged `cache: true` must declare what affects it and what
    /// it produces; an uncharacterized cacheable target is a contract
    /// violation on the plugin's side.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.cache == Some(true) && (self.inputs.is_empty() || self.outputs.is_empty()) {
            return Err(Error::ConfigError(format!(
                "target \"{name}\" is cacheable but does not declare both inputs and outputs"
            )));
        }
        Ok(())
    }
}

/// Execution options for a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl TargetOptions {
    pub fn cwd<S: Into<String>>(cwd: S) -> Self {
        Self {
            cwd: Some(cwd.into()),
            env: BTreeMap::new(),
        }
    }
}

/// A declared input: either a named input / file-set reference, or a set of
/// external dependencies whose resolved versions fingerprint the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum TargetInput {
    Named(String),
    #[serde(rename_all = "camelCase")]
    ExternalDependencies {
        external_dependencies: Vec<String>,
    },
}

impl From<&str> for TargetInput {
    fn from(value: &str) -> Self {
        TargetInput::Named(value.to_string())
    }
}

/// A `dependsOn` edge: either a bare target name (same or upstream project)
/// or the explicit object form used for same-project fan-out edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetDependency {
    Target(String),
    Spec {
        target: String,
        projects: String,
        params: String,
    },
}

impl TargetDependency {
    /// Edge to a target on the same project, forwarding CLI params.
    pub fn on_self<S: Into<String>>(target: S) -> Self {
        TargetDependency::Spec {
            target: target.into(),
            projects: "self".to_string(),
            params: "forward".to_string(),
        }
    }
}

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use gantry_core::ConfigLoader;

pub const WORKSPACE_CONFIG_FILE: &str = "gantry.json";

/// Workspace-level settings read from an optional `gantry.json` at the
/// workspace root. Every field defaults, so an absent or empty file is
/// equivalent to no file at all.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkspaceSettings {
    /// Named-input presets (`default`, `production`, ...) shared by all
    /// inferred targets.
    #[serde(default)]
    pub named_inputs: BTreeMap<String, Vec<String>>,

    /// Raw per-plugin options, keyed by plugin name.
    #[serde(default)]
    pub plugins: BTreeMap<String, Value>,
}

impl WorkspaceSettings {
    /// Load settings from `gantry.json` under `workspace_root`, going
    /// through the module loader so comments and trailing commas are
    /// accepted the same way plugin configuration files are.
    pub fn load(workspace_root: &Path) -> Result<Self> {
        if !workspace_root.join(WORKSPACE_CONFIG_FILE).is_file() {
            debug!("no {} found, using defaults", WORKSPACE_CONFIG_FILE);
            return Ok(Self::default());
        }

        let loader = ConfigLoader::new(workspace_root.to_path_buf());
        let value = loader
            .load(WORKSPACE_CONFIG_FILE)
            .with_context(|| format!("failed to load {WORKSPACE_CONFIG_FILE}"))?;
        let settings: WorkspaceSettings = serde_json::from_value(value)
            .with_context(|| format!("invalid {WORKSPACE_CONFIG_FILE}"))?;
        debug!(
            named_inputs = settings.named_inputs.len(),
            plugins = settings.plugins.len(),
            "loaded workspace settings"
        );
        Ok(settings)
    }
}

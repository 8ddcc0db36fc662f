//! Host loop driving plugins through the two-phase protocol.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::inference::workspace::{compile_glob, workspace_files};
use crate::inference::{CreateNodesContext, InferencePlugin};
use crate::types::CreateNodesResult;

/// Runs a full graph-construction pass: one workspace enumeration, one
/// `create_nodes` call per plugin per matched configuration file, one
/// `create_dependencies` call per plugin at the end.
pub struct InferenceHost {
    plugins: Vec<Arc<dyn InferencePlugin>>,
    /// Raw per-plugin options, keyed by plugin name.
    plugin_options: BTreeMap<String, Value>,
}

impl InferenceHost {
    pub fn new(plugins: Vec<Arc<dyn InferencePlugin>>) -> Self {
        Self {
            plugins,
            plugin_options: BTreeMap::new(),
        }
    }

    pub fn with_options(mut self, plugin_options: BTreeMap<String, Value>) -> Self {
        self.plugin_options = plugin_options;
        self
    }

    /// Run the pass and return the merged graph fragment.
    ///
    /// A failing build for one configuration file is reported and skipped;
    /// it never aborts inference for the rest of the workspace. The flush
    /// phase runs exactly once per plugin regardless of build failures.
    pub fn run(&self, context: &CreateNodesContext) -> Result<CreateNodesResult> {
        let files = workspace_files(&context.workspace_root)?;
        debug!(files = files.len(), "enumerated workspace");

        let mut merged = CreateNodesResult::default();

        for plugin in &self.plugins {
            let matcher = compile_glob(plugin.config_glob())?;
            let options = self
                .plugin_options
                .get(plugin.name())
                .cloned()
                .unwrap_or(Value::Null);

            for file in files.iter().filter(|f| matcher.is_match(f)) {
                match plugin.create_nodes(file, &options, context) {
                    Ok(result) => merge_result(&mut merged, result, plugin.name())?,
                    Err(e) => {
                        warn!(
                            plugin = plugin.name(),
                            config_file = %file,
                            error = %e,
                            "inference failed for configuration file; skipping project"
                        );
                    }
                }
            }
        }

        for plugin in &self.plugins {
            plugin.create_dependencies(context)?;
        }

        Ok(merged)
    }
}

/// Fold one plugin contribution into the pass result, enforcing the
/// cacheable-target characterization invariant at the protocol boundary.
fn merge_result(
    merged: &mut CreateNodesResult,
    contribution: CreateNodesResult,
    plugin_name: &str,
) -> Result<()> {
    for (project_root, project) in contribution.projects {
        for (target_name, target) in &project.targets {
            target.validate(target_name)?;
        }
        debug!(
            plugin = plugin_name,
            project_root = %project_root,
            targets = project.targets.len(),
            "merging inferred project"
        );
        let entry = merged.projects.entry(project_root).or_default();
        if project.name.is_some() {
            entry.name = project.name;
        }
        if project.project_type.is_some() {
            entry.project_type = project.project_type;
        }
        entry.targets.extend(project.targets);
    }
    Ok(())
}

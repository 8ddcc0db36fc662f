//! The plugin inference protocol.
//!
//! Each tool plugin implements the two-phase [`InferencePlugin`] contract:
//! `create_nodes` is invoked once per matched configuration file (possibly
//! many times, concurrently, in no guaranteed order) and `create_dependencies`
//! exactly once after all of them settle, to persist the staged target cache.

pub mod host;
pub mod named_inputs;
pub mod package_manager;
pub mod workspace;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::loader::ConfigLoader;
use crate::types::CreateNodesResult;

pub use host::InferenceHost;
pub use named_inputs::default_target_inputs;
pub use package_manager::PackageManager;
pub use workspace::{glob_files, workspace_files};

/// Read-only context handed to every `create_nodes` call.
pub struct CreateNodesContext {
    pub workspace_root: PathBuf,
    /// Named-input presets configured for the workspace (e.g. `default`,
    /// `production`).
    pub named_inputs: BTreeMap<String, Vec<String>>,
    /// Lockfile name of the detected package manager; part of every
    /// plugin's ContentHash.
    pub lock_file_name: String,
    pub loader: Arc<ConfigLoader>,
}

impl CreateNodesContext {
    pub fn new(workspace_root: PathBuf, named_inputs: BTreeMap<String, Vec<String>>) -> Self {
        let lock_file_name = PackageManager::detect(&workspace_root).lock_file_name();
        let loader = Arc::new(ConfigLoader::new(workspace_root.clone()));
        Self {
            workspace_root,
            named_inputs,
            lock_file_name: lock_file_name.to_string(),
            loader,
        }
    }
}

/// Two-phase inference contract implemented once per tool.
pub trait InferencePlugin: Send + Sync {
    /// Stable plugin name; also names the persisted cache file.
    fn name(&self) -> &'static str;

    /// Glob selecting the tool's configuration files during the match
    /// phase.
    fn config_glob(&self) -> &'static str;

    /// Build phase: derive a sparse graph fragment for one matched
    /// configuration file. Must be independently safe to run concurrently
    /// with other invocations.
    fn create_nodes(
        &self,
        config_file_path: &str,
        options: &Value,
        context: &CreateNodesContext,
    ) -> Result<CreateNodesResult>;

    /// Flush phase: persist the staged `{hash -> targets}` accumulation.
    /// Contributes no graph edges.
    fn create_dependencies(&self, context: &CreateNodesContext) -> Result<()>;
}

/// Eligibility check shared by plugins: a configuration file only seeds a
/// project when a package manifest or explicit project descriptor sits next
/// to it. This runs before any loading or hashing so the common "not
/// actually a project" case stays cheap.
pub fn has_project_markers(workspace_root: &Path, project_root: &str) -> bool {
    let dir = workspace_root.join(project_root);
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .filter_map(|e| e.ok())
        .any(|e| matches!(e.file_name().to_str(), Some("package.json" | "project.json")))
}

/// Directory of a workspace-relative configuration file path, `"."` for
/// files at the workspace root.
pub fn project_root_of(config_file_path: &str) -> String {
    match Path::new(config_file_path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.to_string_lossy().into_owned()
        }
        _ => ".".to_string(),
    }
}

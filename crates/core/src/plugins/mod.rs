//! Bundled tool plugins.
//!
//! Each plugin is one concrete instance of the inference protocol; the
//! helpers here cover the rules they share (artifact-path resolution,
//! root-project naming).

pub mod cypress;
pub mod next;

use std::path::Path;

use crate::loader::normalize_path;
use crate::types::PackageManifest;

pub use cypress::{CypressPlugin, CypressPluginOptions};
pub use next::{NextPlugin, NextPluginOptions};

/// Resolve a declared artifact directory to a templated output path.
///
/// Paths are project-root-relative unless they escape the project root
/// (leading `..`), in which case they resolve against the workspace root.
/// Absolute declared paths pass through workspace-rooted, unchanged.
pub fn resolve_output_path(project_root: &str, declared: &str) -> String {
    if declared.starts_with("..") {
        let joined = normalize_path(&Path::new(project_root).join(declared));
        format!("{{workspaceRoot}}/{}", path_str(&joined))
    } else if Path::new(declared).is_absolute() {
        format!("{{workspaceRoot}}{declared}")
    } else {
        let normalized = normalize_path(Path::new(declared));
        format!("{{projectRoot}}/{}", path_str(&normalized))
    }
}

/// Project name for a workspace-root project, where the directory name
/// carries no information: the package manifest's `name`, falling back to
/// the root path string.
pub fn root_project_name(workspace_root: &Path, project_root: &str) -> String {
    PackageManifest::read(&workspace_root.join(project_root).join("package.json"))
        .ok()
        .and_then(|manifest| manifest.name)
        .unwrap_or_else(|| project_root.to_string())
}

/// A workspace-relative path expressed relative to the project root.
pub fn relative_to_project(path: &str, project_root: &str) -> String {
    if project_root == "." {
        return path.to_string();
    }
    path.strip_prefix(&format!("{project_root}/"))
        .unwrap_or(path)
        .to_string()
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

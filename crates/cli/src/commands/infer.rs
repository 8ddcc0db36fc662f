use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use gantry_core::plugins::{CypressPlugin, NextPlugin};
use gantry_core::{CreateNodesContext, InferenceHost, InferencePlugin};

use crate::settings::WorkspaceSettings;

pub const DEFAULT_CACHE_DIR: &str = ".gantry";

pub fn infer_command(
    workspace: &str,
    cache_dir: Option<&str>,
    no_cache: bool,
    pretty: bool,
) -> Result<()> {
    let workspace_root = PathBuf::from(workspace)
        .canonicalize()
        .with_context(|| format!("workspace root not found: {workspace}"))?;
    let cache_dir = resolve_cache_dir(&workspace_root, cache_dir);
    debug!(
        workspace = %workspace_root.display(),
        cache_dir = %cache_dir.display(),
        "starting inference pass"
    );

    if no_cache {
        let discarded = discard_target_caches(&cache_dir)?;
        if discarded > 0 {
            info!(discarded, "discarded cached target files");
        }
    }

    let settings = WorkspaceSettings::load(&workspace_root)?;

    let plugins: Vec<Arc<dyn InferencePlugin>> = vec![
        Arc::new(CypressPlugin::new(&cache_dir)),
        Arc::new(NextPlugin::new(&cache_dir)),
    ];
    let host = InferenceHost::new(plugins).with_options(settings.plugins);
    let context = CreateNodesContext::new(workspace_root, settings.named_inputs);

    let result = host.run(&context)?;
    info!(projects = result.projects.len(), "inference pass complete");

    let output = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");

    Ok(())
}

pub fn resolve_cache_dir(workspace_root: &Path, cache_dir: Option<&str>) -> PathBuf {
    match cache_dir {
        Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
        Some(dir) => workspace_root.join(dir),
        None => workspace_root.join(DEFAULT_CACHE_DIR),
    }
}

/// Remove every persisted `<plugin>-targets.json` file under `cache_dir`,
/// returning how many were removed. A missing directory counts as empty.
pub fn discard_target_caches(cache_dir: &Path) -> Result<usize> {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return Ok(0);
    };

    let mut discarded = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.ends_with("-targets.json") {
            std::fs::remove_file(entry.path())
                .with_context(|| format!("failed to remove {}", entry.path().display()))?;
            debug!(file = name, "removed target cache");
            discarded += 1;
        }
    }
    Ok(discarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cache_dir_defaults_and_resolves_relative_to_workspace() {
        let root = Path::new("/ws");
        assert_eq!(resolve_cache_dir(root, None), Path::new("/ws/.gantry"));
        assert_eq!(
            resolve_cache_dir(root, Some("tmp/cache")),
            Path::new("/ws/tmp/cache")
        );
        assert_eq!(resolve_cache_dir(root, Some("/abs")), Path::new("/abs"));
    }

    #[test]
    fn discard_only_touches_target_cache_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cypress-targets.json"), "{}").unwrap();
        std::fs::write(dir.path().join("next-targets.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let discarded = discard_target_caches(dir.path()).unwrap();
        assert_eq!(discarded, 2);
        assert!(dir.path().join("notes.txt").exists());
        assert!(!dir.path().join("cypress-targets.json").exists());
    }

    #[test]
    fn discard_tolerates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("never-created");
        assert_eq!(discard_target_caches(&missing).unwrap(), 0);
    }
}

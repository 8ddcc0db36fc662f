use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::commands::infer::{discard_target_caches, resolve_cache_dir};

pub fn cache_clear_command(workspace: &str, cache_dir: Option<&str>) -> Result<()> {
    let workspace_root = PathBuf::from(workspace)
        .canonicalize()
        .with_context(|| format!("workspace root not found: {workspace}"))?;
    let cache_dir = resolve_cache_dir(&workspace_root, cache_dir);

    let discarded = discard_target_caches(&cache_dir)?;
    if discarded == 0 {
        println!("No cached targets in {}", cache_dir.display());
    } else {
        println!(
            "Removed {} cached target file(s) from {}",
            discarded,
            cache_dir.display()
        );
    }
    Ok(())
}

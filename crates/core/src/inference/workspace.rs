//! Workspace file enumeration and workspace-aware globbing.

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::Result;

/// Directories never descended into during a workspace scan.
const SKIPPED_DIRECTORIES: &[&str] = &["node_modules", ".yarn", ".git", ".gantry"];

/// Enumerate the workspace tree once, returning sorted workspace-relative
/// file paths with `/` separators.
pub fn workspace_files(workspace_root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(workspace_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| SKIPPED_DIRECTORIES.contains(&name))
                    .unwrap_or(false))
        });

    for entry in walker {
        // An unreadable entry degrades to a skip, like any other per-file
        // failure during a pass.
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable workspace entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(workspace_root) {
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    files.sort();
    Ok(files)
}

/// Workspace-aware glob: files under `workspace_root` matching any include
/// pattern and no exclude pattern. Patterns are workspace-relative globs.
pub fn glob_files(
    workspace_root: &Path,
    include: &[String],
    exclude: &[String],
) -> Result<Vec<String>> {
    let include_set = build_glob_set(include)?;
    let exclude_set = build_glob_set(exclude)?;

    Ok(workspace_files(workspace_root)?
        .into_iter()
        .filter(|file| include_set.is_match(file) && !exclude_set.is_match(file))
        .collect())
}

/// Compile one workspace-relative glob with the matching semantics used
/// everywhere in this crate: `*` stays within a segment, case-sensitive.
pub fn compile_glob(pattern: &str) -> Result<globset::GlobMatcher> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .case_insensitive(false)
        .build()?
        .compile_matcher())
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            GlobBuilder::new(pattern)
                .literal_separator(true)
                .case_insensitive(false)
                .build()?,
        );
    }
    builder.build().map_err(Into::into)
}

//! Package-manager detection.
//!
//! The active manager's lockfile is used purely as an opaque fingerprint:
//! dependency version changes can change inferred behavior even when the
//! tool configuration text does not.

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    /// Detect by lockfile presence, npm as the fallback.
    pub fn detect(workspace_root: &Path) -> Self {
        if workspace_root.join("pnpm-lock.yaml").exists() {
            PackageManager::Pnpm
        } else if workspace_root.join("yarn.lock").exists() {
            PackageManager::Yarn
        } else if workspace_root.join("bun.lockb").exists() {
            PackageManager::Bun
        } else {
            PackageManager::Npm
        }
    }

    pub fn lock_file_name(&self) -> &'static str {
        match self {
            PackageManager::Npm => "package-lock.json",
            PackageManager::Yarn => "yarn.lock",
            PackageManager::Pnpm => "pnpm-lock.yaml",
            PackageManager::Bun => "bun.lockb",
        }
    }
}

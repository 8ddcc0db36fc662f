//! Persistent hash-keyed target cache plus the in-memory staging map.
//!
//! The persisted file is one JSON object per plugin mapping ContentHash to
//! a target map. It is read once at process start and overwritten once at
//! the end of a full graph-construction pass; it is optional state, never a
//! correctness requirement.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::TargetConfiguration;

pub type TargetMap = BTreeMap<String, TargetConfiguration>;

/// Durable store owned exclusively by one plugin instance.
#[derive(Debug)]
pub struct TargetsCache {
    path: PathBuf,
    entries: BTreeMap<String, TargetMap>,
}

impl TargetsCache {
    /// Load the persisted cache. An absent file is an empty cache; an
    /// unreadable or corrupt file degrades to a full miss for the plugin.
    pub fn read(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding corrupt targets cache");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        debug!(path = %path.display(), entries = entries.len(), "loaded targets cache");
        Self { path, entries }
    }

    /// Look up previously computed targets. A hit returns the stored value
    /// verbatim; the caller must skip the build phase entirely.
    pub fn get(&self, hash: &str) -> Option<&TargetMap> {
        self.entries.get(hash)
    }

    /// Persist the staged results merged over whatever this store already
    /// held for hashes not touched this pass. The file is replaced via a
    /// temp-file rename so a reader never observes a torn state.
    pub fn flush(&self, staging: &TargetsStaging) -> Result<()> {
        let staged = staging.snapshot();
        let staged_count = staged.len();
        let mut merged = self.entries.clone();
        merged.extend(staged);

        let parent = self.path.parent().ok_or_else(|| {
            Error::CacheError(format!("cache path {} has no parent", self.path.display()))
        })?;
        std::fs::create_dir_all(parent)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&merged)?)?;
        std::fs::rename(&tmp, &self.path)?;
        info!(
            path = %self.path.display(),
            staged = staged_count,
            total = merged.len(),
            "flushed targets cache"
        );
        Ok(())
    }
}

/// In-memory accumulation of `{hash -> targets}` built up during the build
/// phase. Injected into every `create_nodes` call and committed by exactly
/// one terminal `create_dependencies` call, so independent passes never
/// share state.
#[derive(Debug, Default)]
pub struct TargetsStaging {
    inner: Mutex<BTreeMap<String, TargetMap>>,
}

impl TargetsStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a build result (or a re-observed cache hit, which keeps the
    /// entry alive across passes).
    pub fn record(&self, hash: &str, targets: TargetMap) {
        self.inner
            .lock()
            .expect("targets staging lock poisoned")
            .insert(hash.to_string(), targets);
    }

    pub fn snapshot(&self) -> BTreeMap<String, TargetMap> {
        self.inner
            .lock()
            .expect("targets staging lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn target(command: &str) -> TargetConfiguration {
        TargetConfiguration {
            command: Some(command.to_string()),
            ..Default::default()
        }
    }

    fn target_map(name: &str, command: &str) -> TargetMap {
        BTreeMap::from([(name.to_string(), target(command))])
    }

    fn cache_path(dir: &TempDir) -> PathBuf {
        dir.path().join("cypress-targets.json")
    }

    #[test]
    fn absent_file_is_an_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = TargetsCache::read(cache_path(&dir));
        assert!(cache.get("abc").is_none());
    }

    #[test]
    fn corrupt_file_degrades_to_full_miss() {
        let dir = TempDir::new().unwrap();
        std::fs::write(cache_path(&dir), "{not json").unwrap();
        let cache = TargetsCache::read(cache_path(&dir));
        assert!(cache.get("abc").is_none());
    }

    #[test]
    fn flush_persists_staged_entries() {
        let dir = TempDir::new().unwrap();
        let staging = TargetsStaging::new();
        staging.record("h1", target_map("e2e", "cypress run --e2e"));

        TargetsCache::read(cache_path(&dir)).flush(&staging).unwrap();

        let reloaded = TargetsCache::read(cache_path(&dir));
        let stored = reloaded.get("h1").unwrap();
        assert_eq!(
            stored["e2e"].command.as_deref(),
            Some("cypress run --e2e")
        );
    }

    #[test]
    fn flush_merges_over_untouched_hashes() {
        let dir = TempDir::new().unwrap();

        let first_pass = TargetsStaging::new();
        first_pass.record("h1", target_map("e2e", "cypress run --e2e"));
        TargetsCache::read(cache_path(&dir)).flush(&first_pass).unwrap();

        // Second pass only touches a different hash.
        let second_pass = TargetsStaging::new();
        second_pass.record("h2", target_map("build", "next build"));
        TargetsCache::read(cache_path(&dir)).flush(&second_pass).unwrap();

        let reloaded = TargetsCache::read(cache_path(&dir));
        assert!(reloaded.get("h1").is_some());
        assert!(reloaded.get("h2").is_some());
    }

    #[test]
    fn staged_entry_overwrites_stale_stored_entry() {
        let dir = TempDir::new().unwrap();

        let staging = TargetsStaging::new();
        staging.record("h1", target_map("e2e", "old command"));
        TargetsCache::read(cache_path(&dir)).flush(&staging).unwrap();

        let staging = TargetsStaging::new();
        staging.record("h1", target_map("e2e", "new command"));
        TargetsCache::read(cache_path(&dir)).flush(&staging).unwrap();

        let reloaded = TargetsCache::read(cache_path(&dir));
        assert_eq!(
            reloaded.get("h1").unwrap()["e2e"].command.as_deref(),
            Some("new command")
        );
    }

    #[test]
    fn no_temp_file_left_behind_after_flush() {
        let dir = TempDir::new().unwrap();
        let staging = TargetsStaging::new();
        staging.record("h1", target_map("e2e", "cypress run"));
        TargetsCache::read(cache_path(&dir)).flush(&staging).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "unexpected temp files: {leftovers:?}");
    }
}

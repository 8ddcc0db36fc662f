//! Dynamic configuration loading with safe module-state invalidation.
//!
//! Configuration files may extend other files (workspace-authored or
//! installed presets), so a previously cached evaluation can go stale when
//! any workspace file changes. Re-loading a cached path therefore discards
//! every workspace-authored cached evaluation before evaluating again,
//! while entries under installation directories are left untouched --
//! discarding those can break library-internal singleton state and is
//! wasteful besides.

pub mod evaluator;

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub use evaluator::{
    DocumentEvaluator, JsoncTranspiler, ModuleEvaluator, SourceTranspiler, TranspilerGuard,
    TranspilerRegistry,
};

/// Phase identifier handed to phase-parameterized configurations when
/// deriving build outputs.
pub const PHASE_PRODUCTION_BUILD: &str = "production-build";

/// Path segments that denote an installation directory. Cached evaluations
/// under these are never discarded.
const PACKAGE_INSTALLATION_DIRECTORIES: &[&str] = &["node_modules", ".yarn"];

const MAX_EXTENDS_DEPTH: usize = 16;

/// Loads configuration files as evaluated values, caching evaluations
/// process-wide.
pub struct ConfigLoader {
    workspace_root: PathBuf,
    cache: Mutex<HashMap<PathBuf, Value>>,
    transpilers: Arc<TranspilerRegistry>,
    evaluator: Arc<dyn ModuleEvaluator>,
}

impl ConfigLoader {
    pub fn new(workspace_root: PathBuf) -> Self {
        let transpilers = Arc::new(TranspilerRegistry::new());
        let evaluator = Arc::new(DocumentEvaluator::new(Arc::clone(&transpilers)));
        Self::with_evaluator(workspace_root, transpilers, evaluator)
    }

    /// Construct with a custom evaluator at the same seam the built-in one
    /// occupies.
    pub fn with_evaluator(
        workspace_root: PathBuf,
        transpilers: Arc<TranspilerRegistry>,
        evaluator: Arc<dyn ModuleEvaluator>,
    ) -> Self {
        Self {
            workspace_root,
            cache: Mutex::new(HashMap::new()),
            transpilers,
            evaluator,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Load a configuration file (workspace-relative path), evaluating it
    /// and any `extends` chain, and normalize the result to a plain table.
    pub fn load(&self, config_path: &str) -> Result<Value> {
        let resolved = self.workspace_root.join(config_path);

        // A repeat load of an already-evaluated path means the caller
        // expects on-disk edits to be reflected: drop every
        // workspace-authored evaluation before evaluating again.
        {
            let mut cache = self.cache.lock().expect("module cache lock poisoned");
            if cache.contains_key(&resolved) {
                let before = cache.len();
                cache.retain(|path, _| is_installed_path(path));
                debug!(
                    path = %resolved.display(),
                    evicted = before - cache.len(),
                    "invalidated workspace module cache entries"
                );
            }
        }

        self.evaluate_path(&resolved, 0)
    }

    /// Number of cached evaluations; exposed for host diagnostics.
    pub fn cached_modules(&self) -> usize {
        self.cache.lock().expect("module cache lock poisoned").len()
    }

    fn evaluate_path(&self, resolved: &Path, depth: usize) -> Result<Value> {
        if depth > MAX_EXTENDS_DEPTH {
            return Err(Error::LoadError {
                path: resolved.to_path_buf(),
                message: "extends chain exceeds maximum depth".to_string(),
            });
        }

        if let Some(cached) = self
            .cache
            .lock()
            .expect("module cache lock poisoned")
            .get(resolved)
            .cloned()
        {
            return Ok(cached);
        }

        let source = std::fs::read_to_string(resolved).map_err(|e| Error::LoadError {
            path: resolved.to_path_buf(),
            message: e.to_string(),
        })?;

        // JSON documents are evaluated as JSONC (comments and trailing
        // commas allowed), so the transpiler is registered for the duration
        // of this one evaluation; the guard tears it down on every exit
        // path.
        let _guard = match resolved.extension().and_then(|e| e.to_str()) {
            Some(extension @ ("json" | "jsonc")) => {
                Some(self.transpilers.register(extension, Arc::new(JsoncTranspiler)))
            }
            _ => None,
        };

        let mut value = self.evaluator.evaluate(resolved, &source)?;

        if let Some(base_ref) = value.get("extends").and_then(Value::as_str) {
            let base_path = self.resolve_extends(resolved, base_ref)?;
            let base = self.evaluate_path(&base_path, depth + 1)?;
            if let Some(map) = value.as_object_mut() {
                map.remove("extends");
            }
            value = deep_merge(base, value);
        }

        self.cache
            .lock()
            .expect("module cache lock poisoned")
            .insert(resolved.to_path_buf(), value.clone());
        Ok(value)
    }

    /// An `extends` reference is either a relative path (resolved against
    /// the extending file's directory) or an installed preset name
    /// (resolved under the workspace's installation directory).
    fn resolve_extends(&self, from: &Path, reference: &str) -> Result<PathBuf> {
        let base = if reference.starts_with('.') {
            from.parent()
                .ok_or_else(|| Error::LoadError {
                    path: from.to_path_buf(),
                    message: format!("cannot resolve \"{reference}\" from a rootless path"),
                })?
                .join(reference)
        } else {
            self.workspace_root.join("node_modules").join(reference)
        };
        Ok(normalize_path(&base))
    }
}

/// True if the path sits under a package installation directory.
pub fn is_installed_path(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(segment) => segment
            .to_str()
            .map(|s| PACKAGE_INSTALLATION_DIRECTORIES.contains(&s))
            .unwrap_or(false),
        _ => false,
    })
}

/// Normalize a configuration value that may be phase-parameterized.
///
/// A document either is the config table directly, or carries a `phases`
/// table keyed by phase identifier. The selected phase's partial table is
/// merged over the base (an absent phase merges the empty placeholder), so
/// callers always see a plain table.
pub fn resolve_phase(value: &Value, phase: &str) -> Value {
    let Some(phases) = value.get("phases").and_then(Value::as_object) else {
        return value.clone();
    };
    let mut base = value.clone();
    if let Some(map) = base.as_object_mut() {
        map.remove("phases");
    }
    let overlay = phases
        .get(phase)
        .cloned()
        .unwrap_or(Value::Object(Default::default()));
    deep_merge(base, overlay)
}

/// Merge `overlay` onto `base`: objects merge recursively, everything else
/// is replaced by the overlay.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Lexical normalization: resolves `.` and `..` segments without touching
/// the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    warn!(path = %path.display(), "path escapes its root during normalization");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

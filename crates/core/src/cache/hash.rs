//! ContentHash computation for the target cache.
//!
//! The hash must be a pure function of the project root, the normalized
//! plugin options, and the fingerprints of externally relevant files (at
//! minimum the active package manager's lockfile). Any change to one of
//! these yields a different hash and therefore a guaranteed cache miss.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;

/// Compute the ContentHash keying a project's inferred targets.
///
/// `external_files` are workspace-relative paths whose *content* affects
/// inference even when the tool config does not change (lockfiles being the
/// canonical example). Order of the list is part of the plugin's declared
/// contract and is hashed as given.
pub fn hash_for_create_nodes(
    project_root: &str,
    options: &Value,
    workspace_root: &Path,
    external_files: &[String],
) -> Result<String> {
    let mut ctx = md5::Context::new();
    ctx.consume(project_root.as_bytes());
    ctx.consume([0u8]);
    ctx.consume(canonical_json(options).as_bytes());
    for file in external_files {
        ctx.consume([0u8]);
        ctx.consume(file.as_bytes());
        ctx.consume([0u8]);
        ctx.consume(file_fingerprint(&workspace_root.join(file)).as_bytes());
    }
    let hash = format!("{:x}", ctx.finalize());
    debug!(project_root, hash = %hash, "computed inference hash");
    Ok(hash)
}

/// Fingerprint of a single file's content; a missing file hashes to a fixed
/// placeholder so its later appearance still changes the ContentHash.
fn file_fingerprint(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => format!("{:x}", md5::compute(&bytes)),
        Err(_) => "non-existent".to_string(),
    }
}

/// Render a JSON value with recursively sorted object keys, so two
/// normalized option records that differ only in field order hash equal.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}

//! Configuration document evaluation.
//!
//! Evaluation is hidden behind the [`ModuleEvaluator`] trait so hosts can
//! plug richer evaluators (or tests can count calls) without touching the
//! loader's caching and invalidation rules. The built-in evaluator handles
//! JSON and TOML natively; other syntaxes go through a transpiler that the
//! loader registers for the duration of a single load.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::{Error, Result};

/// Rewrites a source text into a form the evaluator can parse directly.
pub trait SourceTranspiler: Send + Sync {
    fn transpile(&self, source: &str) -> Result<String>;
}

/// Process-wide registry of per-extension transpilers.
///
/// The registry is shared, mutable state: third-party embedders may hold
/// registrations of their own, so releasing a scoped registration must only
/// remove the entry it added.
#[derive(Default)]
pub struct TranspilerRegistry {
    entries: Mutex<HashMap<String, Arc<dyn SourceTranspiler>>>,
}

impl TranspilerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a transpiler for an extension, returning a guard that
    /// removes it again when dropped -- on success, error, and early return
    /// alike.
    pub fn register(
        self: &Arc<Self>,
        extension: &str,
        transpiler: Arc<dyn SourceTranspiler>,
    ) -> TranspilerGuard {
        self.entries
            .lock()
            .expect("transpiler registry lock poisoned")
            .insert(extension.to_string(), transpiler);
        TranspilerGuard {
            registry: Arc::clone(self),
            extension: extension.to_string(),
        }
    }

    pub fn get(&self, extension: &str) -> Option<Arc<dyn SourceTranspiler>> {
        self.entries
            .lock()
            .expect("transpiler registry lock poisoned")
            .get(extension)
            .cloned()
    }

    pub fn is_registered(&self, extension: &str) -> bool {
        self.entries
            .lock()
            .expect("transpiler registry lock poisoned")
            .contains_key(extension)
    }
}

/// Scoped transpiler registration; dropping it tears the registration down
/// so no evaluation state leaks into unrelated loads later in the process.
pub struct TranspilerGuard {
    registry: Arc<TranspilerRegistry>,
    extension: String,
}

impl Drop for TranspilerGuard {
    fn drop(&mut self) {
        self.registry
            .entries
            .lock()
            .expect("transpiler registry lock poisoned")
            .remove(&self.extension);
    }
}

/// Evaluates one configuration source into a JSON value.
pub trait ModuleEvaluator: Send + Sync {
    fn evaluate(&self, path: &Path, source: &str) -> Result<Value>;
}

/// Built-in evaluator for declarative configuration documents.
pub struct DocumentEvaluator {
    transpilers: Arc<TranspilerRegistry>,
}

impl DocumentEvaluator {
    pub fn new(transpilers: Arc<TranspilerRegistry>) -> Self {
        Self { transpilers }
    }
}

impl ModuleEvaluator for DocumentEvaluator {
    fn evaluate(&self, path: &Path, source: &str) -> Result<Value> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();

        let prepared = match self.transpilers.get(&extension) {
            Some(transpiler) => transpiler.transpile(source)?,
            None => source.to_string(),
        };

        match extension.as_str() {
            "json" | "jsonc" => serde_json::from_str(&prepared).map_err(|e| Error::LoadError {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            "toml" => {
                let table: toml::Value =
                    toml::from_str(&prepared).map_err(|e| Error::LoadError {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                serde_json::to_value(table).map_err(Error::from)
            }
            other => Err(Error::LoadError {
                path: path.to_path_buf(),
                message: format!("no evaluator registered for .{other} configuration files"),
            }),
        }
    }
}

/// Strips comments and trailing commas so a JSONC source parses as JSON.
pub struct JsoncTranspiler;

impl SourceTranspiler for JsoncTranspiler {
    // Comments must go before trailing commas are judged: a comma followed
    // by a comment and then a closing brace is still trailing.
    fn transpile(&self, source: &str) -> Result<String> {
        Ok(strip_trailing_commas(&strip_comments(source)))
    }
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn strip_trailing_commas(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                // Drop the comma if the next significant character closes
                // the containing value.
                let closes = chars
                    .clone()
                    .find(|next| !next.is_whitespace())
                    .map(|next| next == '}' || next == ']')
                    .unwrap_or(false);
                if !closes {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

//! gantry-core - inference and caching core of the gantry build orchestrator
//!
//! This crate provides functionality to:
//! - Infer named, cacheable, dependency-aware targets from tool
//!   configuration files discovered in a workspace (no per-project manual
//!   declaration)
//! - Cache inferred targets across process invocations, keyed by a
//!   deterministic content hash
//! - Load configuration files as evaluated modules with safe invalidation
//! - Resolve and match `{workspaceRoot}`/`{projectRoot}` templated glob
//!   patterns

pub mod cache;
pub mod error;
pub mod inference;
pub mod loader;
pub mod plugins;
pub mod templates;
pub mod types;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use types::*;

// Main API components
pub use cache::{TargetsCache, TargetsStaging};
pub use inference::{CreateNodesContext, InferenceHost, InferencePlugin};
pub use loader::ConfigLoader;
pub use templates::{match_path_with_templates, resolve_template_path};

//! Inference plugin for Next.js applications.
//!
//! Respects the project's package scripts when they wrap the tool (each
//! `next <cmd>` script becomes a target, with the build-shaped one gaining
//! cache characterization and the start-shaped one depending on it);
//! otherwise synthesizes the standard build/dev/start triple.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::{hash_for_create_nodes, TargetMap, TargetsCache, TargetsStaging};
use crate::error::{Error, Result};
use crate::inference::{
    default_target_inputs, has_project_markers, project_root_of, CreateNodesContext,
    InferencePlugin,
};
use crate::loader::{resolve_phase, PHASE_PRODUCTION_BUILD};
use crate::plugins::root_project_name;
use crate::types::{
    CreateNodesResult, PackageManifest, ProjectConfiguration, TargetConfiguration,
    TargetDependency, TargetOptions,
};

pub const NEXT_CONFIG_GLOB: &str = "**/next.config.{json,jsonc,toml}";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NextPluginOptions {
    pub use_package_scripts: Option<bool>,
    pub build_target_name: Option<String>,
    pub dev_target_name: Option<String>,
    pub start_target_name: Option<String>,
}

impl NextPluginOptions {
    pub fn normalize(mut self) -> Self {
        self.use_package_scripts.get_or_insert(true);
        self.build_target_name.get_or_insert_with(|| "build".to_string());
        self.dev_target_name.get_or_insert_with(|| "dev".to_string());
        self.start_target_name.get_or_insert_with(|| "start".to_string());
        self
    }
}

pub struct NextPlugin {
    cache: TargetsCache,
    staging: TargetsStaging,
}

impl NextPlugin {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache: TargetsCache::read(cache_dir.join("next-targets.json")),
            staging: TargetsStaging::new(),
        }
    }
}

impl InferencePlugin for NextPlugin {
    fn name(&self) -> &'static str {
        "next"
    }

    fn config_glob(&self) -> &'static str {
        NEXT_CONFIG_GLOB
    }

    fn create_nodes(
        &self,
        config_file_path: &str,
        options: &Value,
        context: &CreateNodesContext,
    ) -> Result<CreateNodesResult> {
        let options = parse_options(options)?.normalize();
        let project_root = project_root_of(config_file_path);

        if !has_project_markers(&context.workspace_root, &project_root) {
            return Ok(CreateNodesResult::default());
        }

        let hash = hash_for_create_nodes(
            &project_root,
            &serde_json::to_value(&options)?,
            &context.workspace_root,
            std::slice::from_ref(&context.lock_file_name),
        )?;

        let targets = match self.cache.get(&hash) {
            Some(hit) => {
                debug!(config_file = config_file_path, hash = %hash, "next targets cache hit");
                hit.clone()
            }
            None => build_next_targets(config_file_path, &project_root, &options, context)?,
        };
        self.staging.record(&hash, targets.clone());

        let mut project = ProjectConfiguration {
            project_type: None,
            name: None,
            targets,
        };
        if project_root == "." {
            project.name = Some(root_project_name(&context.workspace_root, &project_root));
        }

        Ok(CreateNodesResult {
            projects: BTreeMap::from([(project_root, project)]),
        })
    }

    fn create_dependencies(&self, _context: &CreateNodesContext) -> Result<()> {
        self.cache.flush(&self.staging)
    }
}

fn parse_options(options: &Value) -> Result<NextPluginOptions> {
    if options.is_null() {
        return Ok(NextPluginOptions::default());
    }
    serde_json::from_value(options.clone())
        .map_err(|e| Error::ConfigError(format!("invalid next plugin options: {e}")))
}

/// Matches scripts that invoke the tool, capturing the subcommand.
fn next_script_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(next\s+(?P<cmd>\w+)|\bnext-remote-watch\b)").expect("static regex")
    })
}

fn build_next_targets(
    config_file_path: &str,
    project_root: &str,
    options: &NextPluginOptions,
    context: &CreateNodesContext,
) -> Result<TargetMap> {
    let config = context.loader.load(config_file_path)?;
    let output_path = production_output_path(project_root, &config);
    let inputs = default_target_inputs(&context.named_inputs, "next");

    let mut targets = TargetMap::new();
    let mut scripts_declared = false;

    if options.use_package_scripts.unwrap_or(true) {
        let manifest = PackageManifest::read(
            &context
                .workspace_root
                .join(project_root)
                .join("package.json"),
        )
        .unwrap_or_default();

        let mut build_script: Option<String> = None;
        let mut start_script: Option<String> = None;

        // A declared scripts block takes over target inference entirely:
        // scripts that do not invoke the tool contribute nothing, and the
        // fallback triple is suppressed either way.
        scripts_declared = manifest.scripts.is_some();

        for (script_name, script) in manifest.scripts.iter().flatten() {
            let Some(captures) = next_script_regex().captures(script) else {
                continue;
            };

            let mut target = TargetConfiguration {
                command: Some(script.clone()),
                options: Some(TargetOptions::cwd(project_root)),
                ..Default::default()
            };
            match captures.name("cmd").map(|m| m.as_str()) {
                Some("build") => {
                    build_script = Some(script_name.clone());
                    target.depends_on = vec![TargetDependency::Target("^build".to_string())];
                    target.cache = Some(true);
                    target.inputs = inputs.clone();
                    target.outputs = vec![
                        output_path.clone(),
                        format!("{output_path}/!(cache)"),
                    ];
                }
                Some("start") => {
                    start_script = Some(script_name.clone());
                }
                _ => {}
            }
            targets.insert(script_name.clone(), target);
        }

        // The start script only makes sense after a build.
        if let (Some(build), Some(start)) = (build_script, start_script) {
            if let Some(target) = targets.get_mut(&start) {
                target.depends_on = vec![TargetDependency::Target(build)];
            }
        }
    }

    if !scripts_declared {
        let build_target_name = options.build_target_name.as_deref().unwrap_or("build");
        targets.insert(
            build_target_name.to_string(),
            TargetConfiguration {
                command: Some("next build".to_string()),
                options: Some(TargetOptions::cwd(project_root)),
                depends_on: vec![TargetDependency::Target("^build".to_string())],
                cache: Some(true),
                inputs,
                outputs: vec![output_path.clone(), format!("{output_path}/!(cache)")],
                ..Default::default()
            },
        );
        targets.insert(
            options.dev_target_name.clone().unwrap_or_else(|| "dev".to_string()),
            TargetConfiguration {
                command: Some("next dev".to_string()),
                options: Some(TargetOptions::cwd(project_root)),
                ..Default::default()
            },
        );
        targets.insert(
            options
                .start_target_name
                .clone()
                .unwrap_or_else(|| "start".to_string()),
            TargetConfiguration {
                command: Some("next start".to_string()),
                options: Some(TargetOptions::cwd(project_root)),
                depends_on: vec![TargetDependency::Target(build_target_name.to_string())],
                ..Default::default()
            },
        );
    }

    Ok(targets)
}

/// Build output directory for the production phase. Phase-parameterized
/// configurations are normalized before reading `distDir`.
fn production_output_path(project_root: &str, config: &Value) -> String {
    let resolved = resolve_phase(config, PHASE_PRODUCTION_BUILD);
    let dist_dir = resolved
        .get("distDir")
        .and_then(Value::as_str)
        .unwrap_or(".next");
    if project_root == "." {
        format!("{{projectRoot}}/{dist_dir}")
    } else {
        format!("{{workspaceRoot}}/{project_root}/{dist_dir}")
    }
}

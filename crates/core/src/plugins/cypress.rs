//! Inference plugin for Cypress end-to-end suites.
//!
//! Synthesizes a suite-run target per project with outputs derived from the
//! config's artifact folders, per-configuration variants from declared web
//! server commands, and -- when a CI web server command is present -- a
//! per-spec-file fan-out: one target per spec plus a no-op umbrella target
//! aggregating them, giving per-file cache granularity and CI parallelism
//! without flattening the graph.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::{hash_for_create_nodes, TargetMap, TargetsCache, TargetsStaging};
use crate::error::{Error, Result};
use crate::inference::{
    default_target_inputs, glob_files, has_project_markers, project_root_of,
    CreateNodesContext, InferencePlugin,
};
use crate::loader::deep_merge;
use crate::plugins::{relative_to_project, resolve_output_path, root_project_name};
use crate::types::{
    CreateNodesResult, ProjectConfiguration, TargetConfiguration, TargetDependency,
    TargetOptions,
};

pub const CYPRESS_CONFIG_GLOB: &str = "**/cypress.config.{json,jsonc,toml}";

/// Key inside the `e2e` block holding orchestrator-specific preset options
/// (web server commands for the interactive and CI flows).
const PRESET_OPTIONS_KEY: &str = "gantry";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CypressPluginOptions {
    pub target_name: Option<String>,
    pub ci_target_name: Option<String>,
    pub component_testing_target_name: Option<String>,
}

impl CypressPluginOptions {
    /// Fill documented defaults. Idempotent: normalizing twice yields the
    /// same record.
    pub fn normalize(mut self) -> Self {
        self.target_name.get_or_insert_with(|| "e2e".to_string());
        self.ci_target_name.get_or_insert_with(|| "e2e-ci".to_string());
        self.component_testing_target_name
            .get_or_insert_with(|| "component-test".to_string());
        self
    }
}

pub struct CypressPlugin {
    cache: TargetsCache,
    staging: TargetsStaging,
}

impl CypressPlugin {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache: TargetsCache::read(cache_dir.join("cypress-targets.json")),
            staging: TargetsStaging::new(),
        }
    }
}

impl InferencePlugin for CypressPlugin {
    fn name(&self) -> &'static str {
        "cypress"
    }

    fn config_glob(&self) -> &'static str {
        CYPRESS_CONFIG_GLOB
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
                debug!(config_file = config_file_path, hash = %hash, "cypress targets cache hit");
                hit.clone()
            }
            None => build_cypress_targets(config_file_path, &project_root, &options, context)?,
        };
        self.staging.record(&hash, targets.clone());

        let mut project = ProjectConfiguration {
            project_type: Some("application".to_string()),
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

fn parse_options(options: &Value) -> Result<CypressPluginOptions> {
    if options.is_null() {
        return Ok(CypressPluginOptions::default());
    }
    serde_json::from_value(options.clone())
        .map_err(|e| Error::ConfigError(format!("invalid cypress plugin options: {e}")))
}

fn build_cypress_targets(
    config_file_path: &str,
    project_root: &str,
    options: &CypressPluginOptions,
    context: &CreateNodesContext,
) -> Result<TargetMap> {
    let config = context.loader.load(config_file_path)?;
    let relative_config_path = relative_to_project(config_file_path, project_root);
    let inputs = default_target_inputs(&context.named_inputs, "cypress");
    let preset = preset_options(&config);

    let mut targets = TargetMap::new();

    if let Some(e2e) = config.get("e2e") {
        let target_name = options.target_name.as_deref().unwrap_or("e2e");
        let outputs = artifact_outputs(project_root, &config, "e2e");

        let mut suite_target = TargetConfiguration {
            command: Some(format!(
                "cypress run --config-file {relative_config_path} --e2e"
            )),
            options: Some(TargetOptions::cwd(project_root)),
            cache: Some(true),
            inputs: inputs.clone(),
            outputs: outputs.clone(),
            ..Default::default()
        };

        // Non-default web server commands become named configurations of
        // the suite target.
        if let Some(commands) = preset.get("webServerCommands").and_then(Value::as_object) {
            for (configuration, command) in commands {
                if configuration == "default" {
                    continue;
                }
                if let Some(command) = command.as_str() {
                    suite_target.configurations.insert(
                        configuration.clone(),
                        TargetConfiguration {
                            command: Some(format!(
                                "cypress run --config-file {relative_config_path} --e2e \
                                 --env webServerCommand=\"{command}\""
                            )),
                            ..Default::default()
                        },
                    );
                }
            }
        }
        targets.insert(target_name.to_string(), suite_target);

        if let Some(ci_command) = preset.get("ciWebServerCommand").and_then(Value::as_str) {
            let ci_target_name = options.ci_target_name.as_deref().unwrap_or("e2e-ci");
            let spec_patterns = project_scoped_patterns(e2e.get("specPattern"), project_root);
            let exclude_patterns =
                project_scoped_patterns(e2e.get("excludeSpecPattern"), project_root);
            let spec_files =
                glob_files(&context.workspace_root, &spec_patterns, &exclude_patterns)?;
            debug!(
                config_file = config_file_path,
                specs = spec_files.len(),
                "fanning out per-spec CI targets"
            );

            let mut depends_on = Vec::with_capacity(spec_files.len());
            for spec_file in &spec_files {
                let relative_spec = relative_to_project(spec_file, project_root);
                let spec_target_name = format!("{ci_target_name}--{relative_spec}");
                targets.insert(
                    spec_target_name.clone(),
                    TargetConfiguration {
                        command: Some(format!(
                            "cypress run --config-file {relative_config_path} --e2e \
                             --env webServerCommand=\"{ci_command}\" --spec {relative_spec}"
                        )),
                        options: Some(TargetOptions::cwd(project_root)),
                        cache: Some(true),
                        inputs: inputs.clone(),
                        outputs: outputs.clone(),
                        ..Default::default()
                    },
                );
                depends_on.push(TargetDependency::on_self(spec_target_name));
            }

            targets.insert(
                ci_target_name.to_string(),
                TargetConfiguration {
                    executor: Some("gantry:noop".to_string()),
                    cache: Some(true),
                    inputs: inputs.clone(),
                    outputs,
                    depends_on,
                    ..Default::default()
                },
            );
        }
    }

    if config.get("component").is_some() {
        let component_target_name = options
            .component_testing_target_name
            .as_deref()
            .unwrap_or("component-test");
        // Does not override an e2e target that claimed the same name.
        targets
            .entry(component_target_name.to_string())
            .or_insert_with(|| TargetConfiguration {
                command: Some(format!(
                    "cypress open --config-file {relative_config_path} --component"
                )),
                options: Some(TargetOptions::cwd(project_root)),
                cache: Some(true),
                inputs,
                outputs: artifact_outputs(project_root, &config, "component"),
                ..Default::default()
            });
    }

    Ok(targets)
}

/// Preset options visible to the orchestrator: the `e2e.gantry` block,
/// overlaid by top-level `env` and `e2e.env`.
fn preset_options(config: &Value) -> Value {
    let base = config
        .pointer(&format!("/e2e/{PRESET_OPTIONS_KEY}"))
        .cloned()
        .unwrap_or(Value::Object(Default::default()));
    let env = config
        .get("env")
        .cloned()
        .unwrap_or(Value::Object(Default::default()));
    let e2e_env = config
        .pointer("/e2e/env")
        .cloned()
        .unwrap_or(Value::Object(Default::default()));
    deep_merge(deep_merge(base, env), e2e_env)
}

/// Artifact directories (videos, screenshots) declared at the top level
/// and per testing type, as templated output paths.
fn artifact_outputs(project_root: &str, config: &Value, testing_type: &str) -> Vec<String> {
    let mut outputs = Vec::new();
    let mut push = |value: Option<&Value>| {
        if let Some(path) = value.and_then(Value::as_str) {
            outputs.push(resolve_output_path(project_root, path));
        }
    };
    push(config.get("videosFolder"));
    push(config.get("screenshotsFolder"));
    push(config.pointer(&format!("/{testing_type}/videosFolder")));
    push(config.pointer(&format!("/{testing_type}/screenshotsFolder")));
    if outputs.is_empty() {
        // Tool defaults, so cacheable targets stay characterized even when
        // the config declares no artifact folders.
        outputs.push(resolve_output_path(project_root, "cypress/videos"));
        outputs.push(resolve_output_path(project_root, "cypress/screenshots"));
    }
    outputs
}

/// Spec patterns are declared relative to the project root, as a string or
/// an array; the workspace-aware glob wants them workspace-relative.
fn project_scoped_patterns(declared: Option<&Value>, project_root: &str) -> Vec<String> {
    let scope = |pattern: &str| {
        if project_root == "." {
            pattern.to_string()
        } else {
            format!("{project_root}/{pattern}")
        }
    };
    match declared {
        Some(Value::String(pattern)) => vec![scope(pattern)],
        Some(Value::Array(patterns)) => patterns
            .iter()
            .filter_map(Value::as_str)
            .map(scope)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap as Map;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn context(workspace: &TempDir) -> CreateNodesContext {
        CreateNodesContext::new(workspace.path().to_path_buf(), Map::new())
    }

    fn plugin(workspace: &TempDir) -> CypressPlugin {
        CypressPlugin::new(&workspace.path().join(".gantry"))
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = CypressPluginOptions::default().normalize();
        let twice = once.clone().normalize();
        assert_eq!(once, twice);
        assert_eq!(once.target_name.as_deref(), Some("e2e"));
        assert_eq!(once.ci_target_name.as_deref(), Some("e2e-ci"));
        assert_eq!(
            once.component_testing_target_name.as_deref(),
            Some("component-test")
        );
    }

    #[test]
    fn normalization_keeps_explicit_overrides() {
        let options = CypressPluginOptions {
            target_name: Some("e2e-suite".to_string()),
            ..Default::default()
        }
        .normalize();
        assert_eq!(options.target_name.as_deref(), Some("e2e-suite"));
        assert_eq!(options.ci_target_name.as_deref(), Some("e2e-ci"));
    }

    #[test]
    fn returns_nothing_without_project_markers() {
        let workspace = TempDir::new().unwrap();
        write(
            workspace.path(),
            "apps/web/cypress.config.json",
            r#"{"e2e":{}}"#,
        );
        let result = plugin(&workspace)
            .create_nodes(
                "apps/web/cypress.config.json",
                &Value::Null,
                &context(&workspace),
            )
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn suite_target_with_artifact_outputs() {
        let workspace = TempDir::new().unwrap();
        write(workspace.path(), "apps/web/package.json", r#"{"name":"web"}"#);
        write(
            workspace.path(),
            "apps/web/cypress.config.json",
            r#"{
                "screenshotsFolder": "screenshots",
                "e2e": { "videosFolder": "../dist/videos" }
            }"#,
        );

        let result = plugin(&workspace)
            .create_nodes(
                "apps/web/cypress.config.json",
                &Value::Null,
                &context(&workspace),
            )
            .unwrap();

        let project = &result.projects["apps/web"];
        assert_eq!(project.project_type.as_deref(), Some("application"));
        let e2e = &project.targets["e2e"];
        assert_eq!(
            e2e.command.as_deref(),
            Some("cypress run --config-file cypress.config.json --e2e")
        );
        assert_eq!(e2e.cache, Some(true));
        assert_eq!(
            e2e.outputs,
            vec![
                "{projectRoot}/screenshots".to_string(),
                "{workspaceRoot}/apps/dist/videos".to_string(),
            ]
        );
        assert_eq!(
            e2e.options.as_ref().unwrap().cwd.as_deref(),
            Some("apps/web")
        );
    }

    #[test]
    fn ci_fan_out_produces_one_target_per_spec_plus_umbrella() {
        let workspace = TempDir::new().unwrap();
        write(workspace.path(), "apps/web/package.json", r#"{"name":"web"}"#);
        write(
            workspace.path(),
            "apps/web/cypress.config.json",
            r#"{
                "screenshotsFolder": "screenshots",
                "e2e": {
                    "specPattern": "**/*.cy.ts",
                    "gantry": { "ciWebServerCommand": "serve web --prod" }
                }
            }"#,
        );
        write(workspace.path(), "apps/web/src/e2e/login.cy.ts", "");
        write(workspace.path(), "apps/web/src/e2e/cart.cy.ts", "");
        write(workspace.path(), "apps/web/src/e2e/checkout.cy.ts", "");

        let result = plugin(&workspace)
            .create_nodes(
                "apps/web/cypress.config.json",
                &Value::Null,
                &context(&workspace),
            )
            .unwrap();

        let targets = &result.projects["apps/web"].targets;
        let spec_targets: Vec<&String> = targets
            .keys()
            .filter(|name| name.starts_with("e2e-ci--"))
            .collect();
        assert_eq!(spec_targets.len(), 3);
        assert!(targets.contains_key("e2e-ci--src/e2e/cart.cy.ts"));

        let umbrella = &targets["e2e-ci"];
        assert_eq!(umbrella.executor.as_deref(), Some("gantry:noop"));
        assert!(umbrella.command.is_none());
        assert_eq!(umbrella.depends_on.len(), 3);
        for dep in &umbrella.depends_on {
            match dep {
                TargetDependency::Spec {
                    target,
                    projects,
                    params,
                } => {
                    assert!(target.starts_with("e2e-ci--"));
                    assert_eq!(projects, "self");
                    assert_eq!(params, "forward");
                }
                other => panic!("expected explicit self edge, got {other:?}"),
            }
        }

        let per_spec = &targets["e2e-ci--src/e2e/login.cy.ts"];
        assert!(per_spec
            .command
            .as_deref()
            .unwrap()
            .contains("--spec src/e2e/login.cy.ts"));
        assert!(per_spec
            .command
            .as_deref()
            .unwrap()
            .contains("webServerCommand=\"serve web --prod\""));
    }

    #[test]
    fn exclude_spec_patterns_are_honored() {
        let workspace = TempDir::new().unwrap();
        write(workspace.path(), "apps/web/package.json", r#"{"name":"web"}"#);
        write(
            workspace.path(),
            "apps/web/cypress.config.json",
            r#"{
                "screenshotsFolder": "screenshots",
                "e2e": {
                    "specPattern": "**/*.cy.ts",
                    "excludeSpecPattern": "**/wip/**",
                    "gantry": { "ciWebServerCommand": "serve web" }
                }
            }"#,
        );
        write(workspace.path(), "apps/web/src/e2e/login.cy.ts", "");
        write(workspace.path(), "apps/web/src/e2e/wip/draft.cy.ts", "");

        let result = plugin(&workspace)
            .create_nodes(
                "apps/web/cypress.config.json",
                &Value::Null,
                &context(&workspace),
            )
            .unwrap();

        let targets = &result.projects["apps/web"].targets;
        assert!(targets.contains_key("e2e-ci--src/e2e/login.cy.ts"));
        assert!(!targets.contains_key("e2e-ci--src/e2e/wip/draft.cy.ts"));
    }

    #[test]
    fn web_server_commands_become_configurations_without_default() {
        let workspace = TempDir::new().unwrap();
        write(workspace.path(), "apps/web/package.json", r#"{"name":"web"}"#);
        write(
            workspace.path(),
            "apps/web/cypress.config.json",
            r#"{
                "e2e": {
                    "gantry": {
                        "webServerCommands": {
                            "default": "serve web",
                            "production": "serve web --prod"
                        }
                    }
                }
            }"#,
        );

        let result = plugin(&workspace)
            .create_nodes(
                "apps/web/cypress.config.json",
                &Value::Null,
                &context(&workspace),
            )
            .unwrap();

        let e2e = &result.projects["apps/web"].targets["e2e"];
        assert!(!e2e.configurations.contains_key("default"));
        let production = &e2e.configurations["production"];
        assert!(production
            .command
            .as_deref()
            .unwrap()
            .contains("webServerCommand=\"serve web --prod\""));
    }

    #[test]
    fn component_block_adds_component_testing_target() {
        let workspace = TempDir::new().unwrap();
        write(workspace.path(), "apps/web/package.json", r#"{"name":"web"}"#);
        write(
            workspace.path(),
            "apps/web/cypress.config.json",
            r#"{"component":{"screenshotsFolder":"component-shots"}}"#,
        );

        let result = plugin(&workspace)
            .create_nodes(
                "apps/web/cypress.config.json",
                &Value::Null,
                &context(&workspace),
            )
            .unwrap();

        let target = &result.projects["apps/web"].targets["component-test"];
        assert_eq!(
            target.command.as_deref(),
            Some("cypress open --config-file cypress.config.json --component")
        );
        assert_eq!(target.outputs, vec!["{projectRoot}/component-shots".to_string()]);
    }

    #[test]
    fn root_config_names_the_project_from_the_manifest() {
        let workspace = TempDir::new().unwrap();
        write(workspace.path(), "package.json", r#"{"name":"@acme/root"}"#);
        write(
            workspace.path(),
            "cypress.config.json",
            r#"{"e2e":{},"screenshotsFolder":"shots"}"#,
        );

        let result = plugin(&workspace)
            .create_nodes("cypress.config.json", &Value::Null, &context(&workspace))
            .unwrap();

        assert_eq!(
            result.projects["."].name.as_deref(),
            Some("@acme/root")
        );
    }

    #[test]
    fn preset_options_merge_order() {
        let config = json!({
            "env": { "ciWebServerCommand": "from-env" },
            "e2e": {
                "gantry": { "ciWebServerCommand": "from-preset", "webServerCommands": {} },
                "env": { "ciWebServerCommand": "from-e2e-env" }
            }
        });
        let preset = preset_options(&config);
        assert_eq!(preset["ciWebServerCommand"], json!("from-e2e-env"));
        assert!(preset.get("webServerCommands").is_some());
    }
}

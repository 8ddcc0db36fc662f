//! Default input derivation from the workspace's named-input presets.

use std::collections::BTreeMap;

use crate::types::TargetInput;

/// Inputs for an inferred cacheable target: the project's `default` file
/// set, the upstream `production` set when the workspace defines one
/// (falling back to upstream `default`), and the tool itself as an external
/// dependency fingerprint.
pub fn default_target_inputs(
    named_inputs: &BTreeMap<String, Vec<String>>,
    external_dependency: &str,
) -> Vec<TargetInput> {
    let upstream = if named_inputs.contains_key("production") {
        "^production"
    } else {
        "^default"
    };
    vec![
        "default".into(),
        upstream.into(),
        TargetInput::ExternalDependencies {
            external_dependencies: vec![external_dependency.to_string()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_upstream_production_when_defined() {
        let mut named_inputs = BTreeMap::new();
        named_inputs.insert("default".to_string(), vec!["{projectRoot}/**/*".to_string()]);
        named_inputs.insert(
            "production".to_string(),
            vec!["!{projectRoot}/**/*.spec.ts".to_string()],
        );

        let inputs = default_target_inputs(&named_inputs, "cypress");
        assert_eq!(inputs[0], TargetInput::Named("default".to_string()));
        assert_eq!(inputs[1], TargetInput::Named("^production".to_string()));
        assert_eq!(
            inputs[2],
            TargetInput::ExternalDependencies {
                external_dependencies: vec!["cypress".to_string()]
            }
        );
    }

    #[test]
    fn falls_back_to_upstream_default() {
        let inputs = default_target_inputs(&BTreeMap::new(), "next");
        assert_eq!(inputs[1], TargetInput::Named("^default".to_string()));
    }
}

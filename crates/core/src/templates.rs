//! Templated glob paths rooted at `{workspaceRoot}` or `{projectRoot}`.
//!
//! Generators and plugins describe coverage rules with patterns like
//! `{projectRoot}/**/not-stories/**`. A pattern missing one of the two root
//! tokens is a defect in caller-supplied configuration and is rejected,
//! never silently skipped.

use globset::GlobBuilder;

use crate::error::{Error, Result};

const WORKSPACE_ROOT_PREFIX: &str = "{workspaceRoot}/";
const PROJECT_ROOT_PREFIX: &str = "{projectRoot}/";

/// Substitute the root token in a single templated path.
///
/// `{projectRoot}` is replaced with `project_root`; `{workspaceRoot}` with
/// the empty prefix, since workspace-root-relative paths are already in the
/// right form.
pub fn resolve_template_path(pattern: &str, project_root: &str) -> Result<String> {
    if let Some(rest) = pattern.strip_prefix(PROJECT_ROOT_PREFIX) {
        Ok(format!("{project_root}/{rest}"))
    } else if let Some(rest) = pattern.strip_prefix(WORKSPACE_ROOT_PREFIX) {
        Ok(rest.to_string())
    } else {
        Err(Error::InvalidTemplatePath {
            pattern: pattern.to_string(),
        })
    }
}

/// Check whether `path` matches any pattern in `patterns` under the given
/// project root.
///
/// Matching is case-sensitive and spans the full path, never a substring.
/// `*` stays within one path segment; `**` crosses segments; braces and
/// character classes follow extended globbing.
pub fn match_path_with_templates(
    path: &str,
    patterns: &[String],
    project_root: &str,
) -> Result<bool> {
    for pattern in patterns {
        let resolved = resolve_template_path(pattern, project_root)?;
        if glob_matches(&resolved, path)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn glob_matches(glob: &str, path: &str) -> Result<bool> {
    let matcher = GlobBuilder::new(glob)
        .literal_separator(true)
        .case_insensitive(false)
        .build()?
        .compile_matcher();
    Ok(matcher.is_match(path))
}

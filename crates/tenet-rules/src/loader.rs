//! Rule set loading from YAML files.
//!
//! Unknown fields are rejected and every set is validated before it is
//! handed to the runner.

use crate::schema::{RuleSet, RuleValidationError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a loaded rule set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    File(PathBuf),
    Inline,
}

impl std::fmt::Display for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSource::File(path) => write!(f, "file:{}", path.display()),
            RuleSource::Inline => write!(f, "inline"),
        }
    }
}

/// A parsed and validated rule set.
#[derive(Debug, Clone)]
pub struct LoadedRuleSet {
    pub definition: RuleSet,
    pub source: RuleSource,
}

impl LoadedRuleSet {
    /// Get the canonical ID for a rule.
    pub fn canonical_rule_id(&self, rule_id: &str) -> String {
        format!(
            "{}@{}:{}",
            self.definition.name, self.definition.version, rule_id
        )
    }
}

/// Rule set loading error.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to read rule set '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse rule set YAML: {message}")]
    YamlParseError { message: String },

    #[error("Rule set validation failed: {0}")]
    ValidationError(#[from] RuleValidationError),
}

/// Load a rule set from a file path.
pub fn load_rule_set(path: &Path) -> Result<LoadedRuleSet, RuleError> {
    let content = std::fs::read_to_string(path).map_err(|e| RuleError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_from_string(&content, RuleSource::File(path.to_path_buf()))
}

/// Load a rule set from YAML content.
pub fn load_rule_set_from_str(content: &str) -> Result<LoadedRuleSet, RuleError> {
    load_from_string(content, RuleSource::Inline)
}

/// Load several rule sets, failing on the first error.
pub fn load_rule_sets<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<LoadedRuleSet>, RuleError> {
    let mut sets = Vec::with_capacity(paths.len());
    for path in paths {
        sets.push(load_rule_set(path.as_ref())?);
    }
    Ok(sets)
}

fn load_from_string(content: &str, source: RuleSource) -> Result<LoadedRuleSet, RuleError> {
    let definition: RuleSet =
        serde_yaml::from_str(content).map_err(|e| RuleError::YamlParseError {
            message: format_yaml_error(&e),
        })?;
    definition.validate()?;

    tracing::debug!(
        set = %definition.name,
        version = %definition.version,
        rules = definition.rules.len(),
        source = %source,
        "loaded rule set"
    );
    Ok(LoadedRuleSet { definition, source })
}

fn format_yaml_error(e: &serde_yaml::Error) -> String {
    match e.location() {
        Some(loc) => format!("{} (line {}, column {})", e, loc.line(), loc.column()),
        None => e.to_string(),
    }
}

use crate::schema::Severity;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one validation run.
///
/// Relative paths are resolved against the directory of the config file
/// when loaded through [`RunConfig::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Rule set YAML files to apply.
    pub rule_sets: Vec<PathBuf>,

    /// Inventory YAML files providing definitions and instances.
    pub inventories: Vec<PathBuf>,

    /// Lowest severity that makes the run fail.
    pub fail_on: Severity,

    /// Cap on reported results; lowest severity is dropped first.
    pub max_results: usize,

    /// Report passing instances as well as failing ones.
    pub include_passing: bool,
}

fn default_max_results() -> usize {
    5000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            rule_sets: Vec::new(),
            inventories: Vec::new(),
            fail_on: Severity::Error,
            max_results: default_max_results(),
            include_passing: false,
        }
    }
}

impl RunConfig {
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("failed to parse run config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read run config {}", path.display()))?;
        let mut config = Self::from_yaml_str(&content)
            .with_context(|| format!("invalid run config {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.rule_sets = resolve_all(base, config.rule_sets);
            config.inventories = resolve_all(base, config.inventories);
        }
        Ok(config)
    }
}

fn resolve_all(base: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .map(|p| if p.is_relative() { base.join(p) } else { p })
        .collect()
}

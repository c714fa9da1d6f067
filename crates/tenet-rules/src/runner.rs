//! Rule runner: applies loaded rule sets to an instance store.

use crate::config::RunConfig;
use crate::inventory::Inventory;
use crate::loader::{load_rule_sets, LoadedRuleSet};
use crate::schema::Severity;
use anyhow::Context;
use serde::Serialize;
use std::collections::HashSet;
use tenet_core::{
    load_providers, CompiledRule, InstanceStore, ResourceProvider, SchemaStore, TypeRef,
    ValidationResult, Validator,
};

/// Result of one rule on one selected instance.
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    /// Canonical rule id: {set}@{version}:{rule_id}
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(rename = "type")]
    pub resource: TypeRef,
    pub instance_id: String,
    pub passed: bool,
    /// Failing statement results only.
    pub failures: Vec<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rules: usize,
    pub evaluated: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &RuleOutcome) {
        self.evaluated += 1;
        if outcome.passed {
            self.passed += 1;
            return;
        }
        self.failed += 1;
        match outcome.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => self.infos += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub tool_version: String,
    pub outcomes: Vec<RuleOutcome>,
    pub summary: RunSummary,
    pub truncated: bool,
    pub truncated_count: usize,
    /// Severity gate the run was checked against.
    pub fail_on: Severity,
    /// True when some failing outcome is at or above `fail_on`, counting
    /// outcomes dropped by truncation.
    pub failed: bool,
}

impl RunReport {
    pub fn has_failures_at_or_above(&self, threshold: Severity) -> bool {
        self.outcomes
            .iter()
            .any(|o| !o.passed && o.severity.is_at_or_above(threshold))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs rule sets against a populated store.
#[derive(Debug, Clone, Copy)]
pub struct RuleRunner<'a> {
    validator: Validator<'a>,
    max_results: usize,
    include_passing: bool,
    fail_on: Severity,
}

impl<'a> RuleRunner<'a> {
    pub fn new(store: &'a InstanceStore) -> Self {
        let defaults = RunConfig::default();
        Self {
            validator: Validator::new(store),
            max_results: defaults.max_results,
            include_passing: defaults.include_passing,
            fail_on: defaults.fail_on,
        }
    }

    pub fn from_config(store: &'a InstanceStore, config: &RunConfig) -> Self {
        Self::new(store)
            .with_max_results(config.max_results)
            .include_passing(config.include_passing)
            .with_fail_on(config.fail_on)
    }

    pub fn with_fail_on(mut self, threshold: Severity) -> Self {
        self.fail_on = threshold;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn include_passing(mut self, include: bool) -> Self {
        self.include_passing = include;
        self
    }

    pub fn run(&self, sets: &[LoadedRuleSet]) -> RunReport {
        let mut outcomes = Vec::new();
        let mut summary = RunSummary::default();
        let mut seen = HashSet::new();
        let mut failed = false;
        let schemas = self.validator.store().schemas();

        for set in sets {
            for rule in &set.definition.rules {
                let rule_id = set.canonical_rule_id(&rule.id);
                // Same canonical id = run once.
                if !seen.insert(rule_id.clone()) {
                    tracing::warn!(rule = %rule_id, "duplicate rule id, skipping");
                    continue;
                }
                summary.rules += 1;

                if !schemas.contains(&rule.resource) {
                    tracing::warn!(
                        rule = %rule_id,
                        type_ref = %rule.resource,
                        "rule targets an unregistered resource type"
                    );
                    continue;
                }

                let compiled = CompiledRule::compile(&rule.filter, &rule.assert);
                for result in self.validator.validate_compiled(&rule.resource, &compiled) {
                    let outcome = RuleOutcome {
                        rule_id: rule_id.clone(),
                        severity: rule.severity,
                        message: rule.description.clone(),
                        resource: result.type_ref.clone(),
                        passed: result.success,
                        failures: result.failures().cloned().collect(),
                        instance_id: result.id,
                        help: rule.help.clone(),
                    };
                    summary.record(&outcome);
                    failed |= !outcome.passed && outcome.severity.is_at_or_above(self.fail_on);
                    if !outcome.passed || self.include_passing {
                        outcomes.push(outcome);
                    }
                }
            }
        }

        let (outcomes, truncated, truncated_count) = truncate_outcomes(outcomes, self.max_results);
        tracing::info!(
            rules = summary.rules,
            evaluated = summary.evaluated,
            failed = summary.failed,
            truncated_count,
            gate_failed = failed,
            "rule run complete"
        );

        RunReport {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            outcomes,
            summary,
            truncated,
            truncated_count,
            fail_on: self.fail_on,
            failed,
        }
    }
}

/// Truncate outcomes to max_results, removing lowest severity and passing
/// outcomes first. Returns (outcomes, truncated, truncated_count).
fn truncate_outcomes(
    mut outcomes: Vec<RuleOutcome>,
    max_results: usize,
) -> (Vec<RuleOutcome>, bool, usize) {
    if outcomes.len() <= max_results {
        return (outcomes, false, 0);
    }

    // Stable sort keeps evaluation order within a priority.
    outcomes.sort_by_key(|o| std::cmp::Reverse((!o.passed, o.severity.priority())));

    let truncated_count = outcomes.len() - max_results;
    outcomes.truncate(max_results);

    (outcomes, true, truncated_count)
}

/// Load inventories and rule sets named by `config` and run them.
pub fn execute(config: &RunConfig) -> anyhow::Result<RunReport> {
    let inventories = config
        .inventories
        .iter()
        .map(|path| {
            Inventory::load(path).with_context(|| format!("loading inventory {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let providers: Vec<&dyn ResourceProvider> = inventories
        .iter()
        .map(|inventory| inventory as &dyn ResourceProvider)
        .collect();
    let mut store = InstanceStore::new(SchemaStore::new());
    let stats = load_providers(&mut store, &providers).context("populating instance store")?;
    tracing::debug!(
        definitions = stats.definitions,
        resources = stats.resources,
        "store populated"
    );

    let sets = load_rule_sets(config.rule_sets.as_slice()).context("loading rule sets")?;
    Ok(RuleRunner::from_config(&store, config).run(&sets))
}

//! Rule set schema types.
//!
//! A rule set is a YAML document naming a set of rules. Each rule targets one
//! resource type, narrows the candidates with `filter` statements and checks
//! them with `assert` statements.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tenet_core::{Statement, TypeRef};
use thiserror::Error;

/// Rule severity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Ordering for truncation and thresholds (lowest severity first).
    pub fn priority(&self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Warning => 1,
            Severity::Error => 2,
        }
    }

    pub fn is_at_or_above(&self, threshold: Severity) -> bool {
        self.priority() >= threshold.priority()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Rule set as loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    /// Rule set identifier.
    pub name: String,

    /// Version string, part of every canonical rule id.
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Validate the rule set definition.
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        if self.name.trim().is_empty() {
            return Err(RuleValidationError::EmptySetName);
        }

        let mut seen_ids = HashSet::new();
        for rule in &self.rules {
            rule.validate(&self.name)?;
            if !seen_ids.insert(rule.id.as_str()) {
                return Err(RuleValidationError::DuplicateRuleId {
                    set: self.name.clone(),
                    rule_id: rule.id.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Rule definition within a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Short rule ID (unique within the set).
    pub id: String,

    /// One-line description, used as the report message.
    pub description: String,

    #[serde(default)]
    pub severity: Severity,

    /// Resource type the rule applies to.
    pub resource: TypeRef,

    /// Statements selecting the instances the rule applies to.
    #[serde(default)]
    pub filter: Vec<Statement>,

    /// Statements every selected instance must satisfy.
    pub assert: Vec<Statement>,

    /// Remediation hint.
    #[serde(default)]
    pub help: Option<String>,
}

impl Rule {
    pub fn validate(&self, set_name: &str) -> Result<(), RuleValidationError> {
        if self.id.trim().is_empty() {
            return Err(RuleValidationError::EmptyRuleId {
                set: set_name.to_string(),
            });
        }
        if self.assert.is_empty() {
            return Err(RuleValidationError::NoAssertions {
                set: set_name.to_string(),
                rule_id: self.id.clone(),
            });
        }
        Ok(())
    }
}

/// Structural problems in a parsed rule set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleValidationError {
    #[error("rule set name must not be empty")]
    EmptySetName,

    #[error("rule set '{set}' contains a rule with an empty id")]
    EmptyRuleId { set: String },

    #[error("rule set '{set}' defines rule '{rule_id}' more than once")]
    DuplicateRuleId { set: String, rule_id: String },

    #[error("rule '{rule_id}' in set '{set}' has no assertions")]
    NoAssertions { set: String, rule_id: String },
}

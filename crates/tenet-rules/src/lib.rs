//! YAML rule sets and inventories on top of `tenet-core`.
//!
//! Rule sets name rules that target one resource type each; inventories
//! supply the definitions and instances. [`execute`] wires both into an
//! instance store and runs every rule, producing a [`RunReport`].

pub mod config;
pub mod inventory;
pub mod loader;
pub mod runner;
pub mod schema;

pub use config::RunConfig;
pub use inventory::Inventory;
pub use loader::{
    load_rule_set, load_rule_set_from_str, load_rule_sets, LoadedRuleSet, RuleError, RuleSource,
};
pub use runner::{execute, RuleOutcome, RuleRunner, RunReport, RunSummary};
pub use schema::{Rule, RuleSet, RuleValidationError, Severity};

//! Filter/assertion expression tree.

use crate::predicate::Predicate;
use serde::{Deserialize, Serialize};

/// Test a plain property against a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyStatement {
    pub name: String,
    pub predicate: Predicate,
}

/// Test the entry `key` of a key-value property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValueStatement {
    pub name: String,
    pub key: String,
    pub predicate: Predicate,
}

/// Descend into a nested property and evaluate child statements there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedStatement {
    pub name: String,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// Follow an association and evaluate child statements on each target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationStatement {
    pub name: String,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// One clause of a rule's filter or assertion set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Property(PropertyStatement),
    KeyValue(KeyValueStatement),
    Nested(NestedStatement),
    Association(AssociationStatement),
}

impl Statement {
    pub fn property(name: impl Into<String>, predicate: Predicate) -> Self {
        Statement::Property(PropertyStatement {
            name: name.into(),
            predicate,
        })
    }

    pub fn key_value(
        name: impl Into<String>,
        key: impl Into<String>,
        predicate: Predicate,
    ) -> Self {
        Statement::KeyValue(KeyValueStatement {
            name: name.into(),
            key: key.into(),
            predicate,
        })
    }

    pub fn nested(name: impl Into<String>, statements: Vec<Statement>) -> Self {
        Statement::Nested(NestedStatement {
            name: name.into(),
            statements,
        })
    }

    pub fn association(name: impl Into<String>, statements: Vec<Statement>) -> Self {
        Statement::Association(AssociationStatement {
            name: name.into(),
            statements,
        })
    }

    /// Name of the member this statement addresses.
    pub fn name(&self) -> &str {
        match self {
            Statement::Property(s) => &s.name,
            Statement::KeyValue(s) => &s.name,
            Statement::Nested(s) => &s.name,
            Statement::Association(s) => &s.name,
        }
    }
}

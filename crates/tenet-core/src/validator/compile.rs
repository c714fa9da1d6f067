//! Lowering of statements into selectors (filters) and evaluators (assertions).

use super::result::{Path, PathSegment, ResourceValidationResult, ValidationError, ValidationResult};
use crate::model::{InstanceRef, NestedValue, PropertyValue, Resource, Scope};
use crate::predicate::{Operand, Predicate};
use crate::statement::Statement;
use crate::store::InstanceStore;
use std::fmt;

/// Match/no-match test of one filter statement.
type Selector = Box<dyn Fn(&InstanceStore, &dyn Scope) -> bool + Send + Sync>;

/// Produces one or more results for one assertion statement.
type Evaluator = Box<dyn Fn(&InstanceStore, &dyn Scope) -> Vec<ValidationResult> + Send + Sync>;

/// Filter and assertion statements compiled once and applied per instance.
///
/// Evaluation only reads the store, so a caller may fan instances out
/// across threads with a shared `&CompiledRule`.
pub struct CompiledRule {
    filters: Vec<Selector>,
    assertions: Vec<Evaluator>,
}

impl CompiledRule {
    pub fn compile(filters: &[Statement], assertions: &[Statement]) -> Self {
        tracing::debug!(
            filters = filters.len(),
            assertions = assertions.len(),
            "compiling statements"
        );
        Self {
            filters: filters.iter().map(compile_filter).collect(),
            assertions: assertions.iter().map(compile_assertion).collect(),
        }
    }

    /// True iff every filter holds (vacuously true with no filters).
    pub fn matches(&self, store: &InstanceStore, resource: &Resource) -> bool {
        self.filters.iter().all(|filter| filter(store, resource))
    }

    /// Evaluate all assertions, in declaration order.
    pub fn evaluate(&self, store: &InstanceStore, resource: &Resource) -> ResourceValidationResult {
        let results = self
            .assertions
            .iter()
            .flat_map(|assertion| assertion(store, resource))
            .collect();
        ResourceValidationResult::new(
            resource.instance_ref.type_ref.clone(),
            resource.id(),
            results,
        )
    }
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("filters", &self.filters.len())
            .field("assertions", &self.assertions.len())
            .finish()
    }
}

fn values_named<'s>(
    scope: &'s dyn Scope,
    name: &'s str,
) -> impl Iterator<Item = &'s PropertyValue> + 's {
    scope
        .properties()
        .iter()
        .filter(move |p| p.name == name)
        .map(|p| &p.value)
}

fn targets_named<'s>(
    scope: &'s dyn Scope,
    name: &'s str,
) -> impl Iterator<Item = &'s InstanceRef> + 's {
    scope
        .associations()
        .iter()
        .filter(move |a| a.name == name)
        .map(|a| &a.target)
}

fn entries_for<'s>(
    scope: &'s dyn Scope,
    name: &'s str,
    key: &'s str,
) -> impl Iterator<Item = Operand> + 's {
    values_named(scope, name).filter_map(move |value| match value {
        PropertyValue::KeyValue { key: k, value } if k == key => {
            Some(Operand::String(value.clone()))
        }
        _ => None,
    })
}

fn compile_filter(statement: &Statement) -> Selector {
    match statement {
        Statement::Property(s) => {
            let name = s.name.clone();
            let predicate = s.predicate.clone();
            Box::new(move |_store: &InstanceStore, scope: &dyn Scope| {
                values_named(scope, &name)
                    .filter_map(Operand::from_value)
                    .any(|actual| predicate.test(&actual))
            })
        }
        Statement::KeyValue(s) => {
            let name = s.name.clone();
            let key = s.key.clone();
            let predicate = s.predicate.clone();
            Box::new(move |_store: &InstanceStore, scope: &dyn Scope| {
                entries_for(scope, &name, &key).any(|actual| predicate.test(&actual))
            })
        }
        Statement::Nested(s) => {
            let name = s.name.clone();
            let children: Vec<Selector> = s.statements.iter().map(compile_filter).collect();
            // One occurrence must satisfy every child on its own.
            Box::new(move |store: &InstanceStore, scope: &dyn Scope| {
                values_named(scope, &name)
                    .filter_map(PropertyValue::as_nested)
                    .any(|nested| children.iter().all(|child| child(store, nested)))
            })
        }
        Statement::Association(s) => {
            let name = s.name.clone();
            let children: Vec<Selector> = s.statements.iter().map(compile_filter).collect();
            Box::new(move |store: &InstanceStore, scope: &dyn Scope| {
                targets_named(scope, &name)
                    .filter_map(|target| store.resource(target))
                    .any(|resource| children.iter().all(|child| child(store, resource)))
            })
        }
    }
}

fn compile_assertion(statement: &Statement) -> Evaluator {
    match statement {
        Statement::Property(s) => {
            let name = s.name.clone();
            let predicate = s.predicate.clone();
            Box::new(move |_store: &InstanceStore, scope: &dyn Scope| {
                let path = Path::of(PathSegment::property(name.as_str()));
                let mut values = values_named(scope, &name).peekable();
                if values.peek().is_none() {
                    return vec![member_not_found(path, &name)];
                }
                let actual = values.filter_map(Operand::from_value).collect();
                vec![check(path, &predicate, actual)]
            })
        }
        Statement::KeyValue(s) => {
            let name = s.name.clone();
            let key = s.key.clone();
            let predicate = s.predicate.clone();
            Box::new(move |_store: &InstanceStore, scope: &dyn Scope| {
                let path = Path::of(PathSegment::key_value(name.as_str(), key.as_str()));
                if values_named(scope, &name).next().is_none() {
                    return vec![member_not_found(path, &name)];
                }
                let actual: Vec<Operand> = entries_for(scope, &name, &key).collect();
                if actual.is_empty() {
                    return vec![ValidationResult::failure(
                        path,
                        ValidationError::KeyNotFound {
                            member: name.clone(),
                            key: key.clone(),
                        },
                    )];
                }
                vec![check(path, &predicate, actual)]
            })
        }
        Statement::Nested(s) => {
            let name = s.name.clone();
            let children: Vec<Evaluator> = s.statements.iter().map(compile_assertion).collect();
            Box::new(move |store: &InstanceStore, scope: &dyn Scope| {
                let segment = PathSegment::nested(name.as_str());
                let occurrences: Vec<&NestedValue> = values_named(scope, &name)
                    .filter_map(PropertyValue::as_nested)
                    .collect();
                match occurrences.as_slice() {
                    [] => vec![member_not_found(Path::of(segment), &name)],
                    [single] => descend(store, *single, &children, &segment),
                    many => {
                        descend(store, &union_of(many), &children, &segment)
                    }
                }
            })
        }
        Statement::Association(s) => {
            let name = s.name.clone();
            let children: Vec<Evaluator> = s.statements.iter().map(compile_assertion).collect();
            Box::new(move |store: &InstanceStore, scope: &dyn Scope| {
                let targets: Vec<&InstanceRef> = targets_named(scope, &name).collect();
                if targets.is_empty() {
                    let path = Path::of(PathSegment::association(name.as_str(), None));
                    return vec![member_not_found(path, &name)];
                }
                targets
                    .into_iter()
                    .flat_map(|target| {
                        let segment =
                            PathSegment::association(name.as_str(), Some(target.id.clone()));
                        match store.resource(target) {
                            Some(resource) => descend(store, resource, &children, &segment),
                            None => vec![member_not_found(Path::of(segment), &name)],
                        }
                    })
                    .collect()
            })
        }
    }
}

/// Evaluate children inside `scope`, prefixing each result with `segment`.
/// Without children the statement only asserts existence.
fn descend(
    store: &InstanceStore,
    scope: &dyn Scope,
    children: &[Evaluator],
    segment: &PathSegment,
) -> Vec<ValidationResult> {
    if children.is_empty() {
        return vec![ValidationResult::success(Path::of(segment.clone()))];
    }
    children
        .iter()
        .flat_map(|child| child(store, scope))
        .map(|result| result.prefixed(segment.clone()))
        .collect()
}

/// Set union of several nested occurrences, in first-seen order.
fn union_of(occurrences: &[&NestedValue]) -> NestedValue {
    let mut merged = NestedValue::default();
    for occurrence in occurrences {
        for property in &occurrence.properties {
            if !merged.properties.contains(property) {
                merged.properties.push(property.clone());
            }
        }
        for association in &occurrence.associations {
            if !merged.associations.contains(association) {
                merged.associations.push(association.clone());
            }
        }
    }
    merged
}

fn member_not_found(path: Path, member: &str) -> ValidationResult {
    ValidationResult::failure(
        path,
        ValidationError::MemberNotFound {
            member: member.to_string(),
        },
    )
}

/// Succeeds if any stored occurrence satisfies the predicate.
fn check(path: Path, predicate: &Predicate, actual: Vec<Operand>) -> ValidationResult {
    if let Some(operator) = predicate.unknown_operator() {
        return ValidationResult::failure(
            path,
            ValidationError::UnknownPredicate {
                operator: operator.to_string(),
            },
        );
    }
    if actual.iter().any(|value| predicate.test(value)) {
        return ValidationResult::success(path);
    }
    ValidationResult::failure(
        path,
        ValidationError::PredicateMismatch {
            kind: predicate.mismatch_kind(),
            predicate: predicate.clone(),
            actual,
        },
    )
}

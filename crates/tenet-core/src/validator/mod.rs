//! Statement evaluation against the instance store.
//!
//! Filters select eligible instances and never produce report entries.
//! Assertions run on each selected instance and yield one
//! [`ValidationResult`] per statement, fanned out through nested and
//! association statements.
//!
//! ```text
//!   filters ──► CompiledRule::matches ──► eligible instances
//!                                              │
//!   asserts ──► CompiledRule::evaluate ◄───────┘
//!                      │
//!                      ▼
//!        ResourceValidationResult { type, id, success, results[path, error] }
//! ```

mod compile;
mod result;

pub use compile::CompiledRule;
pub use result::{Path, PathSegment, ResourceValidationResult, ValidationError, ValidationResult};

use crate::model::{InstanceRef, TypeRef};
use crate::statement::Statement;
use crate::store::InstanceStore;

/// Read-only view over an [`InstanceStore`] that answers existence queries
/// and validates instances.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    store: &'a InstanceStore,
}

impl<'a> Validator<'a> {
    pub fn new(store: &'a InstanceStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a InstanceStore {
        self.store
    }

    pub fn exist_by_id(&self, instance: &InstanceRef) -> bool {
        self.store.exists(instance)
    }

    /// True iff some instance of `type_ref` satisfies every filter.
    pub fn exist_any(&self, type_ref: &TypeRef, filters: &[Statement]) -> bool {
        let compiled = CompiledRule::compile(filters, &[]);
        self.store
            .iter(type_ref)
            .any(|resource| compiled.matches(self.store, resource))
    }

    /// `None` when the instance is missing or filtered out.
    pub fn validate_by_id(
        &self,
        type_ref: &TypeRef,
        id: &str,
        filters: &[Statement],
        assertions: &[Statement],
    ) -> Option<ResourceValidationResult> {
        let resource = self.store.resource(&type_ref.instance(id))?;
        let compiled = CompiledRule::compile(filters, assertions);
        if !compiled.matches(self.store, resource) {
            tracing::debug!(type_ref = %type_ref, id, "instance excluded by filters");
            return None;
        }
        Some(compiled.evaluate(self.store, resource))
    }

    /// Validate every instance of `type_ref` that passes the filters, in store order.
    pub fn validate_all(
        &self,
        type_ref: &TypeRef,
        filters: &[Statement],
        assertions: &[Statement],
    ) -> Vec<ResourceValidationResult> {
        let compiled = CompiledRule::compile(filters, assertions);
        self.validate_compiled(type_ref, &compiled)
    }

    pub fn validate_compiled(
        &self,
        type_ref: &TypeRef,
        compiled: &CompiledRule,
    ) -> Vec<ResourceValidationResult> {
        let results: Vec<_> = self
            .store
            .iter(type_ref)
            .filter(|resource| compiled.matches(self.store, resource))
            .map(|resource| compiled.evaluate(self.store, resource))
            .collect();
        tracing::debug!(
            type_ref = %type_ref,
            selected = results.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "validated instances"
        );
        results
    }
}

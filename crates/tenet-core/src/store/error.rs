//! Error types for schema/instance store writes.

use crate::model::{InstanceRef, TypeRef};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur when writing to the instance store.
///
/// Absent schemas or instances on reads are not errors; they are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No resource definition registered for the instance's type.
    #[error("no resource definition registered for type {type_ref}")]
    UnknownType { type_ref: TypeRef },

    /// An association points at a type with no resource definition.
    #[error("association '{association}' on {instance} targets unregistered type {target}")]
    UnknownAssociationTarget {
        instance: InstanceRef,
        association: String,
        target: TypeRef,
    },

    /// Upsert against an instance that was never stored.
    #[error("instance not found: {instance}")]
    InstanceNotFound { instance: InstanceRef },
}

impl StoreError {
    /// True for referential-integrity violations against the schema.
    pub fn is_schema_integrity(&self) -> bool {
        matches!(
            self,
            Self::UnknownType { .. } | Self::UnknownAssociationTarget { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::InstanceNotFound { .. })
    }
}

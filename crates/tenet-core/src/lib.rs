pub mod model;
pub mod predicate;
pub mod provider;
pub mod statement;
pub mod store;
pub mod validator;

// Convenience re-exports
pub use model::{
    Association, AssociationDef, InstanceRef, NestedValue, Number, ParseTypeRefError, Property,
    PropertyDef, PropertyKind, PropertyValue, Resource, ResourceDef, Scope, TypeRef,
};
pub use predicate::{IpFamily, MismatchKind, Operand, Predicate};
pub use provider::{load_providers, LoadError, LoadStats, ProviderError, ResourceProvider};
pub use statement::{
    AssociationStatement, KeyValueStatement, NestedStatement, PropertyStatement, Statement,
};
pub use store::{InstanceStore, SchemaStore, StoreError, StoreResult};
pub use validator::{
    CompiledRule, Path, PathSegment, ResourceValidationResult, ValidationError, ValidationResult,
    Validator,
};

//! Resource data model.
//!
//! Schema-level types (`ResourceDef`, `PropertyDef`, `AssociationDef`) describe
//! what a resource kind looks like; instance-level types (`Resource`,
//! `PropertyValue`, `Association`) carry the data loaded by providers.

mod instance;
mod schema;

pub use instance::{Association, NestedValue, Number, Property, PropertyValue, Resource, Scope};
pub use schema::{AssociationDef, PropertyDef, ResourceDef};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a resource kind: `provider:group:name`.
///
/// Identity is the string form. `TypeRef::new("a:b", "c", "d")` and
/// `TypeRef::new("a", "b:c", "d")` are the same type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    pub provider: String,
    pub group: String,
    pub name: String,
}

impl TypeRef {
    pub fn new(
        provider: impl Into<String>,
        group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            group: group.into(),
            name: name.into(),
        }
    }

    /// Reference to the instance `id` of this type.
    pub fn instance(&self, id: impl Into<String>) -> InstanceRef {
        InstanceRef::new(self.clone(), id)
    }

    fn joined(&self) -> impl Iterator<Item = u8> + '_ {
        [
            self.provider.as_str(),
            ":",
            self.group.as_str(),
            ":",
            self.name.as_str(),
        ]
        .into_iter()
        .flat_map(str::bytes)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.provider, self.group, self.name)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.joined().eq(other.joined())
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.joined() {
            state.write_u8(byte);
        }
    }
}

// Ordering follows the string form, not field-wise comparison: "a-b:x:y"
// sorts before "a:x:y" because '-' < ':'.
impl Ord for TypeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.joined().cmp(other.joined())
    }
}

impl PartialOrd for TypeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Error returned when a string is not a `provider:group:name` triple.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type reference '{input}': expected provider:group:name")]
pub struct ParseTypeRefError {
    pub input: String,
}

impl FromStr for TypeRef {
    type Err = ParseTypeRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [provider, group, name]
                if !provider.is_empty() && !group.is_empty() && !name.is_empty() =>
            {
                Ok(TypeRef::new(*provider, *group, *name))
            }
            _ => Err(ParseTypeRefError {
                input: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for TypeRef {
    type Error = ParseTypeRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

/// Identifier of one resource instance. The id is unique within its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceRef {
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    pub id: String,
}

impl InstanceRef {
    pub fn new(type_ref: TypeRef, id: impl Into<String>) -> Self {
        Self {
            type_ref,
            id: id.into(),
        }
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_ref, self.id)
    }
}

/// Closed set of property kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Number,
    String,
    Boolean,
    Date,
    KeyValue,
    Nested,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Number => write!(f, "number"),
            PropertyKind::String => write!(f, "string"),
            PropertyKind::Boolean => write!(f, "boolean"),
            PropertyKind::Date => write!(f, "date"),
            PropertyKind::KeyValue => write!(f, "key_value"),
            PropertyKind::Nested => write!(f, "nested"),
        }
    }
}

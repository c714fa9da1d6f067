use crate::model::{ResourceDef, TypeRef};
use std::collections::BTreeMap;

/// Resource definitions keyed by type.
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    defs: BTreeMap<TypeRef, ResourceDef>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace the definition for `def.type_ref`.
    pub fn put(&mut self, def: ResourceDef) {
        let type_ref = def.type_ref.clone();
        if self.defs.insert(type_ref.clone(), def).is_some() {
            tracing::debug!(type_ref = %type_ref, "replaced resource definition");
        } else {
            tracing::debug!(type_ref = %type_ref, "registered resource definition");
        }
    }

    pub fn get(&self, type_ref: &TypeRef) -> Option<&ResourceDef> {
        self.defs.get(type_ref)
    }

    pub fn contains(&self, type_ref: &TypeRef) -> bool {
        self.defs.contains_key(type_ref)
    }

    /// All definitions, ordered by type reference.
    pub fn all(&self) -> impl Iterator<Item = &ResourceDef> {
        self.defs.values()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertyDef, PropertyKind};

    #[test]
    fn test_put_replaces_whole_definition() {
        let t = TypeRef::new("aws", "s3", "bucket");
        let mut store = SchemaStore::new();
        store.put(
            ResourceDef::new(t.clone())
                .with_property(PropertyDef::new("name", PropertyKind::String))
                .with_property(PropertyDef::new("size", PropertyKind::Number)),
        );
        store.put(
            ResourceDef::new(t.clone())
                .with_property(PropertyDef::new("region", PropertyKind::String)),
        );

        let def = store.get(&t).unwrap();
        assert_eq!(def.properties.len(), 1);
        assert!(def.property("name").is_none());
        assert!(def.property("region").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_keys_with_same_string_form_are_one_type() {
        let left = TypeRef::new("a:b", "c", "d");
        let right = TypeRef::new("a", "b:c", "d");
        let mut store = SchemaStore::new();
        store.put(ResourceDef::new(left.clone()));
        assert!(store.contains(&right));
        store.put(
            ResourceDef::new(right.clone())
                .with_property(PropertyDef::new("size", PropertyKind::Number)),
        );
        assert_eq!(store.len(), 1);
        assert!(store.get(&left).unwrap().property("size").is_some());
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = SchemaStore::new();
        assert!(store.get(&TypeRef::new("a", "b", "c")).is_none());
        assert!(store.is_empty());
        assert_eq!(store.all().count(), 0);
    }
}

use super::error::{StoreError, StoreResult};
use super::schema::SchemaStore;
use crate::model::{
    Association, AssociationDef, InstanceRef, Property, PropertyDef, PropertyValue, Resource,
    TypeRef,
};
use std::collections::BTreeMap;

/// Resource instances keyed by type and id, checked against a [`SchemaStore`].
///
/// Each property occurrence is kept as its own entry, so a multi-valued
/// property stores one `Property` per distinct value and nested values own
/// their own property/association lists recursively.
#[derive(Debug, Clone, Default)]
pub struct InstanceStore {
    schemas: SchemaStore,
    instances: BTreeMap<TypeRef, BTreeMap<String, Resource>>,
}

impl InstanceStore {
    pub fn new(schemas: SchemaStore) -> Self {
        Self {
            schemas,
            instances: BTreeMap::new(),
        }
    }

    pub fn schemas(&self) -> &SchemaStore {
        &self.schemas
    }

    pub fn schemas_mut(&mut self) -> &mut SchemaStore {
        &mut self.schemas
    }

    pub fn exists(&self, instance: &InstanceRef) -> bool {
        self.resource(instance).is_some()
    }

    /// Borrow a stored instance.
    pub fn resource(&self, instance: &InstanceRef) -> Option<&Resource> {
        self.instances
            .get(&instance.type_ref)
            .and_then(|by_id| by_id.get(&instance.id))
    }

    pub fn get(&self, instance: &InstanceRef) -> Option<Resource> {
        self.resource(instance).cloned()
    }

    /// Instances of `type_ref` in ascending id order.
    pub fn iter<'a>(&'a self, type_ref: &TypeRef) -> impl Iterator<Item = &'a Resource> + 'a {
        self.instances
            .get(type_ref)
            .into_iter()
            .flat_map(|by_id| by_id.values())
    }

    pub fn list(&self, type_ref: &TypeRef) -> Vec<Resource> {
        self.iter(type_ref).cloned().collect()
    }

    /// Total number of stored instances, stubs included.
    pub fn len(&self) -> usize {
        self.instances.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create the instance or merge into it.
    ///
    /// Fails without writing anything if the instance type, or the type of
    /// any association target, has no registered definition.
    pub fn put(
        &mut self,
        instance: &InstanceRef,
        properties: Vec<Property>,
        associations: Vec<Association>,
    ) -> StoreResult<()> {
        self.write(instance, properties, associations, true)
    }

    pub fn put_resource(&mut self, resource: Resource) -> StoreResult<()> {
        let Resource {
            instance_ref,
            properties,
            associations,
        } = resource;
        self.put(&instance_ref, properties, associations)
    }

    pub fn put_property(&mut self, instance: &InstanceRef, property: Property) -> StoreResult<()> {
        self.put_properties(instance, vec![property])
    }

    /// Upsert properties onto an existing instance.
    pub fn put_properties(
        &mut self,
        instance: &InstanceRef,
        properties: Vec<Property>,
    ) -> StoreResult<()> {
        self.write(instance, properties, Vec::new(), false)
    }

    pub fn put_association(
        &mut self,
        instance: &InstanceRef,
        association: Association,
    ) -> StoreResult<()> {
        self.put_associations(instance, vec![association])
    }

    /// Upsert associations onto an existing instance.
    pub fn put_associations(
        &mut self,
        instance: &InstanceRef,
        associations: Vec<Association>,
    ) -> StoreResult<()> {
        self.write(instance, Vec::new(), associations, false)
    }

    fn write(
        &mut self,
        instance: &InstanceRef,
        properties: Vec<Property>,
        associations: Vec<Association>,
        create: bool,
    ) -> StoreResult<()> {
        let def = self
            .schemas
            .get(&instance.type_ref)
            .ok_or_else(|| StoreError::UnknownType {
                type_ref: instance.type_ref.clone(),
            })?;

        let exists = self
            .instances
            .get(&instance.type_ref)
            .is_some_and(|by_id| by_id.contains_key(&instance.id));
        if !create && !exists {
            return Err(StoreError::InstanceNotFound {
                instance: instance.clone(),
            });
        }

        let properties = conform_properties(instance, &def.properties, properties);
        let associations = conform_associations(instance, &def.associations, associations);

        // Validate every link before touching the map so a failure leaves no trace.
        let mut links = Vec::new();
        collect_links(&properties, &associations, &mut links);
        for link in &links {
            if !self.schemas.contains(&link.target.type_ref) {
                return Err(StoreError::UnknownAssociationTarget {
                    instance: instance.clone(),
                    association: link.name.clone(),
                    target: link.target.type_ref.clone(),
                });
            }
        }

        let resource = self
            .instances
            .entry(instance.type_ref.clone())
            .or_default()
            .entry(instance.id.clone())
            .or_insert_with(|| Resource::new(instance.clone()));
        merge_properties(&mut resource.properties, &def.properties, properties);
        merge_associations(&mut resource.associations, &def.associations, associations);

        if exists {
            tracing::debug!(instance = %instance, "merged instance");
        } else {
            tracing::debug!(instance = %instance, "created instance");
        }

        for link in links {
            let by_id = self
                .instances
                .entry(link.target.type_ref.clone())
                .or_default();
            if !by_id.contains_key(&link.target.id) {
                tracing::debug!(
                    instance = %link.target,
                    association = %link.name,
                    "created stub for association target"
                );
                by_id.insert(link.target.id.clone(), Resource::stub(link.target.clone()));
            }
        }

        Ok(())
    }
}

/// Drop properties that are undeclared in this scope or have the wrong kind.
fn conform_properties(
    owner: &InstanceRef,
    defs: &[PropertyDef],
    properties: Vec<Property>,
) -> Vec<Property> {
    properties
        .into_iter()
        .filter_map(|property| conform_property(owner, defs, property))
        .collect()
}

fn conform_property(
    owner: &InstanceRef,
    defs: &[PropertyDef],
    mut property: Property,
) -> Option<Property> {
    let Some(def) = defs.iter().find(|d| d.name == property.name) else {
        tracing::warn!(
            instance = %owner,
            property = %property.name,
            "skipping undeclared property"
        );
        return None;
    };

    let kind = property.value.kind();
    if kind != def.kind {
        tracing::warn!(
            instance = %owner,
            property = %property.name,
            expected = %def.kind,
            actual = %kind,
            "skipping property with mismatched kind"
        );
        return None;
    }

    if let PropertyValue::Nested(nested) = &mut property.value {
        let children = std::mem::take(&mut nested.properties);
        let children = conform_properties(owner, &def.properties, children);
        merge_properties(&mut nested.properties, &def.properties, children);
        let links = std::mem::take(&mut nested.associations);
        let links = conform_associations(owner, &def.associations, links);
        merge_associations(&mut nested.associations, &def.associations, links);
    }

    Some(property)
}

fn conform_associations(
    owner: &InstanceRef,
    defs: &[AssociationDef],
    associations: Vec<Association>,
) -> Vec<Association> {
    associations
        .into_iter()
        .filter(|association| {
            let Some(def) = defs.iter().find(|d| d.name == association.name) else {
                tracing::warn!(
                    instance = %owner,
                    association = %association.name,
                    "skipping undeclared association"
                );
                return false;
            };
            if def.target != association.target.type_ref {
                tracing::warn!(
                    instance = %owner,
                    association = %association.name,
                    expected = %def.target,
                    actual = %association.target.type_ref,
                    "skipping association with mismatched target type"
                );
                return false;
            }
            true
        })
        .collect()
}

/// Multi-valued properties are sets; single-valued ones are replaced by name.
fn merge_properties(existing: &mut Vec<Property>, defs: &[PropertyDef], incoming: Vec<Property>) {
    for property in incoming {
        let multi_valued = defs
            .iter()
            .find(|d| d.name == property.name)
            .is_some_and(|d| d.multi_valued);
        if multi_valued {
            if !existing.contains(&property) {
                existing.push(property);
            }
        } else if let Some(slot) = existing.iter_mut().find(|p| p.name == property.name) {
            *slot = property;
        } else {
            existing.push(property);
        }
    }
}

fn merge_associations(
    existing: &mut Vec<Association>,
    defs: &[AssociationDef],
    incoming: Vec<Association>,
) {
    for association in incoming {
        let to_many = defs
            .iter()
            .find(|d| d.name == association.name)
            .is_some_and(|d| d.to_many);
        if to_many {
            if !existing.contains(&association) {
                existing.push(association);
            }
        } else if let Some(slot) = existing.iter_mut().find(|a| a.name == association.name) {
            *slot = association;
        } else {
            existing.push(association);
        }
    }
}

fn collect_links(
    properties: &[Property],
    associations: &[Association],
    out: &mut Vec<Association>,
) {
    out.extend(associations.iter().cloned());
    for property in properties {
        if let PropertyValue::Nested(nested) = &property.value {
            collect_links(&nested.properties, &nested.associations, out);
        }
    }
}

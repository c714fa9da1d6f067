//! File-backed resource provider.
//!
//! An inventory is a YAML snapshot of resource definitions and instances,
//! typically exported by a collector that talked to the real platform.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tenet_core::{ProviderError, Resource, ResourceDef, ResourceProvider};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inventory {
    pub name: String,

    #[serde(default)]
    pub definitions: Vec<ResourceDef>,

    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Inventory {
    pub fn from_yaml_str(content: &str) -> Result<Self, ProviderError> {
        serde_yaml::from_str(content)
            .map_err(|e| ProviderError::with_source("failed to parse inventory YAML", e))
    }

    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::with_source(format!("failed to read inventory {}", path.display()), e)
        })?;
        let inventory = Self::from_yaml_str(&content)?;
        tracing::debug!(
            inventory = %inventory.name,
            definitions = inventory.definitions.len(),
            resources = inventory.resources.len(),
            "loaded inventory"
        );
        Ok(inventory)
    }
}

impl ResourceProvider for Inventory {
    fn name(&self) -> &str {
        &self.name
    }

    fn definitions(&self) -> Vec<ResourceDef> {
        self.definitions.clone()
    }

    fn resources(&self) -> Result<Vec<Resource>, ProviderError> {
        Ok(self.resources.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenet_core::{InstanceStore, PropertyKind, PropertyValue, SchemaStore, TypeRef};

    const INVENTORY: &str = r#"
name: prod-account
definitions:
  - type: aws:kms:key
    properties:
      - name: rotation
        kind: boolean
  - type: aws:s3:bucket
    description: S3 bucket
    properties:
      - name: public
        kind: boolean
      - name: tags
        kind: key_value
        multi_valued: true
    associations:
      - name: key
        target: aws:kms:key
resources:
  - ref: { type: aws:s3:bucket, id: logs }
    properties:
      - name: public
        value: { boolean: false }
      - name: tags
        value: { key_value: { key: env, value: prod } }
    associations:
      - name: key
        target: { type: aws:kms:key, id: k1 }
"#;

    #[test]
    fn test_parse_inventory() {
        let inventory = Inventory::from_yaml_str(INVENTORY).unwrap();
        assert_eq!(inventory.name(), "prod-account");
        assert_eq!(inventory.definitions.len(), 2);
        assert_eq!(
            inventory.definitions[1].property("tags").unwrap().kind,
            PropertyKind::KeyValue
        );

        let resources = inventory.resources().unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(
            resources[0].properties[1].value,
            PropertyValue::key_value("env", "prod")
        );
    }

    #[test]
    fn test_inventory_feeds_store() {
        let inventory = Inventory::from_yaml_str(INVENTORY).unwrap();
        let mut store = InstanceStore::new(SchemaStore::new());
        let stats = tenet_core::load_providers(&mut store, &[&inventory]).unwrap();
        assert_eq!(stats.definitions, 2);
        assert_eq!(stats.resources, 1);

        let key = TypeRef::new("aws", "kms", "key").instance("k1");
        assert!(store.exists(&key), "association target should be stubbed");
    }

    #[test]
    fn test_bad_inventory_is_provider_error() {
        let err = Inventory::from_yaml_str("name: x\nunknown: 1\n").unwrap_err();
        assert!(err.to_string().contains("inventory"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

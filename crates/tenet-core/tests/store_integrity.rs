use chrono::{TimeZone, Utc};
use tenet_core::{
    Association, AssociationDef, InstanceStore, NestedValue, Property, PropertyDef, PropertyKind,
    PropertyValue, Resource, ResourceDef, SchemaStore, StoreError, TypeRef,
};

fn vpc() -> TypeRef {
    TypeRef::new("aws", "ec2", "vpc")
}

fn instance_type() -> TypeRef {
    TypeRef::new("aws", "ec2", "instance")
}

fn instance_def() -> ResourceDef {
    ResourceDef::new(instance_type())
        .describe("EC2 instance")
        .with_property(PropertyDef::new("name", PropertyKind::String).describe("Name tag"))
        .with_property(PropertyDef::new("cpu", PropertyKind::Number))
        .with_property(PropertyDef::new("public", PropertyKind::Boolean))
        .with_property(PropertyDef::new("launched", PropertyKind::Date))
        .with_property(PropertyDef::new("tags", PropertyKind::KeyValue).multi_valued())
        .with_property(
            PropertyDef::nested(
                "interface",
                vec![
                    PropertyDef::new("address", PropertyKind::String).multi_valued(),
                    PropertyDef::nested(
                        "rule",
                        vec![PropertyDef::new("port", PropertyKind::Number)],
                        vec![],
                    )
                    .multi_valued(),
                ],
                vec![AssociationDef::new("vpc", vpc())],
            )
            .multi_valued()
            .with_examples("{address: 10.0.0.1}"),
        )
        .with_association(AssociationDef::new("vpc", vpc()).describe("Owning VPC"))
}

fn populated_store() -> InstanceStore {
    let mut schemas = SchemaStore::new();
    schemas.put(
        ResourceDef::new(vpc()).with_property(PropertyDef::new("cidr", PropertyKind::String)),
    );
    schemas.put(instance_def());
    InstanceStore::new(schemas)
}

fn sample_resource() -> Resource {
    Resource::new(instance_type().instance("i-1"))
        .property("name", "web")
        .property("cpu", 4)
        .property("public", false)
        .property("launched", Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        .property("tags", PropertyValue::key_value("env", "prod"))
        .property("tags", PropertyValue::key_value("team", "core"))
        .property(
            "interface",
            NestedValue::new()
                .property("address", "10.0.0.5")
                .property("address", "10.0.0.6")
                .property("rule", NestedValue::new().property("port", 22))
                .property("rule", NestedValue::new().property("port", 443))
                .association("vpc", vpc().instance("vpc-1")),
        )
        .association("vpc", vpc().instance("vpc-1"))
}

#[test]
fn test_schema_roundtrip_with_nesting() {
    let mut schemas = SchemaStore::new();
    let def = instance_def();
    schemas.put(def.clone());
    assert_eq!(schemas.get(&instance_type()), Some(&def));
    assert_eq!(
        schemas
            .get(&instance_type())
            .unwrap()
            .property_by_path("interface.rule.port")
            .unwrap()
            .kind,
        PropertyKind::Number
    );
}

#[test]
fn test_instance_roundtrip() {
    let mut store = populated_store();
    let resource = sample_resource();
    store
        .put(
            &resource.instance_ref,
            resource.properties.clone(),
            resource.associations.clone(),
        )
        .unwrap();

    assert_eq!(store.get(&resource.instance_ref), Some(resource));
}

#[test]
fn test_unregistered_type_leaves_store_unchanged() {
    let mut store = InstanceStore::new(SchemaStore::new());
    let unknown = TypeRef::new("gcp", "compute", "disk").instance("d-1");

    let err = store
        .put(&unknown, vec![Property::new("size", 10)], vec![])
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::UnknownType {
            type_ref: unknown.type_ref.clone()
        }
    );
    assert!(!store.exists(&unknown));
    assert!(store.get(&unknown).is_none());

    let err = store
        .put_property(&unknown, Property::new("size", 10))
        .unwrap_err();
    assert!(err.is_schema_integrity());
    let err = store
        .put_association(&unknown, Association::new("vpc", vpc().instance("vpc-1")))
        .unwrap_err();
    assert!(err.is_schema_integrity());
    assert!(store.is_empty());
}

#[test]
fn test_unregistered_association_target_is_atomic() {
    let mut schemas = SchemaStore::new();
    // The instance type is known but its association target type is not.
    schemas.put(instance_def());
    let mut store = InstanceStore::new(schemas);
    let instance = instance_type().instance("i-1");

    let err = store
        .put(
            &instance,
            vec![Property::new("name", "web")],
            vec![Association::new("vpc", vpc().instance("vpc-1"))],
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownAssociationTarget { .. }));
    assert!(!store.exists(&instance));
    assert!(!store.exists(&vpc().instance("vpc-1")));
}

#[test]
fn test_association_stubbing() {
    let mut store = populated_store();
    let instance = instance_type().instance("i-1");
    store.put(&instance, vec![], vec![]).unwrap();

    let target = vpc().instance("vpc-new");
    assert!(!store.exists(&target));
    store
        .put_association(&instance, Association::new("vpc", target.clone()))
        .unwrap();

    assert!(store.exists(&target));
    let stub = store.get(&target).unwrap();
    assert!(stub.properties.is_empty());
    assert!(stub.associations.is_empty());

    // A later detail load fills the stub in place.
    store
        .put(&target, vec![Property::new("cidr", "10.0.0.0/16")], vec![])
        .unwrap();
    assert_eq!(store.get(&target).unwrap().properties.len(), 1);
}

#[test]
fn test_list_is_ordered_by_id() {
    let mut store = populated_store();
    for id in ["i-3", "i-1", "i-2"] {
        store
            .put(&instance_type().instance(id), vec![Property::new("cpu", 2)], vec![])
            .unwrap();
    }
    let ids: Vec<String> = store
        .list(&instance_type())
        .into_iter()
        .map(|r| r.instance_ref.id)
        .collect();
    assert_eq!(ids, vec!["i-1", "i-2", "i-3"]);
    assert!(store.list(&vpc()).is_empty());
}

#[test]
fn test_non_conforming_data_is_skipped() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut store = populated_store();
    let instance = instance_type().instance("i-9");
    store
        .put(
            &instance,
            vec![
                Property::new("cpu", "four"),
                Property::new("undeclared", 1),
                Property::new("name", "ok"),
            ],
            vec![Association::new("subnet", vpc().instance("vpc-1"))],
        )
        .unwrap();

    let stored = store.get(&instance).unwrap();
    assert_eq!(stored.properties, vec![Property::new("name", "ok")]);
    assert!(stored.associations.is_empty());
    assert!(!store.exists(&vpc().instance("vpc-1")));
}

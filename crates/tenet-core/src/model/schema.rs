use super::{PropertyKind, TypeRef};
use serde::{Deserialize, Serialize};

/// Schema of one property. Only `Nested` properties carry child definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: PropertyKind,
    #[serde(default)]
    pub multi_valued: bool,
    /// Free-form example values, shown to rule authors.
    #[serde(default)]
    pub example_values: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<AssociationDef>,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            multi_valued: false,
            example_values: String::new(),
            properties: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// A `Nested` property owning the given child definitions.
    pub fn nested(
        name: impl Into<String>,
        properties: Vec<PropertyDef>,
        associations: Vec<AssociationDef>,
    ) -> Self {
        Self {
            properties,
            associations,
            ..Self::new(name, PropertyKind::Nested)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn with_examples(mut self, examples: impl Into<String>) -> Self {
        self.example_values = examples.into();
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.name == name)
    }
}

/// Declares that a resource (or a nested property) may link to instances of `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub target: TypeRef,
    #[serde(default)]
    pub to_many: bool,
}

impl AssociationDef {
    pub fn new(name: impl Into<String>, target: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            target,
            to_many: false,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn to_many(mut self) -> Self {
        self.to_many = true;
        self
    }
}

/// Schema of a resource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDef {
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub associations: Vec<AssociationDef>,
}

impl ResourceDef {
    pub fn new(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            description: String::new(),
            properties: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_association(mut self, association: AssociationDef) -> Self {
        self.associations.push(association);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// Resolve a dotted path (`network.interfaces.address`) to a property definition.
    ///
    /// Every segment but the last must name a `Nested` property.
    pub fn property_by_path(&self, path: &str) -> Option<&PropertyDef> {
        let (scope, last) = self.resolve_scope(path)?;
        match scope {
            None => self.property(last),
            Some(parent) => parent.property(last),
        }
    }

    /// Resolve a dotted path whose last segment names an association.
    pub fn association_by_path(&self, path: &str) -> Option<&AssociationDef> {
        let (scope, last) = self.resolve_scope(path)?;
        match scope {
            None => self.association(last),
            Some(parent) => parent.association(last),
        }
    }

    /// Walk all but the last segment. `None` scope means top level.
    fn resolve_scope<'a, 'p>(
        &'a self,
        path: &'p str,
    ) -> Option<(Option<&'a PropertyDef>, &'p str)> {
        let mut segments = path.split('.');
        let mut last = segments.next().filter(|s| !s.is_empty())?;
        let mut scope: Option<&PropertyDef> = None;

        for segment in segments {
            if segment.is_empty() {
                return None;
            }
            let next = match scope {
                None => self.property(last)?,
                Some(parent) => parent.property(last)?,
            };
            if next.kind != PropertyKind::Nested {
                return None;
            }
            scope = Some(next);
            last = segment;
        }

        Some((scope, last))
    }
}

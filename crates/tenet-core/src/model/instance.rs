use super::{InstanceRef, PropertyKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Numeric property value. Integer and float values compare numerically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

/// Exact comparison of an integer with a float. Going through `f64` would
/// merge integers above 2^53 with their nearest float.
fn cmp_int_float(int: i64, float: f64) -> Option<Ordering> {
    // 2^63, one past i64::MAX.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() {
        return None;
    }
    if float >= LIMIT {
        return Some(Ordering::Less);
    }
    if float < -LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(float - whole)),
        ord => Some(ord),
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (Number::Int(a), Number::Float(b)) => cmp_int_float(a, b),
            (Number::Float(a), Number::Int(b)) => cmp_int_float(b, a).map(Ordering::reverse),
            (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(i64::from(value))
    }
}

impl From<u32> for Number {
    fn from(value: u32) -> Self {
        Number::Int(i64::from(value))
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

/// A stored property value, mirroring [`PropertyKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Number(Number),
    String(String),
    Boolean(bool),
    Date(DateTime<Utc>),
    KeyValue { key: String, value: String },
    Nested(NestedValue),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Number(_) => PropertyKind::Number,
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Boolean(_) => PropertyKind::Boolean,
            PropertyValue::Date(_) => PropertyKind::Date,
            PropertyValue::KeyValue { .. } => PropertyKind::KeyValue,
            PropertyValue::Nested(_) => PropertyKind::Nested,
        }
    }

    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        PropertyValue::KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn as_nested(&self) -> Option<&NestedValue> {
        match self {
            PropertyValue::Nested(nested) => Some(nested),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(Number::Int(value))
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Number(Number::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(Number::Float(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::Date(value)
    }
}

impl From<NestedValue> for PropertyValue {
    fn from(value: NestedValue) -> Self {
        PropertyValue::Nested(value)
    }
}

/// One named occurrence of a property. Multi-valued properties appear once per value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A named link to another instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub name: String,
    pub target: InstanceRef,
}

impl Association {
    pub fn new(name: impl Into<String>, target: InstanceRef) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

/// Anything that owns a property list and an association list.
///
/// Both resources and nested property values are scopes, which lets the
/// validator descend through either the same way.
pub trait Scope {
    fn properties(&self) -> &[Property];
    fn associations(&self) -> &[Association];
}

/// Contents of a `Nested` property value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedValue {
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub associations: Vec<Association>,
}

impl NestedValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push(Property::new(name, value));
        self
    }

    pub fn association(mut self, name: impl Into<String>, target: InstanceRef) -> Self {
        self.associations.push(Association::new(name, target));
        self
    }
}

impl Scope for NestedValue {
    fn properties(&self) -> &[Property] {
        &self.properties
    }

    fn associations(&self) -> &[Association] {
        &self.associations
    }
}

/// A resource instance as produced by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "ref")]
    pub instance_ref: InstanceRef,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub associations: Vec<Association>,
}

impl Resource {
    pub fn new(instance_ref: InstanceRef) -> Self {
        Self {
            instance_ref,
            properties: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Placeholder for an association target whose details are not loaded yet.
    pub fn stub(instance_ref: InstanceRef) -> Self {
        Self::new(instance_ref)
    }

    pub fn id(&self) -> &str {
        &self.instance_ref.id
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push(Property::new(name, value));
        self
    }

    pub fn association(mut self, name: impl Into<String>, target: InstanceRef) -> Self {
        self.associations.push(Association::new(name, target));
        self
    }
}

impl Scope for Resource {
    fn properties(&self) -> &[Property] {
        &self.properties
    }

    fn associations(&self) -> &[Association] {
        &self.associations
    }
}

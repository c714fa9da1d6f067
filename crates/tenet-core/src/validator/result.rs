//! Validation outcomes and the paths that locate them.

use crate::model::TypeRef;
use crate::predicate::{MismatchKind, Operand, Predicate};
use serde::Serialize;
use std::fmt;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathSegment {
    Property {
        name: String,
    },
    NestedProperty {
        name: String,
    },
    KeyValueProperty {
        name: String,
        key: String,
    },
    Association {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

impl PathSegment {
    pub fn property(name: impl Into<String>) -> Self {
        PathSegment::Property { name: name.into() }
    }

    pub fn nested(name: impl Into<String>) -> Self {
        PathSegment::NestedProperty { name: name.into() }
    }

    pub fn key_value(name: impl Into<String>, key: impl Into<String>) -> Self {
        PathSegment::KeyValueProperty {
            name: name.into(),
            key: key.into(),
        }
    }

    pub fn association(name: impl Into<String>, target: Option<String>) -> Self {
        PathSegment::Association {
            name: name.into(),
            target,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PathSegment::Property { name }
            | PathSegment::NestedProperty { name }
            | PathSegment::KeyValueProperty { name, .. }
            | PathSegment::Association { name, .. } => name,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Property { name } | PathSegment::NestedProperty { name } => {
                write!(f, "{}", name)
            }
            PathSegment::KeyValueProperty { name, key } => write!(f, "{}[{}]", name, key),
            PathSegment::Association { name, target: None } => write!(f, "{}", name),
            PathSegment::Association {
                name,
                target: Some(target),
            } => write!(f, "{}({})", name, target),
        }
    }
}

/// Location of a check inside a resource, outermost segment first.
///
/// Rendered dotted, with `->` after an association hop:
/// `network.nic[env]`, `subnet(subnet-1)->cidr`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(segment: PathSegment) -> Self {
        Self(vec![segment])
    }

    pub fn prepend(&mut self, segment: PathSegment) {
        self.0.insert(0, segment);
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                match &self.0[i - 1] {
                    PathSegment::Association { .. } => write!(f, "->")?,
                    _ => write!(f, ".")?,
                }
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Why an assertion failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ValidationError {
    /// The property or association does not exist in this scope.
    MemberNotFound { member: String },
    /// The key-value property exists but has no entry for `key`.
    KeyNotFound { member: String, key: String },
    /// No stored value satisfies the predicate.
    PredicateMismatch {
        kind: MismatchKind,
        predicate: Predicate,
        actual: Vec<Operand>,
    },
    UnknownPredicate { operator: String },
}

impl ValidationError {
    /// Expected operands of a mismatch; empty for other errors.
    pub fn expected(&self) -> Vec<Operand> {
        match self {
            ValidationError::PredicateMismatch { predicate, .. } => predicate.expected(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MemberNotFound { member } => write!(f, "'{}' not found", member),
            ValidationError::KeyNotFound { member, key } => {
                write!(f, "key '{}' not found in '{}'", key, member)
            }
            ValidationError::PredicateMismatch {
                predicate, actual, ..
            } => {
                let actual = actual
                    .iter()
                    .map(|o| o.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "expected value {}, found [{}]", predicate, actual)
            }
            ValidationError::UnknownPredicate { operator } => {
                write!(f, "unknown predicate '{}'", operator)
            }
        }
    }
}

/// Outcome of one assertion (or one fan-out leaf of a nested assertion).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub path: Path,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationError>,
}

impl ValidationResult {
    pub fn success(path: Path) -> Self {
        Self {
            path,
            success: true,
            error: None,
        }
    }

    pub fn failure(path: Path, error: ValidationError) -> Self {
        Self {
            path,
            success: false,
            error: Some(error),
        }
    }

    pub(crate) fn prefixed(mut self, segment: PathSegment) -> Self {
        self.path.prepend(segment);
        self
    }
}

/// All assertion outcomes for one instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceValidationResult {
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    pub id: String,
    pub success: bool,
    pub results: Vec<ValidationResult>,
}

impl ResourceValidationResult {
    pub fn new(type_ref: TypeRef, id: impl Into<String>, results: Vec<ValidationResult>) -> Self {
        Self {
            type_ref,
            id: id.into(),
            success: results.iter().all(|r| r.success),
            results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_rendering() {
        let path = Path::from(vec![
            PathSegment::nested("network"),
            PathSegment::association("subnet", Some("subnet-1".into())),
            PathSegment::key_value("tags", "env"),
        ]);
        assert_eq!(path.to_string(), "network.subnet(subnet-1)->tags[env]");
        assert_eq!(Path::new().to_string(), "");
    }

    #[test]
    fn test_prefixed_prepends() {
        let result = ValidationResult::success(Path::of(PathSegment::property("port")))
            .prefixed(PathSegment::nested("firewall"));
        assert_eq!(result.path.to_string(), "firewall.port");
        assert_eq!(result.path.segments()[0].name(), "firewall");
    }

    #[test]
    fn test_resource_result_success_is_conjunction() {
        let t = TypeRef::new("a", "b", "c");
        let ok = ValidationResult::success(Path::of(PathSegment::property("x")));
        let bad = ValidationResult::failure(
            Path::of(PathSegment::property("y")),
            ValidationError::MemberNotFound { member: "y".into() },
        );
        assert!(ResourceValidationResult::new(t.clone(), "1", vec![ok.clone()]).success);
        let mixed = ResourceValidationResult::new(t.clone(), "1", vec![ok, bad]);
        assert!(!mixed.success);
        assert_eq!(mixed.failures().count(), 1);
        // Vacuously true with no assertions.
        assert!(ResourceValidationResult::new(t, "1", vec![]).success);
    }

    #[test]
    fn test_error_json_shape() {
        let err = ValidationError::PredicateMismatch {
            kind: MismatchKind::Containment,
            predicate: Predicate::Within(vec![1.into(), 2.into()]),
            actual: vec![9.into()],
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "predicate_mismatch");
        assert_eq!(json["kind"], "containment");
        assert_eq!(json["actual"], serde_json::json!([9]));
        assert_eq!(err.to_string(), "expected value within [1, 2], found [9]");
    }
}

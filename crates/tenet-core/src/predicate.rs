//! Value-comparison operators used inside statements.
//!
//! Every predicate is total: a malformed operand (an unparsable IP literal,
//! a string compared against a date, ...) evaluates to `false` instead of
//! failing, and the validator reports the mismatch.

use crate::model::{Number, PropertyValue};
use chrono::{DateTime, Utc};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;

/// A literal compared against stored values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Null,
    Boolean(bool),
    Number(Number),
    Date(DateTime<Utc>),
    String(String),
}

impl Operand {
    /// Scalar view of a stored value. Key-value entries and nested values have none.
    pub fn from_value(value: &PropertyValue) -> Option<Operand> {
        match value {
            PropertyValue::Number(n) => Some(Operand::Number(*n)),
            PropertyValue::String(s) => Some(Operand::String(s.clone())),
            PropertyValue::Boolean(b) => Some(Operand::Boolean(*b)),
            PropertyValue::Date(d) => Some(Operand::Date(*d)),
            PropertyValue::KeyValue { .. } | PropertyValue::Nested(_) => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Operand::String(s) => Some(s),
            _ => None,
        }
    }

    fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Operand::Date(d) => Some(*d),
            Operand::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            _ => None,
        }
    }

    fn loosely_equals(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::Null, Operand::Null) => true,
            (Operand::Boolean(a), Operand::Boolean(b)) => a == b,
            (Operand::Number(a), Operand::Number(b)) => a == b,
            (Operand::String(a), Operand::String(b)) => a == b,
            (Operand::Date(_), _) | (_, Operand::Date(_)) => {
                matches!((self.as_date(), other.as_date()), (Some(a), Some(b)) if a == b)
            }
            _ => false,
        }
    }

    fn compare(&self, other: &Operand) -> Option<Ordering> {
        match (self, other) {
            (Operand::Boolean(a), Operand::Boolean(b)) => Some(a.cmp(b)),
            (Operand::Number(a), Operand::Number(b)) => a.partial_cmp(b),
            (Operand::String(a), Operand::String(b)) => Some(a.cmp(b)),
            (Operand::Date(_), _) | (_, Operand::Date(_)) => {
                Some(self.as_date()?.cmp(&other.as_date()?))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Null => write!(f, "null"),
            Operand::Boolean(b) => write!(f, "{}", b),
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Operand::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::String(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::String(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Number(Number::Int(value))
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Number(Number::from(value))
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Number(Number::Float(value))
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Operand {
    fn from(value: DateTime<Utc>) -> Self {
        Operand::Date(value)
    }
}

/// IP address family for [`Predicate::IpVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    V4,
    V6,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "v4"),
            IpFamily::V6 => write!(f, "v6"),
        }
    }
}

/// How a failed predicate is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    Simple,
    Containment,
}

/// Closed operator catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Eq(Operand),
    NotEq(Operand),
    Lt(Operand),
    Le(Operand),
    Gt(Operand),
    Ge(Operand),
    Within(Vec<Operand>),
    Without(Vec<Operand>),
    StartsWith(String),
    NotStartsWith(String),
    EndsWith(String),
    NotEndsWith(String),
    Contains(String),
    NotContains(String),
    IpEq(String),
    IpNotEq(String),
    IpLt(String),
    IpLe(String),
    IpGt(String),
    IpGe(String),
    IpVersion(IpFamily),
    IpInNetwork(String),
    IpNotInNetwork(String),
    Before(DateTime<Utc>),
    NotBefore(DateTime<Utc>),
    After(DateTime<Utc>),
    NotAfter(DateTime<Utc>),
    /// Only used to express ranges; see [`Predicate::between`].
    And(Box<Predicate>, Box<Predicate>),
    /// Placeholder for an operator this engine does not implement.
    Unknown(String),
}

impl Predicate {
    /// `lo <= value < hi` for numbers and strings.
    pub fn between(lo: impl Into<Operand>, hi: impl Into<Operand>) -> Self {
        Predicate::And(
            Box::new(Predicate::Ge(lo.into())),
            Box::new(Predicate::Lt(hi.into())),
        )
    }

    /// `lo <= value < hi` for dates.
    pub fn date_between(lo: DateTime<Utc>, hi: DateTime<Utc>) -> Self {
        Predicate::And(
            Box::new(Predicate::NotBefore(lo)),
            Box::new(Predicate::Before(hi)),
        )
    }

    /// Name of the first unimplemented operator, searching through `And`.
    pub fn unknown_operator(&self) -> Option<&str> {
        match self {
            Predicate::Unknown(op) => Some(op),
            Predicate::And(a, b) => a.unknown_operator().or_else(|| b.unknown_operator()),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.unknown_operator().is_some()
    }

    /// Evaluate against one actual value. Never panics.
    pub fn test(&self, actual: &Operand) -> bool {
        match self {
            Predicate::Eq(expected) => actual.loosely_equals(expected),
            Predicate::NotEq(expected) => !actual.loosely_equals(expected),
            Predicate::Lt(expected) => actual.compare(expected) == Some(Ordering::Less),
            Predicate::Le(expected) => matches!(
                actual.compare(expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Predicate::Gt(expected) => actual.compare(expected) == Some(Ordering::Greater),
            Predicate::Ge(expected) => matches!(
                actual.compare(expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Predicate::Within(set) => set.iter().any(|c| actual.loosely_equals(c)),
            Predicate::Without(set) => !set.iter().any(|c| actual.loosely_equals(c)),
            Predicate::StartsWith(affix) => text(actual, |s| s.starts_with(affix.as_str())),
            Predicate::NotStartsWith(affix) => text(actual, |s| !s.starts_with(affix.as_str())),
            Predicate::EndsWith(affix) => text(actual, |s| s.ends_with(affix.as_str())),
            Predicate::NotEndsWith(affix) => text(actual, |s| !s.ends_with(affix.as_str())),
            Predicate::Contains(part) => text(actual, |s| s.contains(part.as_str())),
            Predicate::NotContains(part) => text(actual, |s| !s.contains(part.as_str())),
            Predicate::IpEq(expected) => ip_pair(actual, expected).is_some_and(|(a, e)| a == e),
            Predicate::IpNotEq(expected) => ip_pair(actual, expected).is_some_and(|(a, e)| a != e),
            Predicate::IpLt(expected) => ip_order(actual, expected) == Some(Ordering::Less),
            Predicate::IpLe(expected) => matches!(
                ip_order(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Predicate::IpGt(expected) => ip_order(actual, expected) == Some(Ordering::Greater),
            Predicate::IpGe(expected) => matches!(
                ip_order(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Predicate::IpVersion(family) => match actual.as_str().and_then(parse_ip) {
                Some(IpNet::V4(_)) => *family == IpFamily::V4,
                Some(IpNet::V6(_)) => *family == IpFamily::V6,
                None => false,
            },
            Predicate::IpInNetwork(network) => {
                ip_pair(actual, network).is_some_and(|(a, net)| net.contains(&a))
            }
            Predicate::IpNotInNetwork(network) => {
                ip_pair(actual, network).is_some_and(|(a, net)| !net.contains(&a))
            }
            Predicate::Before(limit) => actual.as_date().is_some_and(|d| d < *limit),
            Predicate::NotBefore(limit) => actual.as_date().is_some_and(|d| d >= *limit),
            Predicate::After(limit) => actual.as_date().is_some_and(|d| d > *limit),
            Predicate::NotAfter(limit) => actual.as_date().is_some_and(|d| d <= *limit),
            Predicate::And(a, b) => a.test(actual) && b.test(actual),
            Predicate::Unknown(_) => false,
        }
    }

    /// Stable operator name, used in reports.
    pub fn operator(&self) -> &str {
        match self {
            Predicate::Eq(_) => "eq",
            Predicate::NotEq(_) => "not_eq",
            Predicate::Lt(_) => "lt",
            Predicate::Le(_) => "le",
            Predicate::Gt(_) => "gt",
            Predicate::Ge(_) => "ge",
            Predicate::Within(_) => "within",
            Predicate::Without(_) => "without",
            Predicate::StartsWith(_) => "starts_with",
            Predicate::NotStartsWith(_) => "not_starts_with",
            Predicate::EndsWith(_) => "ends_with",
            Predicate::NotEndsWith(_) => "not_ends_with",
            Predicate::Contains(_) => "contains",
            Predicate::NotContains(_) => "not_contains",
            Predicate::IpEq(_) => "ip_eq",
            Predicate::IpNotEq(_) => "ip_not_eq",
            Predicate::IpLt(_) => "ip_lt",
            Predicate::IpLe(_) => "ip_le",
            Predicate::IpGt(_) => "ip_gt",
            Predicate::IpGe(_) => "ip_ge",
            Predicate::IpVersion(_) => "ip_version",
            Predicate::IpInNetwork(_) => "ip_in_network",
            Predicate::IpNotInNetwork(_) => "ip_not_in_network",
            Predicate::Before(_) => "before",
            Predicate::NotBefore(_) => "not_before",
            Predicate::After(_) => "after",
            Predicate::NotAfter(_) => "not_after",
            Predicate::And(..) => "and",
            Predicate::Unknown(op) => op,
        }
    }

    /// Expected operands, in declaration order.
    pub fn expected(&self) -> Vec<Operand> {
        match self {
            Predicate::Eq(o)
            | Predicate::NotEq(o)
            | Predicate::Lt(o)
            | Predicate::Le(o)
            | Predicate::Gt(o)
            | Predicate::Ge(o) => vec![o.clone()],
            Predicate::Within(set) | Predicate::Without(set) => set.clone(),
            Predicate::StartsWith(s)
            | Predicate::NotStartsWith(s)
            | Predicate::EndsWith(s)
            | Predicate::NotEndsWith(s)
            | Predicate::Contains(s)
            | Predicate::NotContains(s)
            | Predicate::IpEq(s)
            | Predicate::IpNotEq(s)
            | Predicate::IpLt(s)
            | Predicate::IpLe(s)
            | Predicate::IpGt(s)
            | Predicate::IpGe(s)
            | Predicate::IpInNetwork(s)
            | Predicate::IpNotInNetwork(s) => vec![Operand::String(s.clone())],
            Predicate::IpVersion(family) => vec![Operand::String(family.to_string())],
            Predicate::Before(d)
            | Predicate::NotBefore(d)
            | Predicate::After(d)
            | Predicate::NotAfter(d) => vec![Operand::Date(*d)],
            Predicate::And(a, b) => {
                let mut operands = a.expected();
                operands.extend(b.expected());
                operands
            }
            Predicate::Unknown(_) => Vec::new(),
        }
    }

    pub fn mismatch_kind(&self) -> MismatchKind {
        match self {
            Predicate::Within(_) | Predicate::Without(_) => MismatchKind::Containment,
            _ => MismatchKind::Simple,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Eq(Operand::Null) => write!(f, "is null"),
            Predicate::Eq(Operand::String(s)) if s.is_empty() => write!(f, "is empty"),
            Predicate::Eq(o) => write!(f, "== {}", o),
            Predicate::NotEq(Operand::Null) => write!(f, "is not null"),
            Predicate::NotEq(Operand::String(s)) if s.is_empty() => write!(f, "is not empty"),
            Predicate::NotEq(o) => write!(f, "!= {}", o),
            Predicate::Lt(o) => write!(f, "< {}", o),
            Predicate::Le(o) => write!(f, "<= {}", o),
            Predicate::Gt(o) => write!(f, "> {}", o),
            Predicate::Ge(o) => write!(f, ">= {}", o),
            Predicate::Within(set) => write!(f, "within [{}]", join(set)),
            Predicate::Without(set) => write!(f, "without [{}]", join(set)),
            Predicate::StartsWith(s) => write!(f, "starts with '{}'", s),
            Predicate::NotStartsWith(s) => write!(f, "does not start with '{}'", s),
            Predicate::EndsWith(s) => write!(f, "ends with '{}'", s),
            Predicate::NotEndsWith(s) => write!(f, "does not end with '{}'", s),
            Predicate::Contains(s) => write!(f, "contains '{}'", s),
            Predicate::NotContains(s) => write!(f, "does not contain '{}'", s),
            Predicate::IpEq(s) => write!(f, "ip == {}", s),
            Predicate::IpNotEq(s) => write!(f, "ip != {}", s),
            Predicate::IpLt(s) => write!(f, "ip < {}", s),
            Predicate::IpLe(s) => write!(f, "ip <= {}", s),
            Predicate::IpGt(s) => write!(f, "ip > {}", s),
            Predicate::IpGe(s) => write!(f, "ip >= {}", s),
            Predicate::IpVersion(family) => write!(f, "is ip{}", family),
            Predicate::IpInNetwork(s) => write!(f, "in network {}", s),
            Predicate::IpNotInNetwork(s) => write!(f, "not in network {}", s),
            Predicate::Before(d) => write!(f, "before {}", d.to_rfc3339()),
            Predicate::NotBefore(d) => write!(f, "not before {}", d.to_rfc3339()),
            Predicate::After(d) => write!(f, "after {}", d.to_rfc3339()),
            Predicate::NotAfter(d) => write!(f, "not after {}", d.to_rfc3339()),
            Predicate::And(a, b) => write!(f, "{} and {}", a, b),
            Predicate::Unknown(op) => write!(f, "<unknown predicate '{}'>", op),
        }
    }
}

fn join(operands: &[Operand]) -> String {
    operands
        .iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// String operators never match non-string operands.
fn text(actual: &Operand, test: impl FnOnce(&str) -> bool) -> bool {
    actual.as_str().is_some_and(test)
}

/// Parse an address or CIDR literal. Bare addresses become host networks.
fn parse_ip(literal: &str) -> Option<IpNet> {
    let literal = literal.trim();
    if let Ok(net) = literal.parse::<IpNet>() {
        return Some(net);
    }
    match literal.parse::<IpAddr>().ok()? {
        IpAddr::V4(addr) => Ipv4Net::new(addr, 32).ok().map(IpNet::V4),
        IpAddr::V6(addr) => Ipv6Net::new(addr, 128).ok().map(IpNet::V6),
    }
}

fn ip_pair(actual: &Operand, expected: &str) -> Option<(IpNet, IpNet)> {
    Some((parse_ip(actual.as_str()?)?, parse_ip(expected)?))
}

fn ip_order(actual: &Operand, expected: &str) -> Option<Ordering> {
    let (a, e) = ip_pair(actual, expected)?;
    match (a, e) {
        (IpNet::V4(_), IpNet::V4(_)) | (IpNet::V6(_), IpNet::V6(_)) => {
            Some(a.addr().cmp(&e.addr()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_equality_and_null_phrasing() {
        assert!(Predicate::Eq(5.into()).test(&Operand::from(5.0)));
        assert!(!Predicate::Eq(5.into()).test(&Operand::from("5")));
        assert!(Predicate::NotEq(Operand::Null).test(&Operand::from("x")));
        assert!(Predicate::Eq("".into()).test(&Operand::from("")));

        assert_eq!(Predicate::Eq(Operand::Null).to_string(), "is null");
        assert_eq!(Predicate::Eq("".into()).to_string(), "is empty");
        assert_eq!(Predicate::NotEq(Operand::Null).to_string(), "is not null");
        assert_eq!(Predicate::NotEq("".into()).to_string(), "is not empty");
        assert_eq!(Predicate::Eq(5.into()).to_string(), "== 5");
    }

    #[test]
    fn test_ordering_is_type_aware() {
        assert!(Predicate::Lt(10.into()).test(&Operand::from(3)));
        assert!(Predicate::Ge("b".into()).test(&Operand::from("c")));
        // Mixed types never order.
        assert!(!Predicate::Lt(10.into()).test(&Operand::from("3")));
        assert!(!Predicate::Gt(Operand::Null).test(&Operand::Null));
    }

    #[test]
    fn test_containment() {
        let set = vec![Operand::from(1), Operand::from(2), Operand::from(3)];
        assert!(Predicate::Within(set.clone()).test(&Operand::from(2)));
        assert!(!Predicate::Within(set.clone()).test(&Operand::from(9)));
        assert!(Predicate::Without(set.clone()).test(&Operand::from(9)));
        assert_eq!(
            Predicate::Within(set.clone()).mismatch_kind(),
            MismatchKind::Containment
        );
        assert_eq!(Predicate::Within(set.clone()).expected(), set);
        assert_eq!(Predicate::Eq(1.into()).mismatch_kind(), MismatchKind::Simple);
    }

    #[test]
    fn test_string_affixes_reject_non_strings() {
        let value = Operand::from("prod-eu-west");
        assert!(Predicate::StartsWith("prod".into()).test(&value));
        assert!(Predicate::EndsWith("west".into()).test(&value));
        assert!(Predicate::Contains("-eu-".into()).test(&value));
        assert!(Predicate::NotContains("us".into()).test(&value));
        assert!(!Predicate::NotStartsWith("prod".into()).test(&value));
        assert!(!Predicate::NotStartsWith("prod".into()).test(&Operand::from(4)));
    }

    #[test]
    fn test_ip_predicates() {
        let addr = Operand::from("10.1.2.3");
        assert!(Predicate::IpInNetwork("10.0.0.0/8".into()).test(&addr));
        assert!(!Predicate::IpInNetwork("192.168.0.0/16".into()).test(&addr));
        assert!(Predicate::IpNotInNetwork("192.168.0.0/16".into()).test(&addr));
        assert!(Predicate::IpEq("10.1.2.3/32".into()).test(&addr));
        assert!(Predicate::IpLt("10.1.2.4".into()).test(&addr));
        assert!(Predicate::IpVersion(IpFamily::V4).test(&addr));
        assert!(Predicate::IpVersion(IpFamily::V6).test(&Operand::from("::1")));
        // Cross-family ordering is undefined.
        assert!(!Predicate::IpLt("::2".into()).test(&addr));
    }

    #[test]
    fn test_malformed_ip_is_false() {
        let junk = Operand::from("not-an-ip");
        assert!(!Predicate::IpEq("10.0.0.1".into()).test(&junk));
        assert!(!Predicate::IpNotEq("10.0.0.1".into()).test(&junk));
        assert!(!Predicate::IpNotInNetwork("10.0.0.0/8".into()).test(&junk));
        assert!(!Predicate::IpInNetwork("garbage".into()).test(&Operand::from("10.0.0.1")));
        assert!(!Predicate::IpVersion(IpFamily::V4).test(&Operand::from(3)));
    }

    #[test]
    fn test_dates_and_ranges() {
        let range = Predicate::date_between(date(2024, 1, 1), date(2025, 1, 1));
        assert!(range.test(&Operand::Date(date(2024, 1, 1))));
        assert!(range.test(&Operand::from("2024-06-01T12:00:00Z")));
        assert!(!range.test(&Operand::Date(date(2025, 1, 1))));
        assert!(!range.test(&Operand::from("yesterday")));
        assert_eq!(range.operator(), "and");
        assert_eq!(range.expected().len(), 2);

        let numeric = Predicate::between(1, 5);
        assert!(numeric.test(&Operand::from(1)));
        assert!(numeric.test(&Operand::from(4.99)));
        assert!(!numeric.test(&Operand::from(5)));
    }

    #[test]
    fn test_unknown_predicate_never_matches() {
        let p = Predicate::Unknown("matches_regex".into());
        assert!(!p.test(&Operand::from("anything")));
        assert!(p.is_unknown());
        assert_eq!(p.operator(), "matches_regex");
        assert!(Predicate::And(Box::new(p), Box::new(Predicate::Eq(1.into()))).is_unknown());
    }

    #[test]
    fn test_predicate_serde_shape() {
        let p: Predicate = serde_json::from_str(r#"{"within": [1, "a", null]}"#).unwrap();
        assert_eq!(
            p,
            Predicate::Within(vec![Operand::from(1), Operand::from("a"), Operand::Null])
        );
        let range: Predicate =
            serde_json::from_str(r#"{"and": [{"ge": 1}, {"lt": 5}]}"#).unwrap();
        assert_eq!(range, Predicate::between(1, 5));
        let date_op: Operand = serde_json::from_str(r#""2024-01-01T00:00:00Z""#).unwrap();
        assert_eq!(date_op, Operand::Date(date(2024, 1, 1)));
    }
}

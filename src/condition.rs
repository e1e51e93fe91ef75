//! Typed per-field conditions, the operator vocabulary shared by facets,
//! persisted selections and the filter tree sent to the backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value carried by a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// NaN and infinities have no JSON form.
    pub fn is_finite(&self) -> bool {
        match self {
            Scalar::Float(n) => n.is_finite(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Payload of single-value operators such as `equal` or `like`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueOperand {
    pub value: Scalar,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
}

/// Payload of list operators (`in`, `have`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuesOperand {
    pub values: Vec<Scalar>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
}

/// Payload of operators without a value (`empty`, `null`). Serializes as `{}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlagOperand {
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeOperand {
    pub from: Scalar,
    pub to: Scalar,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
}

/// One operator applied to a field, e.g. `{"have": {"values": ["42"]}}`.
///
/// `Custom` carries an opaque payload for backend-defined operators; the
/// selection's field names the custom operator when it is translated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Equal(ValueOperand),
    Like(ValueOperand),
    In(ValuesOperand),
    Have(ValuesOperand),
    Empty(FlagOperand),
    Null(FlagOperand),
    Between(RangeOperand),
    Greater(ValueOperand),
    GreaterOrEqual(ValueOperand),
    Less(ValueOperand),
    LessOrEqual(ValueOperand),
    Custom(serde_json::Value),
}

impl Condition {
    pub fn equal(value: impl Into<Scalar>) -> Self {
        Condition::Equal(ValueOperand { value: value.into(), not: false })
    }

    pub fn like(value: impl Into<Scalar>) -> Self {
        Condition::Like(ValueOperand { value: value.into(), not: false })
    }

    pub fn is_in<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        Condition::In(ValuesOperand { values: values.into_iter().map(Into::into).collect(), not: false })
    }

    pub fn have<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        Condition::Have(ValuesOperand { values: values.into_iter().map(Into::into).collect(), not: false })
    }

    pub fn empty() -> Self {
        Condition::Empty(FlagOperand::default())
    }

    pub fn null() -> Self {
        Condition::Null(FlagOperand::default())
    }

    pub fn between(from: impl Into<Scalar>, to: impl Into<Scalar>) -> Self {
        Condition::Between(RangeOperand { from: from.into(), to: to.into(), not: false })
    }

    pub fn greater(value: impl Into<Scalar>) -> Self {
        Condition::Greater(ValueOperand { value: value.into(), not: false })
    }

    pub fn greater_or_equal(value: impl Into<Scalar>) -> Self {
        Condition::GreaterOrEqual(ValueOperand { value: value.into(), not: false })
    }

    pub fn less(value: impl Into<Scalar>) -> Self {
        Condition::Less(ValueOperand { value: value.into(), not: false })
    }

    pub fn less_or_equal(value: impl Into<Scalar>) -> Self {
        Condition::LessOrEqual(ValueOperand { value: value.into(), not: false })
    }

    pub fn custom(payload: serde_json::Value) -> Self {
        Condition::Custom(payload)
    }

    /// Returns the same condition with its `not` flag set.
    /// Custom conditions have no generic negation and are returned unchanged.
    pub fn negated(mut self) -> Self {
        match &mut self {
            Condition::Equal(op)
            | Condition::Like(op)
            | Condition::Greater(op)
            | Condition::GreaterOrEqual(op)
            | Condition::Less(op)
            | Condition::LessOrEqual(op) => op.not = true,
            Condition::In(op) | Condition::Have(op) => op.not = true,
            Condition::Empty(op) | Condition::Null(op) => op.not = true,
            Condition::Between(op) => op.not = true,
            Condition::Custom(_) => {}
        }
        self
    }

    /// The operator key as it appears on the wire.
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Equal(_) => "equal",
            Condition::Like(_) => "like",
            Condition::In(_) => "in",
            Condition::Have(_) => "have",
            Condition::Empty(_) => "empty",
            Condition::Null(_) => "null",
            Condition::Between(_) => "between",
            Condition::Greater(_) => "greater",
            Condition::GreaterOrEqual(_) => "greaterOrEqual",
            Condition::Less(_) => "less",
            Condition::LessOrEqual(_) => "lessOrEqual",
            Condition::Custom(_) => "custom",
        }
    }

    /// False when any carried scalar is NaN or infinite. Such conditions
    /// cannot be written to JSON and are left out of URL encodings.
    pub fn is_finite(&self) -> bool {
        match self {
            Condition::In(op) | Condition::Have(op) => op.values.iter().all(Scalar::is_finite),
            Condition::Between(op) => op.from.is_finite() && op.to.is_finite(),
            other => other.value().map_or(true, Scalar::is_finite),
        }
    }

    /// The single value of value-carrying operators.
    pub fn value(&self) -> Option<&Scalar> {
        match self {
            Condition::Equal(op)
            | Condition::Like(op)
            | Condition::Greater(op)
            | Condition::GreaterOrEqual(op)
            | Condition::Less(op)
            | Condition::LessOrEqual(op) => Some(&op.value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_wire_shape_of_operators() {
        assert_eq!(serde_json::to_value(Condition::have(["42"])).unwrap(), json!({"have": {"values": ["42"]}}));
        assert_eq!(serde_json::to_value(Condition::empty()).unwrap(), json!({"empty": {}}));
        assert_eq!(
            serde_json::to_value(Condition::greater_or_equal(3)).unwrap(),
            json!({"greaterOrEqual": {"value": 3}})
        );
        assert_eq!(
            serde_json::to_value(Condition::like("foo").negated()).unwrap(),
            json!({"like": {"value": "foo", "not": true}})
        );
    }

    #[test]
    fn test_scalar_kinds_survive_json() {
        let condition = Condition::is_in(vec![Scalar::Int(1), Scalar::Float(2.5), Scalar::Bool(true), Scalar::from("x")]);
        let text = serde_json::to_string(&condition).unwrap();
        let back: Condition = serde_json::from_str(&text).unwrap();
        assert_eq!(back, condition);
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let parsed = serde_json::from_value::<Condition>(json!({"almost": {"value": 1}}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_value_accessors() {
        let condition = Condition::like("abc");
        assert_eq!(condition.operator(), "like");
        assert_eq!(condition.value(), Some(&Scalar::from("abc")));
        assert_eq!(Condition::empty().value(), None);
    }

    #[test]
    fn test_non_finite_values() {
        assert!(Condition::between(1, 2.5).is_finite());
        assert!(!Condition::greater(f64::NAN).is_finite());
        assert!(!Condition::is_in(vec![Scalar::Int(1), Scalar::Float(f64::INFINITY)]).is_finite());
        assert!(Condition::empty().is_finite());
    }

    #[test]
    fn test_custom_payload_is_opaque() {
        let condition = Condition::custom(json!({"value": "asdf"}));
        assert_eq!(serde_json::to_value(&condition).unwrap(), json!({"custom": {"value": "asdf"}}));
        assert_eq!(condition.clone().negated(), condition);
    }
}

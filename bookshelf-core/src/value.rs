//! Literal values carried by filter predicates, and backend type tags.
//!
//! [`Value`] is the closed set of literal kinds a predicate may compare against. Numbers are
//! always [`Decimal`] so currency amounts never pass through binary floating point; on the
//! wire they travel as BSON `Decimal128`.

use bson::{Bson, Decimal128};
use rust_decimal::Decimal;
use std::{fmt, str::FromStr};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
};

/// A literal predicate value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Exact decimal number.
    Number(Decimal),
    /// String literal.
    String(String),
    /// Document identifier.
    Id(DocumentId),
    /// Array of literals.
    Array(Vec<Value>),
}

impl Value {
    /// Short name of the value's kind, used in type mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "decimal",
            Value::String(_) => "string",
            Value::Id(_) => "id",
            Value::Array(_) => "array",
        }
    }

    /// Converts the value to its wire representation.
    pub fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(match self {
            Value::Null => Bson::Null,
            Value::Bool(b) => Bson::Boolean(*b),
            Value::Number(d) => decimal_to_bson(d)?,
            Value::String(s) => Bson::String(s.clone()),
            Value::Id(id) => Bson::from(*id),
            Value::Array(values) => Bson::Array(
                values
                    .iter()
                    .map(Value::to_bson)
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            ),
        })
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Decimal::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Decimal::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(Decimal::from(value))
    }
}

impl From<DocumentId> for Value {
    fn from(value: DocumentId) -> Self {
        Value::Id(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Encodes a decimal as BSON `Decimal128`.
pub fn decimal_to_bson(value: &Decimal) -> DocumentStoreResult<Bson> {
    Decimal128::from_str(&value.to_string())
        .map(Bson::Decimal128)
        .map_err(|e| DocumentStoreError::Serialization(format!("decimal {value}: {e}")))
}

/// Decodes a numeric BSON value into a decimal.
///
/// `Decimal128` is read through its canonical string form; integers convert exactly. Doubles
/// are accepted for documents written by other clients and converted by value.
pub fn decimal_from_bson(value: &Bson) -> Option<Decimal> {
    match value {
        Bson::Decimal128(d) => {
            let text = d.to_string();

            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Bson::Int32(i) => Some(Decimal::from(*i)),
        Bson::Int64(i) => Some(Decimal::from(*i)),
        Bson::Double(f) => Decimal::try_from(*f).ok(),
        _ => None,
    }
}

/// Backend runtime type tags, as understood by a `$type` style predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Double,
    String,
    Object,
    Array,
    ObjectId,
    Bool,
    Null,
    Int,
    Long,
    Decimal,
}

impl ValueType {
    const ALL: [ValueType; 10] = [
        ValueType::Double,
        ValueType::String,
        ValueType::Object,
        ValueType::Array,
        ValueType::ObjectId,
        ValueType::Bool,
        ValueType::Null,
        ValueType::Int,
        ValueType::Long,
        ValueType::Decimal,
    ];

    /// The backend alias of this type (`"decimal"`, `"objectId"`, ...).
    pub fn alias(&self) -> &'static str {
        match self {
            ValueType::Double => "double",
            ValueType::String => "string",
            ValueType::Object => "object",
            ValueType::Array => "array",
            ValueType::ObjectId => "objectId",
            ValueType::Bool => "bool",
            ValueType::Null => "null",
            ValueType::Int => "int",
            ValueType::Long => "long",
            ValueType::Decimal => "decimal",
        }
    }

    /// The numeric BSON type code.
    pub fn code(&self) -> i32 {
        match self {
            ValueType::Double => 1,
            ValueType::String => 2,
            ValueType::Object => 3,
            ValueType::Array => 4,
            ValueType::ObjectId => 7,
            ValueType::Bool => 8,
            ValueType::Null => 10,
            ValueType::Int => 16,
            ValueType::Long => 18,
            ValueType::Decimal => 19,
        }
    }

    // Long-form names used by driver type enums (e.g. "Decimal128", "Boolean").
    fn long_name(&self) -> &'static str {
        match self {
            ValueType::Double => "double",
            ValueType::String => "string",
            ValueType::Object => "document",
            ValueType::Array => "array",
            ValueType::ObjectId => "objectid",
            ValueType::Bool => "boolean",
            ValueType::Null => "null",
            ValueType::Int => "int32",
            ValueType::Long => "int64",
            ValueType::Decimal => "decimal128",
        }
    }

    /// Returns the type tag of a wire value, if it is one of the supported kinds.
    pub fn of(value: &Bson) -> Option<ValueType> {
        match value {
            Bson::Double(_) => Some(ValueType::Double),
            Bson::String(_) => Some(ValueType::String),
            Bson::Document(_) => Some(ValueType::Object),
            Bson::Array(_) => Some(ValueType::Array),
            Bson::ObjectId(_) => Some(ValueType::ObjectId),
            Bson::Boolean(_) => Some(ValueType::Bool),
            Bson::Null => Some(ValueType::Null),
            Bson::Int32(_) => Some(ValueType::Int),
            Bson::Int64(_) => Some(ValueType::Long),
            Bson::Decimal128(_) => Some(ValueType::Decimal),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

impl FromStr for ValueType {
    type Err = DocumentStoreError;

    /// Accepts the backend alias, the long driver name, or the numeric code, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();

        if let Ok(code) = needle.parse::<i32>() {
            return ValueType::ALL
                .into_iter()
                .find(|t| t.code() == code)
                .ok_or_else(|| DocumentStoreError::InvalidArgument(format!("unknown type code {code}")));
        }

        ValueType::ALL
            .into_iter()
            .find(|t| t.alias().eq_ignore_ascii_case(needle) || t.long_name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| DocumentStoreError::InvalidArgument(format!("unknown type {needle:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_decimal_survives_the_wire() {
        let price = Decimal::from_str("45.90").unwrap();
        let wire = decimal_to_bson(&price).unwrap();

        assert!(matches!(wire, Bson::Decimal128(_)));
        assert_eq!(decimal_from_bson(&wire), Some(price));
    }

    #[rstest]
    fn test_integers_read_as_decimals() {
        assert_eq!(decimal_from_bson(&Bson::Int32(45)), Some(Decimal::from(45)));
        assert_eq!(decimal_from_bson(&Bson::String("45".into())), None);
    }

    #[rstest]
    #[case("decimal", ValueType::Decimal)]
    #[case("Decimal128", ValueType::Decimal)]
    #[case("19", ValueType::Decimal)]
    #[case("objectId", ValueType::ObjectId)]
    #[case("String", ValueType::String)]
    #[case("2", ValueType::String)]
    #[case("Boolean", ValueType::Bool)]
    fn test_value_type_parsing(#[case] input: &str, #[case] expected: ValueType) {
        assert_eq!(input.parse::<ValueType>().unwrap(), expected);
    }

    #[rstest]
    #[case("float")]
    #[case("99")]
    fn test_unknown_value_types_are_rejected(#[case] input: &str) {
        assert!(matches!(
            input.parse::<ValueType>(),
            Err(DocumentStoreError::InvalidArgument(_))
        ));
    }
}

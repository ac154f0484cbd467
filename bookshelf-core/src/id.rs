//! Document identifiers.
//!
//! Identifiers are opaque strings to callers and 12-byte ObjectIds on the wire. The
//! conversion in both directions is lossless: the string form is always the 24-character
//! lowercase hex encoding of the ObjectId.

use bson::{Bson, oid::ObjectId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Identifier of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        DocumentId(ObjectId::new())
    }

    /// Parses the string form of an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidArgument`] if `value` is not a 24-character hex string.
    pub fn parse(value: &str) -> DocumentStoreResult<Self> {
        ObjectId::parse_str(value)
            .map(DocumentId)
            .map_err(|_| DocumentStoreError::InvalidArgument(format!("malformed id: {value:?}")))
    }

    /// Returns the backend-native representation.
    pub fn as_object_id(&self) -> &ObjectId {
        &self.0
    }

    /// Reads the identifier stored under `_id` in a wire document value.
    pub fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::ObjectId(oid) => Some(DocumentId(*oid)),
            _ => None,
        }
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        DocumentId(oid)
    }
}

impl From<DocumentId> for ObjectId {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl From<DocumentId> for Bson {
    fn from(id: DocumentId) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl FromStr for DocumentId {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentId::parse(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;

        DocumentId::parse(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_string_form_is_lossless() {
        let id = DocumentId::new();
        let parsed = DocumentId::parse(&id.to_string()).unwrap();

        assert_eq!(parsed, id);
        assert_eq!(ObjectId::from(parsed), *id.as_object_id());
    }

    #[rstest]
    #[case("")]
    #[case("not-an-id")]
    #[case("65f1c0ffee65f1c0ffee65f")]
    fn test_malformed_ids_are_invalid_arguments(#[case] value: &str) {
        assert!(matches!(
            DocumentId::parse(value),
            Err(DocumentStoreError::InvalidArgument(_))
        ));
    }

    #[rstest]
    fn test_json_form_is_hex_string() {
        let id = DocumentId::parse("65f1c0ffee65f1c0ffee65f1").unwrap();

        assert_eq!(
            serde_json::to_value(id).unwrap(),
            serde_json::json!("65f1c0ffee65f1c0ffee65f1")
        );
    }
}

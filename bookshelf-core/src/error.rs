//! Error types and result types for document store operations.
//!
//! This module provides error handling for the filter builder, the access layer and the
//! storage backends. Use [`DocumentStoreResult<T>`] as the return type for fallible operations.
//!
//! Errors are classified with [`DocumentStoreError::kind`] into the coarse [`ErrorKind`]
//! taxonomy that a transport boundary maps onto status codes.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DuplicateKey(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    NotFound(String, String),
    /// A stored or submitted document does not have the expected shape.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    /// A filter value does not have the semantic type of the field it targets.
    #[error("Type mismatch on field {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },
    /// A regular expression was rejected.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    /// An argument is outside the accepted domain (negative size, malformed id, unknown field).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The caller supplied empty or unusable bulk input.
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// The backend could not be reached (connection, timeout, server selection).
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Coarse classification of a [`DocumentStoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A point lookup missed.
    NotFound,
    /// The caller sent something invalid.
    BadRequest,
    /// An insert collided with an existing identifier.
    DuplicateKey,
    /// I/O or transport failure; fatal for the request, never retried here.
    BackendUnavailable,
    /// Anything else.
    Internal,
}

impl DocumentStoreError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentStoreError::NotFound(..) => ErrorKind::NotFound,
            DocumentStoreError::ValidationFailed(_)
            | DocumentStoreError::TypeMismatch { .. }
            | DocumentStoreError::InvalidPattern(_)
            | DocumentStoreError::InvalidArgument(_)
            | DocumentStoreError::BadRequest(_) => ErrorKind::BadRequest,
            DocumentStoreError::DuplicateKey(..) => ErrorKind::DuplicateKey,
            DocumentStoreError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            DocumentStoreError::Serialization(_)
            | DocumentStoreError::Initialization(_)
            | DocumentStoreError::Backend(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        DocumentStoreError::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DocumentStoreError::NotFound("a".into(), "books".into()), ErrorKind::NotFound)]
    #[case(DocumentStoreError::type_mismatch("price", "decimal", "string"), ErrorKind::BadRequest)]
    #[case(DocumentStoreError::InvalidPattern("(".into()), ErrorKind::BadRequest)]
    #[case(DocumentStoreError::BadRequest("empty".into()), ErrorKind::BadRequest)]
    #[case(DocumentStoreError::DuplicateKey("a".into(), "books".into()), ErrorKind::DuplicateKey)]
    #[case(DocumentStoreError::BackendUnavailable("timeout".into()), ErrorKind::BackendUnavailable)]
    #[case(DocumentStoreError::Backend("boom".into()), ErrorKind::Internal)]
    fn test_error_kind(#[case] error: DocumentStoreError, #[case] kind: ErrorKind) {
        assert_eq!(error.kind(), kind);
    }

    #[test]
    fn test_type_mismatch_message_names_field() {
        let err = DocumentStoreError::type_mismatch("price", "decimal", "string");

        assert_eq!(
            err.to_string(),
            "Type mismatch on field price: expected decimal, found string"
        );
    }
}

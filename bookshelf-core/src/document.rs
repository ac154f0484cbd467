//! Core traits for document representation and serialization.
//!
//! This module provides the trait that all stored documents must implement, as well as
//! utilities for converting documents between their wire form (BSON, driven by the declared
//! [`Schema`]) and their JSON form (driven by serde).

use bson::Document as BsonDocument;
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::{
    error::DocumentStoreResult,
    id::DocumentId,
    query::Filter,
    schema::Schema,
};

/// Core trait that all documents stored in a document store must implement.
///
/// A document has an optional identifier (absent until the backend assigns one), belongs to
/// a named collection and declares its field table. Conversion to and from the wire form
/// goes through that field table rather than through serde attributes, so renamed fields
/// (logical `name` stored as `Name`, for instance) are declared in exactly one place.
///
/// # Example
///
/// ```ignore
/// impl Document for Book {
///     fn id(&self) -> Option<&DocumentId> { self.id.as_ref() }
///     fn set_id(&mut self, id: DocumentId) { self.id = Some(id); }
///     fn collection_name() -> &'static str { "Books" }
///     fn schema() -> &'static Schema { &BOOK_SCHEMA }
///     fn to_wire(&self) -> DocumentStoreResult<bson::Document> { /* WireWriter */ }
///     fn from_wire(doc: &bson::Document) -> DocumentStoreResult<Self> { /* WireReader */ }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns this document's identifier, if one has been assigned.
    fn id(&self) -> Option<&DocumentId>;

    /// Sets the identifier.
    fn set_id(&mut self, id: DocumentId);

    /// Returns the default name of the collection this document belongs to.
    fn collection_name() -> &'static str;

    /// Returns the declared field table.
    fn schema() -> &'static Schema;

    /// Encodes this document into its stored form, including `_id` when set.
    fn to_wire(&self) -> DocumentStoreResult<BsonDocument>;

    /// Decodes a stored document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::ValidationFailed`](crate::error::DocumentStoreError::ValidationFailed)
    /// if a required field is missing or has the wrong type.
    fn from_wire(document: &BsonDocument) -> DocumentStoreResult<Self>;

    /// Returns a filter builder bound to this document's schema.
    fn filter() -> Filter {
        Filter::new(Self::schema())
    }
}

/// Extension trait providing JSON conversion for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

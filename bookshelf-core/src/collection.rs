//! Typed access to one document collection.
//!
//! [`TypedCollection`] is the access layer: CRUD and bulk operations that accept a keyword,
//! an identifier or a composed [`Expr`], run them against the backend and shape the result
//! into typed documents.
//!
//! # Result shaping
//!
//! Reads are eagerly materialized into a `Vec<D>`; a query that matches nothing yields an
//! empty vector, never an error. Point lookups yield `Option<D>`, and a malformed identifier
//! is reported as `InvalidArgument` so callers can tell it apart from a miss.
//!
//! # Example
//!
//! ```ignore
//! let books = store.typed_collection::<Book>();
//! let dune = books.create(Book::new("Dune", price, "Fiction", "Frank Herbert", "Available")).await?;
//! let found = books.get_by_id(&dune.id.unwrap().to_string()).await?;
//! ```

use bson::Document as BsonDocument;
use std::marker::PhantomData;
use tracing::debug;

use crate::{
    backend::StoreBackend,
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
    query::{Expr, Filter},
};

/// A type-safe handle on one collection of a backend.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
/// * `D` - The document type stored in the collection
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    name: String,
    backend: &'a B,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns every document, in the backend's natural scan order.
    ///
    /// The order is implementation-defined and not guaranteed stable across calls unless the
    /// backend guarantees it (the in-memory backend returns insertion order).
    pub async fn list_all(&self) -> DocumentStoreResult<Vec<D>> {
        let documents = decode_all(self.backend.find_all(&self.name).await?)?;
        debug!(collection = %self.name, count = documents.len(), "listed documents");

        Ok(documents)
    }

    /// Fetches one document by identifier.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if no document has this identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidArgument`] if `id` is not a well-formed identifier.
    pub async fn get_by_id(&self, id: &str) -> DocumentStoreResult<Option<D>> {
        let id = DocumentId::parse(id)?;
        let document = self
            .backend
            .find_one(&self.name, &id)
            .await?
            .map(|doc| D::from_wire(&doc))
            .transpose()?;
        debug!(collection = %self.name, %id, found = document.is_some(), "looked up document");

        Ok(document)
    }

    /// Inserts a new document and returns it with its identifier populated.
    ///
    /// The backend assigns an identifier when the document carries none.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DuplicateKey`] if the identifier is already taken.
    pub async fn create(&self, mut document: D) -> DocumentStoreResult<D> {
        let id = self
            .backend
            .insert_one(&self.name, document.to_wire()?)
            .await?;
        document.set_id(id);
        debug!(collection = %self.name, %id, "created document");

        Ok(document)
    }

    /// Finds documents whose keyword field contains `text`, ignoring case.
    ///
    /// `text` is matched as a literal substring: regex metacharacters in it are escaped.
    pub async fn find_by_keyword(&self, text: &str) -> DocumentStoreResult<Vec<D>> {
        let keyword = D::schema().keyword_field().ok_or_else(|| {
            DocumentStoreError::InvalidArgument(format!(
                "{} declares no keyword field",
                D::schema().name
            ))
        })?;
        let filter = Filter::new(D::schema()).regex(keyword.name, regex::escape(text), true)?;

        self.find_by_filter(&filter).await
    }

    /// Finds every document satisfying `filter`.
    pub async fn find_by_filter(&self, filter: &Expr) -> DocumentStoreResult<Vec<D>> {
        let documents = decode_all(self.backend.find_many(&self.name, filter).await?)?;
        debug!(collection = %self.name, count = documents.len(), "filtered documents");

        Ok(documents)
    }

    /// Replaces the document stored under `id`.
    ///
    /// The replacement is always stored under `id`, whatever identifier `document` carries.
    ///
    /// # Returns
    ///
    /// `true` if the backend matched and replaced a document, `false` if `id` does not
    /// exist (the call is then a no-op).
    pub async fn replace_by_id(&self, id: &str, mut document: D) -> DocumentStoreResult<bool> {
        let id = DocumentId::parse(id)?;
        document.set_id(id);

        let replaced = self
            .backend
            .replace_one(&self.name, &id, document.to_wire()?)
            .await?;
        debug!(collection = %self.name, %id, replaced, "replaced document");

        Ok(replaced)
    }

    /// Deletes the document stored under `id`. Deleting a missing document is a no-op.
    pub async fn delete_by_id(&self, id: &str) -> DocumentStoreResult<()> {
        let id = DocumentId::parse(id)?;
        self.backend.delete_one(&self.name, &id).await?;
        debug!(collection = %self.name, %id, "deleted document");

        Ok(())
    }

    /// Deletes every listed document. Missing documents are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::BadRequest`] if `ids` is empty, and
    /// [`DocumentStoreError::InvalidArgument`] if any id is malformed (nothing is deleted).
    pub async fn delete_many<S: AsRef<str>>(&self, ids: &[S]) -> DocumentStoreResult<()> {
        if ids.is_empty() {
            return Err(DocumentStoreError::BadRequest("no ids provided".to_string()));
        }

        let ids = ids
            .iter()
            .map(|id| DocumentId::parse(id.as_ref()))
            .collect::<DocumentStoreResult<Vec<_>>>()?;
        self.backend.delete_many(&self.name, &ids).await?;
        debug!(collection = %self.name, count = ids.len(), "deleted documents");

        Ok(())
    }

    /// Inserts several documents through the backend's bulk primitive.
    ///
    /// This is a passthrough, not a transaction: atomicity across documents is exactly what
    /// the backend's bulk insert provides.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::BadRequest`] if `documents` is empty.
    pub async fn insert_many(&self, documents: Vec<D>) -> DocumentStoreResult<Vec<D>> {
        if documents.is_empty() {
            return Err(DocumentStoreError::BadRequest("no documents provided".to_string()));
        }

        let wire = documents
            .iter()
            .map(Document::to_wire)
            .collect::<DocumentStoreResult<Vec<_>>>()?;
        let ids = self.backend.insert_many(&self.name, wire).await?;
        debug!(collection = %self.name, count = ids.len(), "inserted documents");

        Ok(documents
            .into_iter()
            .zip(ids)
            .map(|(mut document, id)| {
                document.set_id(id);
                document
            })
            .collect())
    }
}

fn decode_all<D: Document>(documents: Vec<BsonDocument>) -> DocumentStoreResult<Vec<D>> {
    documents
        .iter()
        .map(D::from_wire)
        .collect()
}

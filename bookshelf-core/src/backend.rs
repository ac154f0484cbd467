//! Storage backend abstraction for the document store.
//!
//! This module defines the trait the access layer consumes to reach the document-store
//! engine. The backend owns connection lifecycle, pooling and retry of transient I/O; the
//! access layer never retries and never synchronizes access itself.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait provides a unified async interface over stored documents in
//! their wire form (`bson::Document`, `_id` holding the identifier). Implementations are
//! required to be thread-safe (`Send + Sync`) and are shared read-only across concurrent
//! requests.
//!
//! # Cancellation
//!
//! Every operation is a future; dropping it aborts the in-flight call. A bulk operation
//! interrupted this way is left in whatever state the backend reached.

use async_trait::async_trait;
use bson::Document as BsonDocument;
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, id::DocumentId, query::Expr};

/// Abstract interface for document storage backends.
///
/// Every method targets exactly one named collection. Read methods return documents
/// eagerly materialized; a read that matches nothing returns an empty vector or `None`,
/// never an error.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns every document of the collection in the backend's natural scan order.
    async fn find_all(&self, collection: &str) -> DocumentStoreResult<Vec<BsonDocument>>;

    /// Returns the document with the given identifier, if any.
    async fn find_one(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> DocumentStoreResult<Option<BsonDocument>>;

    /// Returns every document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidPattern`](crate::error::DocumentStoreError::InvalidPattern)
    /// if a regex in `filter` cannot be compiled by the backend.
    async fn find_many(
        &self,
        collection: &str,
        filter: &Expr,
    ) -> DocumentStoreResult<Vec<BsonDocument>>;

    /// Inserts one document, assigning an identifier if `_id` is absent.
    ///
    /// # Returns
    ///
    /// The identifier of the stored document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DuplicateKey`](crate::error::DocumentStoreError::DuplicateKey)
    /// if a document with the same identifier exists.
    async fn insert_one(
        &self,
        collection: &str,
        document: BsonDocument,
    ) -> DocumentStoreResult<DocumentId>;

    /// Inserts several documents with the backend's bulk primitive. Atomicity across
    /// documents is whatever the backend provides.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> DocumentStoreResult<Vec<DocumentId>>;

    /// Replaces the document stored under `id`. The stored `_id` is always `id`.
    ///
    /// # Returns
    ///
    /// `true` if a document was matched and replaced, `false` if `id` does not exist.
    async fn replace_one(
        &self,
        collection: &str,
        id: &DocumentId,
        document: BsonDocument,
    ) -> DocumentStoreResult<bool>;

    /// Deletes one document. Deleting a missing identifier is not an error.
    async fn delete_one(&self, collection: &str, id: &DocumentId) -> DocumentStoreResult<()>;

    /// Deletes several documents. Missing identifiers are skipped.
    async fn delete_many(&self, collection: &str, ids: &[DocumentId]) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn find_all(&self, collection: &str) -> DocumentStoreResult<Vec<BsonDocument>> {
        (*self).find_all(collection).await
    }

    async fn find_one(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        (*self).find_one(collection, id).await
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Expr,
    ) -> DocumentStoreResult<Vec<BsonDocument>> {
        (*self).find_many(collection, filter).await
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: BsonDocument,
    ) -> DocumentStoreResult<DocumentId> {
        (*self)
            .insert_one(collection, document)
            .await
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> DocumentStoreResult<Vec<DocumentId>> {
        (*self)
            .insert_many(collection, documents)
            .await
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: &DocumentId,
        document: BsonDocument,
    ) -> DocumentStoreResult<bool> {
        (*self)
            .replace_one(collection, id, document)
            .await
    }

    async fn delete_one(&self, collection: &str, id: &DocumentId) -> DocumentStoreResult<()> {
        (*self).delete_one(collection, id).await
    }

    async fn delete_many(&self, collection: &str, ids: &[DocumentId]) -> DocumentStoreResult<()> {
        (*self).delete_many(collection, ids).await
    }
}

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}

//! In-memory storage implementation for document stores.
//!
//! This module provides a simple in-memory backend that stores wire documents in
//! insertion-ordered maps guarded by an async-safe read-write lock.

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, oid::ObjectId};
use indexmap::IndexMap;
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use bookshelf_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
    query::Expr,
};

use crate::evaluator::DocumentEvaluator;

type CollectionMap = IndexMap<ObjectId, BsonDocument>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait to provide a fully functional
/// document store that operates entirely in memory. Documents are kept in insertion order,
/// which is the natural scan order reported by `find_all` and `find_many`.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use bookshelf_memory::InMemoryStore;
/// use bookshelf_core::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.insert_one("Books", doc! { "Name": "Dune" }).await?;
/// assert!(store.find_one("Books", &id).await?.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (document id -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(StoreMap::new())) }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

// Reads `_id`, assigning a fresh one when the document has none.
fn assign_id(document: &mut BsonDocument) -> DocumentStoreResult<ObjectId> {
    match document.get("_id") {
        None | Some(Bson::Null) => {
            let oid = ObjectId::new();
            document.insert("_id", oid);

            Ok(oid)
        }
        Some(Bson::ObjectId(oid)) => Ok(*oid),
        Some(other) => Err(DocumentStoreError::ValidationFailed(format!(
            "_id must be an ObjectId, found {other}"
        ))),
    }
}

fn duplicate(oid: &ObjectId, collection: &str) -> DocumentStoreError {
    DocumentStoreError::DuplicateKey(oid.to_hex(), collection.to_string())
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find_all(&self, collection: &str) -> DocumentStoreResult<Vec<BsonDocument>> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .and_then(|documents| documents.get(id.as_object_id()))
            .cloned())
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Expr,
    ) -> DocumentStoreResult<Vec<BsonDocument>> {
        let store = self.store.read().await;
        let empty = CollectionMap::new();
        let documents = store.get(collection).unwrap_or(&empty);

        DocumentEvaluator::filter_documents(documents.values(), filter)
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: BsonDocument,
    ) -> DocumentStoreResult<DocumentId> {
        let oid = assign_id(&mut document)?;
        let mut store = self.store.write().await;
        let documents = store.entry(collection.to_string()).or_default();

        if documents.contains_key(&oid) {
            return Err(duplicate(&oid, collection));
        }

        documents.insert(oid, document);
        debug!(collection, id = %oid, "stored document in memory");

        Ok(oid.into())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> DocumentStoreResult<Vec<DocumentId>> {
        let mut batch = IndexMap::with_capacity(documents.len());

        for mut document in documents {
            let oid = assign_id(&mut document)?;

            if batch.insert(oid, document).is_some() {
                return Err(duplicate(&oid, collection));
            }
        }

        let mut store = self.store.write().await;
        let stored = store.entry(collection.to_string()).or_default();

        // All-or-nothing: check every id before inserting any.
        if let Some(oid) = batch.keys().find(|oid| stored.contains_key(*oid)) {
            return Err(duplicate(oid, collection));
        }

        let ids = batch.keys().map(|oid| DocumentId::from(*oid)).collect();
        stored.extend(batch);

        Ok(ids)
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: &DocumentId,
        mut document: BsonDocument,
    ) -> DocumentStoreResult<bool> {
        let mut store = self.store.write().await;
        let Some(slot) = store
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id.as_object_id()))
        else {
            return Ok(false);
        };

        document.insert("_id", *id.as_object_id());
        *slot = document;

        Ok(true)
    }

    async fn delete_one(&self, collection: &str, id: &DocumentId) -> DocumentStoreResult<()> {
        if let Some(documents) = self.store.write().await.get_mut(collection) {
            documents.shift_remove(id.as_object_id());
        }

        Ok(())
    }

    async fn delete_many(&self, collection: &str, ids: &[DocumentId]) -> DocumentStoreResult<()> {
        if let Some(documents) = self.store.write().await.get_mut(collection) {
            for id in ids {
                documents.shift_remove(id.as_object_id());
            }
        }

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new, empty [`InMemoryStore`]. This always succeeds.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use rstest::rstest;

    const BOOKS: &str = "Books";

    #[tokio::test]
    async fn test_insert_assigns_id_and_find_one_returns_it() {
        let store = InMemoryStore::new();
        let id = store.insert_one(BOOKS, doc! { "Name": "Dune" }).await.unwrap();

        let found = store.find_one(BOOKS, &id).await.unwrap().unwrap();

        assert_eq!(found.get_object_id("_id").unwrap(), *id.as_object_id());
        assert_eq!(found.get_str("Name").unwrap(), "Dune");
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let store = InMemoryStore::new();
        let oid = ObjectId::new();
        store.insert_one(BOOKS, doc! { "_id": oid }).await.unwrap();

        assert!(matches!(
            store.insert_one(BOOKS, doc! { "_id": oid }).await,
            Err(DocumentStoreError::DuplicateKey(..))
        ));
    }

    #[tokio::test]
    async fn test_insert_many_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let taken = ObjectId::new();
        store.insert_one(BOOKS, doc! { "_id": taken }).await.unwrap();

        let result = store
            .insert_many(BOOKS, vec![doc! { "Name": "new" }, doc! { "_id": taken }])
            .await;

        assert!(matches!(result, Err(DocumentStoreError::DuplicateKey(..))));
        assert_eq!(store.find_all(BOOKS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_all_keeps_insertion_order_after_delete() {
        let store = InMemoryStore::new();
        let ids = store
            .insert_many(BOOKS, vec![doc! { "N": 1 }, doc! { "N": 2 }, doc! { "N": 3 }])
            .await
            .unwrap();

        store.delete_one(BOOKS, &ids[1]).await.unwrap();

        let remaining: Vec<i32> = store
            .find_all(BOOKS)
            .await
            .unwrap()
            .iter()
            .map(|d| d.get_i32("N").unwrap())
            .collect();
        assert_eq!(remaining, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_replace_keeps_id_and_reports_missing() {
        let store = InMemoryStore::new();
        let id = store.insert_one(BOOKS, doc! { "Name": "Dune" }).await.unwrap();

        let replaced = store
            .replace_one(BOOKS, &id, doc! { "_id": ObjectId::new(), "Name": "Dune Messiah" })
            .await
            .unwrap();
        let missing = store
            .replace_one(BOOKS, &DocumentId::new(), doc! { "Name": "ghost" })
            .await
            .unwrap();

        assert!(replaced);
        assert!(!missing);
        let stored = store.find_one(BOOKS, &id).await.unwrap().unwrap();
        assert_eq!(stored.get_str("Name").unwrap(), "Dune Messiah");
        assert_eq!(store.find_all(BOOKS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deletes_are_idempotent() {
        let store = InMemoryStore::new();
        let id = store.insert_one(BOOKS, doc! { "Name": "Dune" }).await.unwrap();

        store.delete_many(BOOKS, &[id, DocumentId::new()]).await.unwrap();
        store.delete_one(BOOKS, &id).await.unwrap();
        store.delete_one("Unknown", &id).await.unwrap();

        assert!(store.find_one(BOOKS, &id).await.unwrap().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn test_unknown_collection_reads_empty() {
        let store = InMemoryStore::builder().build().await.unwrap();

        assert!(store.find_all("Nothing").await.unwrap().is_empty());
        assert!(store.find_many("Nothing", &Expr::everything()).await.unwrap().is_empty());
    }
}

//! Main document store interface for interacting with document backends.
//!
//! [`DocumentStore`] owns a backend and hands out [`TypedCollection`]s bound to it. The
//! store performs no locking of its own: the backend is shared read-only by every
//! collection handle and is responsible for its own synchronization.
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_core::{book::Book, store::DocumentStore};
//!
//! let store = DocumentStore::new(backend);
//! let books = store.typed_collection::<Book>();
//! ```

use crate::{
    backend::StoreBackend,
    collection::TypedCollection,
    document::Document,
    error::DocumentStoreResult,
};

/// A strongly-typed document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug, Clone)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a typed collection for the specified document type.
    ///
    /// The collection name is determined by the document type's `collection_name()` method.
    pub fn typed_collection<D: Document>(&self) -> TypedCollection<'_, B, D> {
        TypedCollection::new(D::collection_name().to_string(), &self.backend)
    }

    /// Gets a typed collection stored under a configured name.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the collection
    pub fn typed_collection_named<D: Document>(&self, name: &str) -> TypedCollection<'_, B, D> {
        TypedCollection::new(name.to_string(), &self.backend)
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}

//! Main bookshelf crate: a typed filter algebra and CRUD access layer over a book collection.
//!
//! This crate is the primary entry point. It re-exports the core types from the sub-crates,
//! provides access to the storage backends, and exposes the books API as a callable service.
//!
//! # Features
//!
//! - **Typed filters** - Predicates are checked against the book schema when they are built
//! - **Multiple backends** - In-memory and MongoDB storage behind one backend trait
//! - **Access layer** - CRUD, keyword search, filter queries and bulk operations
//! - **Books service** - Every route of the books API as an async operation with its status
//!
//! # Quick Start
//!
//! ```ignore
//! use bookshelf::{prelude::*, memory::InMemoryStore};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let books = store.typed_collection::<Book>();
//!
//!     books
//!         .create(Book::new("Dune", Decimal::from(45), "Fiction", "Frank Herbert", "Available"))
//!         .await?;
//!
//!     let f = Book::filter();
//!     let cheap_fiction = books
//!         .find_by_filter(&Filter::and([f.eq("category", "Fiction")?, f.lt("price", 50)?]))
//!         .await?;
//!     assert_eq!(cheap_fiction.len(), 1);
//!
//!     store.shutdown().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Predicate routes
//!
//! ```ignore
//! use bookshelf::{prelude::*, memory::InMemoryStore};
//!
//! let service = BooksService::new(DocumentStore::new(InMemoryStore::new()));
//! let reply = service.find_by_route("ElemMatch/10/20").await?;
//! assert_eq!(reply.status, Status::Ok);
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;
pub mod routes;
pub mod service;

pub use bookshelf_core::{
    backend, book, collection, document, error, id, query, schema, settings, store, value,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use bookshelf_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use bookshelf_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}

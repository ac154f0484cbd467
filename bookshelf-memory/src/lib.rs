//! In-memory document storage backend for bookshelf.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Wire-form storage** - Stores documents as BSON, exactly as a server would receive them
//! - **Full filter support** - Evaluates every filter node with MongoDB-compatible semantics
//! - **Stable scan order** - Documents are listed in insertion order
//!
//! # Quick Start
//!
//! ```ignore
//! use bookshelf::{book::Book, memory::InMemoryStore, DocumentStore};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let books = store.typed_collection::<Book>();
//!
//!     let dune = books
//!         .create(Book::new("Dune", Decimal::from(45), "Fiction", "Frank Herbert", "Available"))
//!         .await?;
//!     assert!(dune.id.is_some());
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as bookshelf_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};

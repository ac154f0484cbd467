//! MongoDB backend implementation for bookshelf.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait. Filter
//! expressions are compiled into native MongoDB filter documents and executed by the server.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! bookshelf = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Server-side filtering** - Every filter node has a native MongoDB counterpart
//! - **Async/await** - Fully asynchronous API built on MongoDB's async driver
//! - **Error classification** - Duplicate keys, invalid patterns and connectivity failures are
//!   reported as distinct error kinds
//!
//! # Connection
//!
//! The connection string, database and timeouts can be given to the builder directly or
//! taken from a [`BookStoreSettings`](bookshelf_core::settings::BookStoreSettings) section.
//!
//! # Example
//!
//! ```ignore
//! use bookshelf::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "BookStore")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as bookshelf_mongodb;

pub mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};

//! A typed filter algebra and CRUD access layer over a schema-flexible book collection.
//!
//! This crate is the core of the bookshelf project and provides:
//!
//! - **Document model** ([`document`], [`book`], [`schema`]) - The `Document` trait, the book
//!   record and the explicit field-name tables that drive the wire form
//! - **Identifiers and values** ([`id`], [`value`]) - Opaque document ids and the closed set of
//!   literal types a filter may carry
//! - **Query and filtering API** ([`query`]) - Type-checked filter construction and the visitor
//!   backends use to compile or evaluate it
//! - **Store backend abstraction** ([`backend`]) - The trait every storage engine implements
//! - **Collections interface** ([`collection`]) - The access layer: CRUD, keyword search, filter
//!   queries and bulk operations
//! - **Document store** ([`store`]) - Owns a backend and hands out typed collections
//! - **Settings** ([`settings`]) - Connection settings for the book store
//! - **Error handling** ([`error`]) - Error types, result types and their classification
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_core::{book::Book, document::Document, query::Filter, store::DocumentStore};
//!
//! let store = DocumentStore::new(backend);
//! let books = store.typed_collection::<Book>();
//!
//! let f = Book::filter();
//! let cheap_fiction = books
//!     .find_by_filter(&Filter::and([f.eq("category", "Fiction")?, f.lt("price", 50)?]))
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as bookshelf_core;

pub mod backend;
pub mod book;
pub mod collection;
pub mod document;
pub mod error;
pub mod id;
pub mod query;
pub mod schema;
pub mod settings;
pub mod store;
pub mod value;

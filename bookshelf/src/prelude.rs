//! Convenient re-exports of commonly used types from bookshelf.
//!
//! ```ignore
//! use bookshelf::prelude::*;
//! ```
//!
//! This provides access to:
//! - The book document and the `Document` traits
//! - Store backends and builders
//! - Filter construction
//! - The typed collection and the document store
//! - The books service and its error types

pub use bookshelf_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    book::{Book, Comment, Price},
    collection::TypedCollection,
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult, ErrorKind},
    id::DocumentId,
    query::{Expr, FieldOp, Filter, QueryVisitor},
    settings::BookStoreSettings,
    store::DocumentStore,
    value::{Value, ValueType},
};

pub use crate::{
    routes::PredicateRoute,
    service::{BooksService, Reply, ServiceError, ServiceResult, Status},
};

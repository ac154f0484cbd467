//! The books service: the HTTP surface as callable operations.
//!
//! Each method of [`BooksService`] corresponds to one route of the books API and returns
//! either a [`Reply`] carrying the success status and body, or a [`ServiceError`] carrying the
//! failure status. Binding these to an actual HTTP server is left to the caller.
//!
//! | Operation | Route | Success |
//! |---|---|---|
//! | [`list`](BooksService::list) | `GET /books` | 200 |
//! | [`create`](BooksService::create) | `POST /books` | 201 |
//! | [`insert`](BooksService::insert) | `POST /books/insert` | 201 |
//! | [`search`](BooksService::search) | `GET /books/{keyword}` | 200, 404 if nothing matches |
//! | [`update`](BooksService::update) | `PUT /books/{id}` | 204, 404 if absent |
//! | [`delete`](BooksService::delete) | `DELETE /books/{id}` | 204, 404 if absent |
//! | [`delete_bulk`](BooksService::delete_bulk) | `DELETE /books/bulk` | 204, 400 if empty |
//! | [`insert_bulk`](BooksService::insert_bulk) | `POST /books/bulk` | 200, 400 if empty |
//! | [`find_by_route`](BooksService::find_by_route) | `GET /books/<op>/<params>` | 200 |

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::info;

use bookshelf_core::{
    backend::StoreBackend,
    book::Book,
    collection::TypedCollection,
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult, ErrorKind},
    query::Expr,
    settings::BookStoreSettings,
    store::DocumentStore,
};

use crate::routes::PredicateRoute;

/// HTTP status codes produced by the books service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Created,
    NoContent,
    BadRequest,
    NotFound,
    Conflict,
    InternalServerError,
    ServiceUnavailable,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::NoContent => 204,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::Conflict => 409,
            Status::InternalServerError => 500,
            Status::ServiceUnavailable => 503,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Created => "Created",
            Status::NoContent => "No Content",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::Conflict => "Conflict",
            Status::InternalServerError => "Internal Server Error",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

impl From<ErrorKind> for Status {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => Status::NotFound,
            ErrorKind::BadRequest => Status::BadRequest,
            ErrorKind::DuplicateKey => Status::Conflict,
            ErrorKind::BackendUnavailable => Status::ServiceUnavailable,
            ErrorKind::Internal => Status::InternalServerError,
        }
    }
}

/// A failed request.
#[derive(Error, Debug)]
#[error("{status}: {message}")]
pub struct ServiceError {
    pub status: Status,
    pub message: String,
}

impl ServiceError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Status::NotFound, message)
    }
}

impl From<DocumentStoreError> for ServiceError {
    fn from(err: DocumentStoreError) -> Self {
        Self::new(err.kind().into(), err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// A successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub status: Status,
    pub body: T,
}

impl<T> Reply<T> {
    fn new(status: Status, body: T) -> Self {
        Self { status, body }
    }
}

impl<T: Serialize> Reply<T> {
    /// Serializes the body as the JSON a client receives.
    pub fn json(&self) -> DocumentStoreResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.body)?)
    }
}

/// The books API over one collection of a document store.
#[derive(Debug)]
pub struct BooksService<B: StoreBackend> {
    store: DocumentStore<B>,
    collection: String,
}

impl<B: StoreBackend> BooksService<B> {
    /// Serves the default `Books` collection.
    pub fn new(store: DocumentStore<B>) -> Self {
        Self { store, collection: Book::collection_name().to_string() }
    }

    /// Serves the collection named in `settings`.
    pub fn from_settings(store: DocumentStore<B>, settings: &BookStoreSettings) -> Self {
        Self { store, collection: settings.books_collection_name.clone() }
    }

    /// The typed collection behind this service.
    pub fn books(&self) -> TypedCollection<'_, B, Book> {
        self.store.typed_collection_named::<Book>(&self.collection)
    }

    /// Releases the store.
    pub fn into_store(self) -> DocumentStore<B> {
        self.store
    }

    /// `GET /books`
    pub async fn list(&self) -> ServiceResult<Reply<Vec<Book>>> {
        Ok(Reply::new(Status::Ok, self.books().list_all().await?))
    }

    /// `POST /books`
    pub async fn create(&self, book: Book) -> ServiceResult<Reply<Book>> {
        let created = self.books().create(book).await?;
        info!(collection = %self.collection, id = ?created.id, "book created");

        Ok(Reply::new(Status::Created, created))
    }

    /// `POST /books/insert`
    pub async fn insert(&self, book: Book) -> ServiceResult<Reply<Book>> {
        self.create(book).await
    }

    /// `GET /books/{keyword}`: books whose name contains `keyword`, ignoring case.
    ///
    /// # Errors
    ///
    /// Fails with [`Status::NotFound`] if no book matches.
    pub async fn search(&self, keyword: &str) -> ServiceResult<Reply<Vec<Book>>> {
        let books = self.books().find_by_keyword(keyword).await?;

        if books.is_empty() {
            return Err(ServiceError::not_found(format!("no book matches {keyword:?}")));
        }

        Ok(Reply::new(Status::Ok, books))
    }

    /// `PUT /books/{id}`: replaces the book, keeping `id` whatever the body carries.
    ///
    /// # Errors
    ///
    /// Fails with [`Status::NotFound`] if no book has this id.
    pub async fn update(&self, id: &str, book: Book) -> ServiceResult<Reply<()>> {
        let books = self.books();

        if books.get_by_id(id).await?.is_none() {
            return Err(ServiceError::not_found(format!("book {id} not found")));
        }

        // A concurrent delete between the lookup and the replace surfaces as a miss here.
        if !books.replace_by_id(id, book).await? {
            return Err(ServiceError::not_found(format!("book {id} not found")));
        }
        info!(collection = %self.collection, id, "book updated");

        Ok(Reply::new(Status::NoContent, ()))
    }

    /// `DELETE /books/{id}`
    ///
    /// # Errors
    ///
    /// Fails with [`Status::NotFound`] if no book has this id.
    pub async fn delete(&self, id: &str) -> ServiceResult<Reply<()>> {
        let books = self.books();

        if books.get_by_id(id).await?.is_none() {
            return Err(ServiceError::not_found(format!("book {id} not found")));
        }

        books.delete_by_id(id).await?;
        info!(collection = %self.collection, id, "book deleted");

        Ok(Reply::new(Status::NoContent, ()))
    }

    /// `DELETE /books/bulk`
    ///
    /// # Errors
    ///
    /// Fails with [`Status::BadRequest`] if `ids` is empty.
    pub async fn delete_bulk(&self, ids: &[String]) -> ServiceResult<Reply<()>> {
        self.books().delete_many(ids).await?;
        info!(collection = %self.collection, count = ids.len(), "books deleted");

        Ok(Reply::new(Status::NoContent, ()))
    }

    /// `POST /books/bulk`
    ///
    /// # Errors
    ///
    /// Fails with [`Status::BadRequest`] if `books` is empty.
    pub async fn insert_bulk(&self, books: Vec<Book>) -> ServiceResult<Reply<Vec<Book>>> {
        let inserted = self.books().insert_many(books).await?;
        info!(collection = %self.collection, count = inserted.len(), "books inserted");

        Ok(Reply::new(Status::Ok, inserted))
    }

    /// `GET /books/<op>/<params>`: runs the predicate route named by `path`.
    pub async fn find_by_route(&self, path: &str) -> ServiceResult<Reply<Vec<Book>>> {
        let filter = PredicateRoute::parse(path)?.to_filter()?;

        self.find(&filter).await
    }

    /// Runs an arbitrary filter. An empty result is still a success.
    pub async fn find(&self, filter: &Expr) -> ServiceResult<Reply<Vec<Book>>> {
        Ok(Reply::new(Status::Ok, self.books().find_by_filter(filter).await?))
    }
}

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::ClientOptions,
};
use std::time::Duration;
use tracing::{debug, warn};

use bookshelf_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
    query::{Expr, QueryVisitor},
    settings::BookStoreSettings,
};

use crate::query::MongoQueryTranslator;

const DUPLICATE_KEY: i32 = 11000;
const INVALID_REGEX: i32 = 51091;
const BAD_VALUE: i32 = 2;

#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    /// Creates a builder from the book store settings section, including its timeouts.
    pub fn builder_from_settings(settings: &BookStoreSettings) -> MongoDbStoreBuilder {
        let mut builder = MongoDbStoreBuilder::new(&settings.connection_string, &settings.database_name);
        builder.connect_timeout = settings.connect_timeout();
        builder.server_selection_timeout = settings.server_selection_timeout();

        builder
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

// Reads `_id`, assigning a fresh ObjectId when the document has none, so the id is known
// before the round trip.
fn prepare_document(document: &mut Document) -> DocumentStoreResult<ObjectId> {
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

fn is_regex_error(code: i32, message: &str) -> bool {
    code == INVALID_REGEX || (code == BAD_VALUE && message.contains("$regex"))
}

/// Maps a driver error onto the store error taxonomy.
///
/// `ids` are the identifiers the failed operation targeted, in request order; they name the
/// offending document when the server reports a duplicate key.
fn classify(err: MongoError, collection: &str, ids: &[ObjectId]) -> DocumentStoreError {
    let id_at = |index: usize| ids.get(index).map(|oid| oid.to_hex()).unwrap_or_default();

    let classified = match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            DocumentStoreError::DuplicateKey(id_at(0), collection.to_string())
        }
        ErrorKind::InsertMany(e) => match e
            .write_errors
            .as_ref()
            .and_then(|errors| errors.iter().find(|we| we.code == DUPLICATE_KEY))
        {
            Some(we) => DocumentStoreError::DuplicateKey(id_at(we.index), collection.to_string()),
            None => DocumentStoreError::Backend(err.to_string()),
        },
        ErrorKind::Command(e) if is_regex_error(e.code, &e.message) => {
            DocumentStoreError::InvalidPattern(e.message.clone())
        }
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::ConnectionPoolCleared { .. } => {
            DocumentStoreError::BackendUnavailable(err.to_string())
        }
        _ => DocumentStoreError::Backend(err.to_string()),
    };

    warn!(collection, error = %classified, "mongodb operation failed");

    classified
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find_all(&self, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        self.get_collection(collection)
            .find(doc! {})
            .await
            .map_err(|e| classify(e, collection, &[]))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| classify(e, collection, &[]))
    }

    async fn find_one(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(doc! { "_id": *id.as_object_id() })
            .await
            .map_err(|e| classify(e, collection, &[]))
    }

    async fn find_many(&self, collection: &str, filter: &Expr) -> DocumentStoreResult<Vec<Document>> {
        let filter = MongoQueryTranslator.visit_expr(filter)?;
        debug!(collection, %filter, "running translated filter");

        self.get_collection(collection)
            .find(filter)
            .await
            .map_err(|e| classify(e, collection, &[]))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| classify(e, collection, &[]))
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> DocumentStoreResult<DocumentId> {
        let oid = prepare_document(&mut document)?;

        self.get_collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| classify(e, collection, &[oid]))?;

        Ok(oid.into())
    }

    async fn insert_many(
        &self,
        collection: &str,
        mut documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<DocumentId>> {
        let oids = documents
            .iter_mut()
            .map(prepare_document)
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        self.get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(|e| classify(e, collection, &oids))?;

        Ok(oids.into_iter().map(DocumentId::from).collect())
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: &DocumentId,
        mut document: Document,
    ) -> DocumentStoreResult<bool> {
        let oid = *id.as_object_id();
        document.insert("_id", oid);

        let result = self
            .get_collection(collection)
            .replace_one(doc! { "_id": oid }, document)
            .await
            .map_err(|e| classify(e, collection, &[oid]))?;

        Ok(result.matched_count > 0)
    }

    async fn delete_one(&self, collection: &str, id: &DocumentId) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .delete_one(doc! { "_id": *id.as_object_id() })
            .await
            .map_err(|e| classify(e, collection, &[]))?;

        Ok(())
    }

    async fn delete_many(&self, collection: &str, ids: &[DocumentId]) -> DocumentStoreResult<()> {
        let oids: Vec<ObjectId> = ids.iter().map(|id| *id.as_object_id()).collect();

        self.get_collection(collection)
            .delete_many(doc! { "_id": { "$in": oids } })
            .await
            .map_err(|e| classify(e, collection, &[]))?;

        Ok(())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            connect_timeout: None,
            server_selection_timeout: None,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if self.connect_timeout.is_some() {
            options.connect_timeout = self.connect_timeout;
        }
        if self.server_selection_timeout.is_some() {
            options.server_selection_timeout = self.server_selection_timeout;
        }

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_prepare_document_assigns_missing_id() {
        let mut document = doc! { "Name": "Dune" };

        let oid = prepare_document(&mut document).unwrap();

        assert_eq!(document.get_object_id("_id").unwrap(), oid);
    }

    #[rstest]
    fn test_prepare_document_keeps_existing_id() {
        let oid = ObjectId::new();
        let mut document = doc! { "_id": oid, "Name": "Dune" };

        assert_eq!(prepare_document(&mut document).unwrap(), oid);
    }

    #[rstest]
    fn test_prepare_document_rejects_foreign_id() {
        let mut document = doc! { "_id": "not-an-object-id" };

        assert!(matches!(
            prepare_document(&mut document),
            Err(DocumentStoreError::ValidationFailed(_))
        ));
    }

    #[rstest]
    #[case(INVALID_REGEX, "Regular expression is invalid", true)]
    #[case(BAD_VALUE, "$regex has to be a string", true)]
    #[case(BAD_VALUE, "unknown operator", false)]
    #[case(DUPLICATE_KEY, "E11000", false)]
    fn test_regex_error_codes(#[case] code: i32, #[case] message: &str, #[case] expected: bool) {
        assert_eq!(is_regex_error(code, message), expected);
    }

    #[rstest]
    fn test_builder_from_settings_carries_timeouts() {
        let settings = BookStoreSettings::from_json(
            r#"{
                "ConnectionString": "mongodb://localhost:27017",
                "DatabaseName": "BookStore",
                "ConnectTimeoutMs": 1000
            }"#,
        )
        .unwrap();

        let builder = MongoDbStore::builder_from_settings(&settings);

        assert_eq!(builder.dsn, "mongodb://localhost:27017");
        assert_eq!(builder.database, "BookStore");
        assert_eq!(builder.connect_timeout, Some(Duration::from_secs(1)));
        assert_eq!(builder.server_selection_timeout, None);
    }
}

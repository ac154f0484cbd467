//! The book document and its field tables.

use bson::Document as BsonDocument;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    document::Document,
    error::DocumentStoreResult,
    id::DocumentId,
    schema::{FieldSpec, FieldType, Schema, WireReader, WireWriter},
};

/// Wire layout of a [`Price`] entry.
pub static PRICE_SCHEMA: Schema = Schema {
    name: "Price",
    fields: &[
        FieldSpec { name: "currency", wire: "Currency", ty: FieldType::String },
        FieldSpec { name: "value", wire: "Value", ty: FieldType::Decimal },
    ],
    keyword: None,
};

/// Wire layout of a [`Comment`] entry.
pub static COMMENT_SCHEMA: Schema = Schema {
    name: "Comment",
    fields: &[
        FieldSpec { name: "userId", wire: "UserId", ty: FieldType::String },
        FieldSpec { name: "text", wire: "Text", ty: FieldType::String },
    ],
    keyword: None,
};

/// Wire layout of a [`Book`]. The logical `name` field is stored as `Name`.
pub static BOOK_SCHEMA: Schema = Schema {
    name: "Book",
    fields: &[
        FieldSpec { name: "id", wire: "_id", ty: FieldType::Id },
        FieldSpec { name: "name", wire: "Name", ty: FieldType::String },
        FieldSpec { name: "price", wire: "Price", ty: FieldType::Decimal },
        FieldSpec { name: "category", wire: "Category", ty: FieldType::String },
        FieldSpec { name: "author", wire: "Author", ty: FieldType::String },
        FieldSpec { name: "status", wire: "Status", ty: FieldType::String },
        FieldSpec { name: "prices", wire: "Prices", ty: FieldType::RecordArray(&PRICE_SCHEMA) },
        FieldSpec { name: "comments", wire: "Comments", ty: FieldType::RecordArray(&COMMENT_SCHEMA) },
        FieldSpec { name: "tags", wire: "Tags", ty: FieldType::StringArray },
    ],
    keyword: Some("name"),
};

/// A book in the collection.
///
/// `prices`, `comments` and `tags` distinguish "absent" (`None`, no key stored) from
/// "present but empty" (`Some(vec![])`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(alias = "bookName")]
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub author: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prices: Option<Vec<Price>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A price of a book in some currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    #[serde(default)]
    pub currency: Option<String>,
    pub value: Decimal,
}

/// A reader comment on a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Book {
    /// Creates a book with the required fields and no nested collections.
    pub fn new(
        name: impl Into<String>,
        price: Decimal,
        category: impl Into<String>,
        author: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            category: category.into(),
            author: author.into(),
            status: status.into(),
            prices: None,
            comments: None,
            tags: None,
        }
    }

    pub fn with_prices(mut self, prices: Vec<Price>) -> Self {
        self.prices = Some(prices);
        self
    }

    pub fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = Some(comments);
        self
    }

    pub fn with_tags<T: Into<String>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

impl Price {
    pub fn new(currency: impl Into<String>, value: Decimal) -> Self {
        Self { currency: Some(currency.into()), value }
    }
}

impl Comment {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), text: Some(text.into()) }
    }
}

impl Document for Book {
    fn id(&self) -> Option<&DocumentId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = Some(id);
    }

    fn collection_name() -> &'static str {
        "Books"
    }

    fn schema() -> &'static Schema {
        &BOOK_SCHEMA
    }

    fn to_wire(&self) -> DocumentStoreResult<BsonDocument> {
        Ok(WireWriter::new(&BOOK_SCHEMA)
            .id("id", self.id.as_ref())?
            .string("name", &self.name)?
            .decimal("price", &self.price)?
            .string("category", &self.category)?
            .string("author", &self.author)?
            .string("status", &self.status)?
            .record_array("prices", self.prices.as_deref(), |price, w| {
                w.optional_string("currency", price.currency.as_deref())?
                    .decimal("value", &price.value)
            })?
            .record_array("comments", self.comments.as_deref(), |comment, w| {
                w.optional_string("userId", comment.user_id.as_deref())?
                    .optional_string("text", comment.text.as_deref())
            })?
            .string_array("tags", self.tags.as_deref())?
            .finish())
    }

    fn from_wire(document: &BsonDocument) -> DocumentStoreResult<Self> {
        let r = WireReader::new(&BOOK_SCHEMA, document);

        Ok(Book {
            id: r.id("id")?,
            name: r.string("name")?,
            price: r.decimal("price")?,
            category: r.string("category")?,
            author: r.string("author")?,
            status: r.string("status")?,
            prices: r.record_array("prices", |p| {
                Ok(Price { currency: p.optional_string("currency")?, value: p.decimal("value")? })
            })?,
            comments: r.record_array("comments", |c| {
                Ok(Comment {
                    user_id: c.optional_string("userId")?,
                    text: c.optional_string("text")?,
                })
            })?,
            tags: r.string_array("tags")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{document::DocumentExt, error::DocumentStoreError};
    use bson::{Bson, doc};
    use rstest::{fixture, rstest};
    use std::str::FromStr;

    #[fixture]
    fn dune() -> Book {
        Book::new("Dune", Decimal::from_str("45.50").unwrap(), "Fiction", "Frank Herbert", "Available")
            .with_prices(vec![Price::new("USD", Decimal::from(12))])
            .with_comments(vec![Comment::new("u1", "classic")])
            .with_tags(["sci-fi", "desert"])
    }

    #[rstest]
    fn test_name_is_stored_under_wire_name(dune: Book) {
        let wire = dune.to_wire().unwrap();

        assert_eq!(wire.get("Name"), Some(&Bson::String("Dune".into())));
        assert!(wire.get("name").is_none());
        assert!(matches!(wire.get("Price"), Some(Bson::Decimal128(_))));
    }

    #[rstest]
    fn test_json_accepts_book_name_alias() {
        let book: Book = serde_json::from_str(
            r#"{"bookName": "Dune", "price": "45", "category": "Fiction", "author": "F", "status": "A"}"#,
        )
        .unwrap();

        assert_eq!(book.name, "Dune");
        assert_eq!(serde_json::to_value(&book).unwrap()["name"], "Dune");
    }

    #[rstest]
    fn test_wire_round_trip_keeps_every_field(mut dune: Book) {
        dune.set_id(DocumentId::new());

        assert_eq!(Book::from_wire(&dune.to_wire().unwrap()).unwrap(), dune);
    }

    #[rstest]
    fn test_absent_and_empty_tags_are_distinct(dune: Book) {
        let mut absent = dune.clone();
        absent.tags = None;
        let mut empty = dune;
        empty.tags = Some(vec![]);

        assert!(!absent.to_wire().unwrap().contains_key("Tags"));
        assert_eq!(empty.to_wire().unwrap().get("Tags"), Some(&Bson::Array(vec![])));
        assert_eq!(Book::from_wire(&empty.to_wire().unwrap()).unwrap().tags, Some(vec![]));
    }

    #[rstest]
    fn test_missing_required_field_fails_validation() {
        let wire = doc! { "Name": "Dune", "Category": "Fiction", "Author": "F", "Status": "A" };

        assert!(matches!(
            Book::from_wire(&wire),
            Err(DocumentStoreError::ValidationFailed(_))
        ));
    }

    #[rstest]
    fn test_wrongly_typed_field_fails_validation() {
        let wire = doc! {
            "Name": 7, "Price": 10, "Category": "Fiction", "Author": "F", "Status": "A",
        };

        assert!(matches!(
            Book::from_wire(&wire),
            Err(DocumentStoreError::ValidationFailed(_))
        ));
    }

    #[rstest]
    fn test_json_uses_logical_names(dune: Book) {
        let json = dune.to_json().unwrap();

        assert_eq!(json["name"], "Dune");
        assert_eq!(json["comments"][0]["userId"], "u1");
        assert!(json.get("id").is_none());
        assert_eq!(Book::from_json(json).unwrap(), dune);
    }
}

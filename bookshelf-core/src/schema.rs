//! Declared field tables for document types.
//!
//! A [`Schema`] lists every field of a document type with its logical name (the name used by
//! callers and in JSON), its wire name (the key stored in the backend) and its semantic type.
//! The filter builder consults it to type-check predicate values and to resolve wire names;
//! the serialization boundary consults it through [`WireReader`] and [`WireWriter`].

use bson::{Bson, Document as BsonDocument};
use rust_decimal::Decimal;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
    value::{decimal_from_bson, decimal_to_bson},
};

/// Semantic type of a declared field.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    /// The document identifier.
    Id,
    /// A string.
    String,
    /// An exact decimal.
    Decimal,
    /// An array of strings.
    StringArray,
    /// An array of nested records described by their own schema.
    RecordArray(&'static Schema),
}

impl FieldType {
    /// Human readable name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Id => "id",
            FieldType::String => "string",
            FieldType::Decimal => "decimal",
            FieldType::StringArray => "string array",
            FieldType::RecordArray(_) => "record array",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::StringArray | FieldType::RecordArray(_))
    }
}

/// One entry of a field table.
#[derive(Debug)]
pub struct FieldSpec {
    /// Logical name.
    pub name: &'static str,
    /// Key used in the stored document.
    pub wire: &'static str,
    pub ty: FieldType,
}

/// Field table of a document or nested record type.
#[derive(Debug)]
pub struct Schema {
    /// Name of the described type.
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    /// Logical name of the field searched by keyword lookups.
    pub keyword: Option<&'static str>,
}

impl Schema {
    /// Looks a field up by logical name, then by wire name, then ignoring ASCII case.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        let fields: &'static [FieldSpec] = self.fields;

        fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| fields.iter().find(|f| f.wire == name))
            .or_else(|| {
                fields
                    .iter()
                    .find(|f| f.name.eq_ignore_ascii_case(name) || f.wire.eq_ignore_ascii_case(name))
            })
    }

    /// Like [`Schema::field`] but fails with `InvalidArgument` for unknown names.
    pub fn require(&self, name: &str) -> DocumentStoreResult<&'static FieldSpec> {
        self.field(name).ok_or_else(|| {
            DocumentStoreError::InvalidArgument(format!("unknown field {name:?} on {}", self.name))
        })
    }

    /// Resolves a field path to its wire name; undeclared paths pass through verbatim.
    ///
    /// Dotted paths are resolved segment by segment, descending into the schema of a record
    /// array, so `prices.currency` becomes `Prices.Currency`.
    pub fn wire_name(&self, path: &str) -> String {
        let Some((head, rest)) = path.split_once('.') else {
            return self
                .field(path)
                .map(|f| f.wire.to_string())
                .unwrap_or_else(|| path.to_string());
        };

        match self.field(head) {
            Some(FieldSpec { wire, ty: FieldType::RecordArray(nested), .. }) => {
                format!("{wire}.{}", nested.wire_name(rest))
            }
            Some(spec) => format!("{}.{rest}", spec.wire),
            None => path.to_string(),
        }
    }

    /// Wire name of the keyword field, if the schema declares one.
    pub fn keyword_field(&self) -> Option<&'static FieldSpec> {
        self.keyword.and_then(|name| self.field(name))
    }
}

/// Reads declared fields out of a stored document, reporting shape problems as
/// [`DocumentStoreError::ValidationFailed`].
pub struct WireReader<'a> {
    schema: &'static Schema,
    document: &'a BsonDocument,
}

impl<'a> WireReader<'a> {
    pub fn new(schema: &'static Schema, document: &'a BsonDocument) -> Self {
        Self { schema, document }
    }

    fn raw(&self, name: &str) -> DocumentStoreResult<(&'static FieldSpec, Option<&'a Bson>)> {
        let spec = self.schema.require(name)?;

        Ok((spec, self.document.get(spec.wire).filter(|v| !matches!(v, Bson::Null))))
    }

    fn invalid(&self, spec: &FieldSpec, problem: &str) -> DocumentStoreError {
        DocumentStoreError::ValidationFailed(format!(
            "{}.{} ({}): {problem}",
            self.schema.name, spec.name, spec.wire
        ))
    }

    pub fn id(&self, name: &str) -> DocumentStoreResult<Option<DocumentId>> {
        match self.raw(name)? {
            (_, None) => Ok(None),
            (spec, Some(value)) => DocumentId::from_bson(value)
                .map(Some)
                .ok_or_else(|| self.invalid(spec, "expected an object id")),
        }
    }

    pub fn optional_string(&self, name: &str) -> DocumentStoreResult<Option<String>> {
        match self.raw(name)? {
            (_, None) => Ok(None),
            (_, Some(Bson::String(s))) => Ok(Some(s.clone())),
            (spec, Some(_)) => Err(self.invalid(spec, "expected a string")),
        }
    }

    pub fn string(&self, name: &str) -> DocumentStoreResult<String> {
        let spec = self.schema.require(name)?;

        self.optional_string(name)?
            .ok_or_else(|| self.invalid(spec, "missing required field"))
    }

    pub fn decimal(&self, name: &str) -> DocumentStoreResult<Decimal> {
        match self.raw(name)? {
            (spec, None) => Err(self.invalid(spec, "missing required field")),
            (spec, Some(value)) => {
                decimal_from_bson(value).ok_or_else(|| self.invalid(spec, "expected a decimal"))
            }
        }
    }

    pub fn string_array(&self, name: &str) -> DocumentStoreResult<Option<Vec<String>>> {
        match self.raw(name)? {
            (_, None) => Ok(None),
            (spec, Some(Bson::Array(items))) => items
                .iter()
                .map(|item| match item {
                    Bson::String(s) => Ok(s.clone()),
                    _ => Err(self.invalid(spec, "expected an array of strings")),
                })
                .collect::<DocumentStoreResult<Vec<_>>>()
                .map(Some),
            (spec, Some(_)) => Err(self.invalid(spec, "expected an array")),
        }
    }

    /// Reads an array of nested records, decoding each element with `decode`.
    pub fn record_array<T>(
        &self,
        name: &str,
        decode: impl Fn(WireReader<'a>) -> DocumentStoreResult<T>,
    ) -> DocumentStoreResult<Option<Vec<T>>> {
        match self.raw(name)? {
            (_, None) => Ok(None),
            (spec, Some(Bson::Array(items))) => {
                let FieldType::RecordArray(nested) = spec.ty else {
                    return Err(self.invalid(spec, "not declared as a record array"));
                };

                items
                    .iter()
                    .map(|item| match item {
                        Bson::Document(doc) => decode(WireReader::new(nested, doc)),
                        _ => Err(self.invalid(spec, "expected an array of documents")),
                    })
                    .collect::<DocumentStoreResult<Vec<_>>>()
                    .map(Some)
            }
            (spec, Some(_)) => Err(self.invalid(spec, "expected an array")),
        }
    }
}

/// Builds a stored document from declared fields. Absent optional values leave the key out.
pub struct WireWriter {
    schema: &'static Schema,
    document: BsonDocument,
}

impl WireWriter {
    pub fn new(schema: &'static Schema) -> Self {
        Self { schema, document: BsonDocument::new() }
    }

    fn put(&mut self, name: &str, value: Bson) -> DocumentStoreResult<()> {
        let spec = self.schema.require(name)?;
        self.document.insert(spec.wire, value);

        Ok(())
    }

    pub fn id(mut self, name: &str, id: Option<&DocumentId>) -> DocumentStoreResult<Self> {
        if let Some(id) = id {
            self.put(name, Bson::from(*id))?;
        }

        Ok(self)
    }

    pub fn string(mut self, name: &str, value: &str) -> DocumentStoreResult<Self> {
        self.put(name, Bson::String(value.to_string()))?;

        Ok(self)
    }

    pub fn optional_string(mut self, name: &str, value: Option<&str>) -> DocumentStoreResult<Self> {
        if let Some(value) = value {
            self.put(name, Bson::String(value.to_string()))?;
        }

        Ok(self)
    }

    pub fn decimal(mut self, name: &str, value: &Decimal) -> DocumentStoreResult<Self> {
        self.put(name, decimal_to_bson(value)?)?;

        Ok(self)
    }

    pub fn string_array(mut self, name: &str, values: Option<&[String]>) -> DocumentStoreResult<Self> {
        if let Some(values) = values {
            self.put(
                name,
                Bson::Array(values.iter().cloned().map(Bson::String).collect()),
            )?;
        }

        Ok(self)
    }

    /// Writes an array of nested records, encoding each element with `encode`.
    pub fn record_array<T>(
        mut self,
        name: &str,
        values: Option<&[T]>,
        encode: impl Fn(&T, WireWriter) -> DocumentStoreResult<WireWriter>,
    ) -> DocumentStoreResult<Self> {
        let Some(values) = values else {
            return Ok(self);
        };

        let spec = self.schema.require(name)?;
        let FieldType::RecordArray(nested) = spec.ty else {
            return Err(DocumentStoreError::ValidationFailed(format!(
                "{}.{} is not declared as a record array",
                self.schema.name, spec.name
            )));
        };

        let items = values
            .iter()
            .map(|value| encode(value, WireWriter::new(nested)).map(|w| Bson::Document(w.finish())))
            .collect::<DocumentStoreResult<Vec<_>>>()?;
        self.document.insert(spec.wire, Bson::Array(items));

        Ok(self)
    }

    pub fn finish(self) -> BsonDocument {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use crate::book::BOOK_SCHEMA;
    use rstest::rstest;

    #[rstest]
    #[case("name", "Name")]
    #[case("Tags", "Tags")]
    #[case("prices.currency", "Prices.Currency")]
    #[case("Comments.userId", "Comments.UserId")]
    #[case("prices.discount", "Prices.discount")]
    #[case("name.first", "Name.first")]
    #[case("publisher.city", "publisher.city")]
    fn test_wire_name_resolves_each_segment(#[case] path: &str, #[case] wire: &str) {
        assert_eq!(BOOK_SCHEMA.wire_name(path), wire);
    }
}

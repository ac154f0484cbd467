//! Query translation from bookshelf filter expressions to MongoDB query syntax.
//!
//! This module translates abstract filter expressions into MongoDB BSON filter documents
//! for execution by the MongoDB query engine. Literals and regex patterns are always placed
//! in value position of the filter document, never spliced into operator or field names.

use bson::{Bson, Document, doc};

use bookshelf_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor},
    value::{Value, ValueType},
};

/// Translates filter expressions into MongoDB query documents.
///
/// This struct implements the [`QueryVisitor`] trait to convert abstract
/// filter expressions into MongoDB's native BSON query syntax.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    fn visit_all(&mut self, exprs: &[Expr]) -> Result<Vec<Document>, DocumentStoreError> {
        exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect()
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! { "$and": self.visit_all(exprs)? })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // `$or` rejects an empty array; match nothing instead.
        if exprs.is_empty() {
            return Ok(doc! { "_id": { "$in": [] } });
        }

        Ok(doc! { "$or": self.visit_all(exprs)? })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$nor": [self.visit_expr(expr)?] })
    }

    fn visit_exists(&mut self, field: &str) -> Result<Self::Output, Self::Error> {
        Ok(doc! { field: { "$exists": true } })
    }

    fn visit_type(&mut self, field: &str, ty: ValueType) -> Result<Self::Output, Self::Error> {
        Ok(doc! { field: { "$type": ty.alias() } })
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: FieldOp,
        value: &Value,
    ) -> Result<Self::Output, Self::Error> {
        let value: Bson = value.to_bson()?;

        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::In => doc! { "$in": value },
                FieldOp::Nin => doc! { "$nin": value },
                FieldOp::All => doc! { "$all": value },
            }
        })
    }

    fn visit_regex(
        &mut self,
        field: &str,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self::Output, Self::Error> {
        let mut condition = doc! { "$regex": pattern };

        if case_insensitive {
            condition.insert("$options", "i");
        }

        Ok(doc! { field: condition })
    }

    fn visit_size(&mut self, field: &str, len: usize) -> Result<Self::Output, Self::Error> {
        let len = i64::try_from(len).map_err(|_| {
            DocumentStoreError::InvalidArgument(format!("size {len} is out of range"))
        })?;

        Ok(doc! { field: { "$size": len } })
    }

    fn visit_elem_match(&mut self, field: &str, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! { field: { "$elemMatch": self.visit_expr(expr)? } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_core::{book::Book, document::Document as _, query::Filter, value::decimal_to_bson};
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn translate(expr: &Expr) -> Document {
        MongoQueryTranslator.visit_expr(expr).unwrap()
    }

    #[rstest]
    fn test_and_of_comparisons_uses_wire_names() {
        let f = Book::filter();
        let expr = Filter::and([f.eq("category", "Fiction").unwrap(), f.lt("price", 50).unwrap()]);

        assert_eq!(
            translate(&expr),
            doc! {
                "$and": [
                    { "Category": { "$eq": "Fiction" } },
                    { "Price": { "$lt": decimal_to_bson(&Decimal::from(50)).unwrap() } },
                ]
            }
        );
    }

    #[rstest]
    fn test_empty_connectives() {
        assert_eq!(translate(&Filter::and([])), doc! {});
        assert_eq!(translate(&Filter::or([])), doc! { "_id": { "$in": [] } });
    }

    #[rstest]
    fn test_not_compiles_to_nor() {
        let expr = Filter::not(Book::filter().eq("category", "Fiction").unwrap());

        assert_eq!(translate(&expr), doc! { "$nor": [ { "Category": { "$eq": "Fiction" } } ] });
    }

    #[rstest]
    fn test_regex_pattern_stays_a_value() {
        let expr = Book::filter().regex("name", "^D.*\"}", true).unwrap();

        assert_eq!(
            translate(&expr),
            doc! { "Name": { "$regex": "^D.*\"}", "$options": "i" } }
        );
    }

    #[rstest]
    fn test_case_sensitive_regex_has_no_options() {
        let expr = Book::filter().regex("name", "^D", false).unwrap();

        assert_eq!(translate(&expr), doc! { "Name": { "$regex": "^D" } });
    }

    #[rstest]
    fn test_array_operators() {
        let f = Book::filter();

        assert_eq!(
            translate(&f.all("tags", ["a", "b", "a"]).unwrap()),
            doc! { "Tags": { "$all": ["a", "b"] } }
        );
        assert_eq!(translate(&f.size("comments", 2).unwrap()), doc! { "Comments": { "$size": 2_i64 } });
        assert_eq!(
            translate(&f.not_in("status", ["Sold"]).unwrap()),
            doc! { "Status": { "$nin": ["Sold"] } }
        );
    }

    #[rstest]
    fn test_elem_match_translates_nested_fields() {
        let expr = Book::filter()
            .elem_match("prices", |p| Ok(Filter::and([p.gte("value", 10)?, p.lte("value", 20)?])))
            .unwrap();

        assert_eq!(
            translate(&expr),
            doc! {
                "Prices": { "$elemMatch": { "$and": [
                    { "Value": { "$gte": decimal_to_bson(&Decimal::from(10)).unwrap() } },
                    { "Value": { "$lte": decimal_to_bson(&Decimal::from(20)).unwrap() } },
                ] } }
            }
        );
    }

    #[rstest]
    fn test_exists_and_type() {
        let f = Book::filter();

        assert_eq!(translate(&f.exists("tags")), doc! { "Tags": { "$exists": true } });
        assert_eq!(
            translate(&f.type_is("price", ValueType::Decimal)),
            doc! { "Price": { "$type": "decimal" } }
        );
    }
}

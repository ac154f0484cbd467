//! Query expression evaluation for in-memory document filtering.
//!
//! Expressions are evaluated with the same semantics a MongoDB server applies to the
//! equivalent filter document:
//!
//! - a predicate on an array field matches if the array itself or any of its elements match
//! - `Ne` and `Nin` are the negations of `Eq` and `In`, so they also match absent fields
//! - ordering comparisons never match an absent field, nor values of a different kind
//! - numbers of any wire representation compare by exact decimal value
//! - a dotted path continues into every document of an array it crosses
//!
//! Regular expressions are compiled once per query, before the scan, so an invalid pattern
//! is reported even when the collection is empty.

use bson::{Bson, Document as BsonDocument, oid::ObjectId};
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use std::{cmp::Ordering, collections::HashMap};

use bookshelf_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
    value::{Value, ValueType, decimal_from_bson},
};

/// Comparable view of a BSON value.
///
/// Every numeric representation is normalized to [`Decimal`].
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(Decimal),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// A value of a kind filters cannot express; equal to nothing.
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => {
                decimal_from_bson(bson)
                    .map(Comparable::Number)
                    .unwrap_or(Comparable::Opaque)
            }
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(oid) => Comparable::ObjectId(*oid),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

type PatternCache = HashMap<(String, bool), Regex>;

/// Compiles every regex in `expr`.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidPattern`] for the first pattern that fails to compile.
fn compile_patterns(expr: &Expr) -> DocumentStoreResult<PatternCache> {
    let mut patterns = PatternCache::new();
    let mut failure = None;

    expr.walk(&mut |node| {
        let Expr::Regex { pattern, case_insensitive, .. } = node else {
            return;
        };
        let key = (pattern.clone(), *case_insensitive);

        if failure.is_some() || patterns.contains_key(&key) {
            return;
        }

        match RegexBuilder::new(pattern)
            .case_insensitive(*case_insensitive)
            .build()
        {
            Ok(regex) => {
                patterns.insert(key, regex);
            }
            Err(e) => failure = Some(DocumentStoreError::InvalidPattern(e.to_string())),
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(patterns),
    }
}

/// Collects every value a possibly dotted path reaches.
///
/// A segment that lands on an array of documents continues into each element, so
/// `Prices.Currency` reaches the currency of every price entry. An empty result means the
/// path is absent.
fn lookup<'d>(document: &'d BsonDocument, path: &str) -> Vec<&'d Bson> {
    let mut reached = Vec::new();
    collect_path(document, path, &mut reached);

    reached
}

fn collect_path<'d>(document: &'d BsonDocument, path: &str, reached: &mut Vec<&'d Bson>) {
    let Some((head, rest)) = path.split_once('.') else {
        reached.extend(document.get(path));
        return;
    };

    match document.get(head) {
        Some(Bson::Document(inner)) => collect_path(inner, rest, reached),
        Some(Bson::Array(items)) => {
            for item in items {
                if let Bson::Document(inner) = item {
                    collect_path(inner, rest, reached);
                }
            }
        }
        _ => {}
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a BsonDocument,
    patterns: &'a PatternCache,
}

impl<'a> DocumentEvaluator<'a> {
    fn new(document: &'a BsonDocument, patterns: &'a PatternCache) -> Self {
        Self { document, patterns }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns clones of the documents matching `expr`, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidPattern`] if a regex in `expr` does not compile.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a BsonDocument>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<BsonDocument>> {
        let patterns = compile_patterns(expr)?;
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document, &patterns).evaluate(expr)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }

    fn field(&self, field: &str) -> Vec<&'a Bson> {
        lookup(self.document, field)
    }
}

// Equality with array traversal: a value matches if it equals the literal or, when it is an
// array, if any element does.
fn value_equals(value: &Bson, literal: &Bson) -> bool {
    let literal = Comparable::from(literal);

    match Comparable::from(value) {
        Comparable::Array(items) => {
            items.iter().any(|item| *item == literal) || Comparable::Array(items) == literal
        }
        value => value == literal,
    }
}

// A null literal also matches an absent field.
fn equals(reached: &[&Bson], literal: &Bson) -> bool {
    if reached.is_empty() {
        return matches!(literal, Bson::Null);
    }

    reached.iter().any(|value| value_equals(value, literal))
}

fn is_in(reached: &[&Bson], literals: &Bson) -> bool {
    match literals {
        Bson::Array(literals) => literals.iter().any(|literal| equals(reached, literal)),
        literal => equals(reached, literal),
    }
}

fn compare(reached: &[&Bson], literal: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let literal = Comparable::from(literal);
    let holds = |value: &Comparable<'_>| value.partial_cmp(&literal).is_some_and(accept);

    reached.iter().any(|value| match Comparable::from(*value) {
        Comparable::Array(items) => items.iter().any(holds),
        value => holds(&value),
    })
}

fn has_type(value: &Bson, ty: ValueType) -> bool {
    match value {
        Bson::Array(items) if ty != ValueType::Array => {
            items.iter().any(|item| ValueType::of(item) == Some(ty))
        }
        value => ValueType::of(value) == Some(ty),
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str) -> Result<Self::Output, Self::Error> {
        Ok(!self.field(field).is_empty())
    }

    fn visit_type(&mut self, field: &str, ty: ValueType) -> Result<Self::Output, Self::Error> {
        Ok(self.field(field).into_iter().any(|value| has_type(value, ty)))
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: FieldOp,
        value: &Value,
    ) -> Result<Self::Output, Self::Error> {
        let literal = value.to_bson()?;
        let reached = self.field(field);

        Ok(match op {
            FieldOp::Eq => equals(&reached, &literal),
            FieldOp::Ne => !equals(&reached, &literal),
            FieldOp::Gt => compare(&reached, &literal, Ordering::is_gt),
            FieldOp::Gte => compare(&reached, &literal, Ordering::is_ge),
            FieldOp::Lt => compare(&reached, &literal, Ordering::is_lt),
            FieldOp::Lte => compare(&reached, &literal, Ordering::is_le),
            FieldOp::In => is_in(&reached, &literal),
            FieldOp::Nin => !is_in(&reached, &literal),
            FieldOp::All => match &literal {
                Bson::Array(required)
                    if !required.is_empty()
                        && reached.iter().any(|value| matches!(value, Bson::Array(_))) =>
                {
                    required.iter().all(|item| equals(&reached, item))
                }
                _ => false,
            },
        })
    }

    fn visit_regex(
        &mut self,
        field: &str,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self::Output, Self::Error> {
        let regex = self
            .patterns
            .get(&(pattern.to_string(), case_insensitive))
            .ok_or_else(|| {
                DocumentStoreError::InvalidPattern(format!("pattern {pattern:?} was not compiled"))
            })?;
        let is_match = |value: &Bson| matches!(value, Bson::String(text) if regex.is_match(text));

        Ok(self.field(field).into_iter().any(|value| match value {
            Bson::Array(items) => items.iter().any(|item| is_match(item)),
            value => is_match(value),
        }))
    }

    fn visit_size(&mut self, field: &str, len: usize) -> Result<Self::Output, Self::Error> {
        Ok(self
            .field(field)
            .into_iter()
            .any(|value| matches!(value, Bson::Array(items) if items.len() == len)))
    }

    fn visit_elem_match(&mut self, field: &str, expr: &Expr) -> Result<Self::Output, Self::Error> {
        for value in self.field(field) {
            let Bson::Array(items) = value else {
                continue;
            };

            for item in items {
                if let Bson::Document(element) = item {
                    if DocumentEvaluator::new(element, self.patterns).evaluate(expr)? {
                        return Ok(true);
                    }
                }
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_core::{
        book::Book,
        document::Document,
        query::Filter,
        value::decimal_to_bson,
    };
    use bson::doc;
    use rstest::{fixture, rstest};
    use std::str::FromStr;

    fn price(text: &str) -> Bson {
        decimal_to_bson(&Decimal::from_str(text).unwrap()).unwrap()
    }

    #[fixture]
    fn books() -> Vec<BsonDocument> {
        vec![
            doc! {
                "_id": ObjectId::new(), "Name": "Dune", "Price": price("45.00"),
                "Category": "Fiction", "Author": "Frank Herbert", "Status": "Available",
                "Prices": [ { "Currency": "USD", "Value": price("12.00") } ],
                "Comments": [ { "UserId": "u1", "Text": "classic" } ],
                "Tags": ["sci-fi", "desert"],
            },
            doc! {
                "_id": ObjectId::new(), "Name": "Harry Potter", "Price": price("60"),
                "Category": "Fiction", "Author": "J. K. Rowling", "Status": "Sold",
                "Tags": [],
            },
            doc! {
                "_id": ObjectId::new(), "Name": "Sapiens", "Price": 20,
                "Category": "Non-fiction", "Author": "Yuval Noah Harari", "Status": "Available",
            },
        ]
    }

    fn names(documents: &[BsonDocument]) -> Vec<&str> {
        documents
            .iter()
            .map(|d| d.get_str("Name").unwrap())
            .collect()
    }

    fn run(documents: &[BsonDocument], expr: &Expr) -> Vec<BsonDocument> {
        DocumentEvaluator::filter_documents(documents, expr).unwrap()
    }

    #[rstest]
    fn test_and_of_category_and_price(books: Vec<BsonDocument>) {
        let f = Book::filter();
        let expr = Filter::and([f.eq("category", "Fiction").unwrap(), f.lt("price", 50).unwrap()]);

        assert_eq!(names(&run(&books, &expr)), vec!["Dune"]);
    }

    #[rstest]
    fn test_integer_and_decimal_prices_compare_by_value(books: Vec<BsonDocument>) {
        let f = Book::filter();

        assert_eq!(names(&run(&books, &f.eq("price", 20).unwrap())), vec!["Sapiens"]);
        assert_eq!(names(&run(&books, &f.gte("price", 60).unwrap())), vec!["Harry Potter"]);
    }

    #[rstest]
    fn test_empty_and_matches_everything_and_empty_or_nothing(books: Vec<BsonDocument>) {
        assert_eq!(run(&books, &Filter::and([])).len(), 3);
        assert!(run(&books, &Filter::or([])).is_empty());
    }

    #[rstest]
    fn test_exists_distinguishes_empty_from_absent(books: Vec<BsonDocument>) {
        let expr = Book::filter().exists("tags");

        assert_eq!(names(&run(&books, &expr)), vec!["Dune", "Harry Potter"]);
    }

    #[rstest]
    fn test_size_never_matches_absent_array(books: Vec<BsonDocument>) {
        let f = Book::filter();

        assert_eq!(names(&run(&books, &f.size("tags", 0).unwrap())), vec!["Harry Potter"]);
        assert_eq!(names(&run(&books, &f.size("comments", 1).unwrap())), vec!["Dune"]);
    }

    #[rstest]
    fn test_not_equal_matches_absent_field() {
        let documents = vec![doc! { "Name": "Untitled" }];
        let expr = Book::filter().ne("status", "Sold").unwrap();

        assert_eq!(run(&documents, &expr).len(), 1);
        assert!(run(&documents, &Book::filter().gt("price", 0).unwrap()).is_empty());
    }

    #[rstest]
    fn test_array_membership_operators(books: Vec<BsonDocument>) {
        let f = Book::filter();

        assert_eq!(names(&run(&books, &f.eq("tags", "desert").unwrap())), vec!["Dune"]);
        assert_eq!(
            names(&run(&books, &f.all("tags", ["desert", "sci-fi"]).unwrap())),
            vec!["Dune"]
        );
        assert!(run(&books, &f.all("tags", ["desert", "ocean"]).unwrap()).is_empty());
        assert_eq!(
            names(&run(&books, &f.not_in("status", ["Sold", "Reserved"]).unwrap())),
            vec!["Dune", "Sapiens"]
        );
    }

    #[rstest]
    fn test_elem_match_evaluates_element_fields(books: Vec<BsonDocument>) {
        let in_range = |lo: i32, hi: i32| {
            Book::filter()
                .elem_match("prices", |p| Ok(Filter::and([p.gte("value", lo)?, p.lte("value", hi)?])))
                .unwrap()
        };

        assert_eq!(names(&run(&books, &in_range(10, 15))), vec!["Dune"]);
        assert!(run(&books, &in_range(13, 20)).is_empty());
    }

    #[rstest]
    #[case("^D", false, vec!["Dune"])]
    #[case("potter", true, vec!["Harry Potter"])]
    #[case("potter", false, vec![])]
    fn test_regex(
        books: Vec<BsonDocument>,
        #[case] pattern: &str,
        #[case] case_insensitive: bool,
        #[case] expected: Vec<&str>,
    ) {
        let expr = Book::filter().regex("name", pattern, case_insensitive).unwrap();

        assert_eq!(names(&run(&books, &expr)), expected);
    }

    #[rstest]
    fn test_invalid_regex_fails_even_without_documents() {
        let expr = Book::filter().regex("name", "(unclosed", true).unwrap();

        assert!(matches!(
            DocumentEvaluator::filter_documents(&Vec::<BsonDocument>::new(), &expr),
            Err(DocumentStoreError::InvalidPattern(_))
        ));
    }

    #[rstest]
    #[case(r"^(D)\1")]
    #[case(r"Dune(?=\s)")]
    fn test_pcre_only_syntax_is_an_invalid_pattern(books: Vec<BsonDocument>, #[case] pattern: &str) {
        let expr = Book::filter().regex("name", pattern, false).unwrap();

        assert!(matches!(
            DocumentEvaluator::filter_documents(&books, &expr),
            Err(DocumentStoreError::InvalidPattern(_))
        ));
    }

    #[rstest]
    #[case(ValueType::Decimal, vec!["Dune", "Harry Potter"])]
    #[case(ValueType::Int, vec!["Sapiens"])]
    #[case(ValueType::String, vec![])]
    fn test_type_of_price(
        books: Vec<BsonDocument>,
        #[case] ty: ValueType,
        #[case] expected: Vec<&str>,
    ) {
        assert_eq!(names(&run(&books, &Book::filter().type_is("price", ty))), expected);
    }

    #[rstest]
    fn test_dotted_path_crosses_record_arrays(books: Vec<BsonDocument>) {
        let f = Book::filter();

        assert_eq!(names(&run(&books, &f.exists("prices.currency"))), vec!["Dune"]);
        assert_eq!(names(&run(&books, &f.exists("Comments.UserId"))), vec!["Dune"]);
        assert!(run(&books, &f.exists("prices.discount")).is_empty());
        assert_eq!(
            names(&run(&books, &f.type_is("prices.value", ValueType::Decimal))),
            vec!["Dune"]
        );
    }

    #[rstest]
    fn test_dotted_path_reaches_every_element() {
        let documents = vec![doc! {
            "Name": "Dune",
            "Prices": [ { "Currency": "USD" }, { "Value": price("30") }, "loose" ],
        }];

        assert_eq!(run(&documents, &Expr::Exists("Prices.Currency".into())).len(), 1);
        assert_eq!(
            run(&documents, &Expr::field("Prices.Value", FieldOp::Gt, Value::from(20))).len(),
            1
        );
        assert_eq!(
            run(&documents, &Expr::field("Prices.Currency", FieldOp::Eq, Value::from("USD"))).len(),
            1
        );
        assert!(run(&documents, &Expr::field("Prices.Currency", FieldOp::Eq, Value::from("EUR"))).is_empty());
    }

    #[rstest]
    fn test_double_negation_is_identity(books: Vec<BsonDocument>) {
        let f = Book::filter().eq("category", "Fiction").unwrap();

        assert_eq!(run(&books, &Filter::not(Filter::not(f.clone()))), run(&books, &f));
    }
}

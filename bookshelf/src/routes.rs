//! Predicate routes: fixed filters bound to path parameters.
//!
//! Each route under `/books/<op>/<params>` selects one filter shape; the path parameters are
//! parsed into typed literals before the filter is built, so a malformed literal is rejected
//! as a bad request rather than silently matching nothing.

use rust_decimal::Decimal;
use std::str::FromStr;

use bookshelf_core::{
    book::Book,
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, Filter},
    value::ValueType,
};

/// A parsed predicate route.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateRoute {
    /// `FictionUnder50`: category is Fiction and price is below 50.
    FictionUnder50,
    /// `FictionOrNonFiction`: category is Fiction or Non-fiction.
    FictionOrNonFiction,
    /// `NotFiction`: category is not Fiction.
    NotFiction,
    /// `Exists/{field}`: the field key is present.
    Exists(String),
    /// `BooksOfType/{type}`: the price is stored with the given backend type.
    BooksOfType(ValueType),
    /// `Regex/{pattern}`: the name matches the pattern, ignoring case.
    Regex(String),
    /// `ElemMatch/{min}/{max}`: some listed price has a value within `[min, max]`.
    ElemMatch { min: Decimal, max: Decimal },
    /// `Size/{n}`: the book has exactly `n` comments.
    Size(i64),
    /// `All/{tag1}/{tag2}`: the book is tagged with both tags.
    All(String, String),
    /// `In/{category}`: the category is the given one.
    In(String),
    /// `Nin/{status1}/{status2}`: the status is neither of the given ones.
    Nin(String, String),
    /// `price-eq|ne|gt|gte|lt|lte/{price}`: the price compares with the given amount.
    Price(FieldOp, Decimal),
}

fn bad_route(path: &str) -> DocumentStoreError {
    DocumentStoreError::InvalidArgument(format!("unknown predicate route: {path:?}"))
}

fn parse_decimal(text: &str) -> DocumentStoreResult<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| DocumentStoreError::InvalidArgument(format!("not a decimal: {text:?}")))
}

impl PredicateRoute {
    /// Parses the part of a request path after `/books/`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidArgument`] for an unknown route, a wrong number of
    /// parameters or a parameter that does not parse as its literal type.
    pub fn parse(path: &str) -> DocumentStoreResult<Self> {
        let trimmed = path.trim_matches('/');
        let (op, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        let params: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();

        let route = match (op, params.as_slice()) {
            ("FictionUnder50", []) => PredicateRoute::FictionUnder50,
            ("FictionOrNonFiction", []) => PredicateRoute::FictionOrNonFiction,
            ("NotFiction", []) => PredicateRoute::NotFiction,
            ("Exists", [field]) => PredicateRoute::Exists(field.to_string()),
            ("BooksOfType", [ty]) => PredicateRoute::BooksOfType(ValueType::from_str(ty)?),
            // The pattern may itself contain slashes.
            ("Regex", _) if !rest.is_empty() => PredicateRoute::Regex(rest.to_string()),
            ("ElemMatch", [min, max]) => PredicateRoute::ElemMatch {
                min: parse_decimal(min)?,
                max: parse_decimal(max)?,
            },
            ("Size", [n]) => PredicateRoute::Size(n.parse().map_err(|_| {
                DocumentStoreError::InvalidArgument(format!("not an integer: {n:?}"))
            })?),
            ("All", [first, second]) => PredicateRoute::All(first.to_string(), second.to_string()),
            ("In", [category]) => PredicateRoute::In(category.to_string()),
            ("Nin", [first, second]) => PredicateRoute::Nin(first.to_string(), second.to_string()),
            (op, [price]) if op.starts_with("price-") => {
                let op = match &op["price-".len()..] {
                    "eq" => FieldOp::Eq,
                    "ne" => FieldOp::Ne,
                    "gt" => FieldOp::Gt,
                    "gte" => FieldOp::Gte,
                    "lt" => FieldOp::Lt,
                    "lte" => FieldOp::Lte,
                    _ => return Err(bad_route(path)),
                };

                PredicateRoute::Price(op, parse_decimal(price)?)
            }
            _ => return Err(bad_route(path)),
        };

        Ok(route)
    }

    /// Builds the filter this route stands for.
    pub fn to_filter(&self) -> DocumentStoreResult<Expr> {
        let f = Book::filter();

        match self {
            PredicateRoute::FictionUnder50 => {
                Ok(Filter::and([f.eq("category", "Fiction")?, f.lt("price", 50)?]))
            }
            PredicateRoute::FictionOrNonFiction => Ok(Filter::or([
                f.eq("category", "Fiction")?,
                f.eq("category", "Non-fiction")?,
            ])),
            PredicateRoute::NotFiction => Ok(Filter::not(f.eq("category", "Fiction")?)),
            PredicateRoute::Exists(field) => Ok(f.exists(field)),
            PredicateRoute::BooksOfType(ty) => Ok(f.type_is("price", *ty)),
            PredicateRoute::Regex(pattern) => f.regex("name", pattern.as_str(), true),
            PredicateRoute::ElemMatch { min, max } => f.elem_match("prices", |p| {
                Ok(Filter::and([p.gte("value", *min)?, p.lte("value", *max)?]))
            }),
            PredicateRoute::Size(n) => f.size("comments", *n),
            PredicateRoute::All(first, second) => f.all("tags", [first, second]),
            PredicateRoute::In(category) => f.is_in("category", [category]),
            PredicateRoute::Nin(first, second) => f.not_in("status", [first, second]),
            PredicateRoute::Price(op, price) => match op {
                FieldOp::Eq => f.eq("price", *price),
                FieldOp::Ne => f.ne("price", *price),
                FieldOp::Gt => f.gt("price", *price),
                FieldOp::Gte => f.gte("price", *price),
                FieldOp::Lt => f.lt("price", *price),
                FieldOp::Lte => f.lte("price", *price),
                op => Err(DocumentStoreError::InvalidArgument(format!(
                    "{op:?} is not a price comparison"
                ))),
            },
        }
    }
}

impl FromStr for PredicateRoute {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PredicateRoute::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("FictionUnder50", PredicateRoute::FictionUnder50)]
    #[case("/NotFiction/", PredicateRoute::NotFiction)]
    #[case("Exists/Tags", PredicateRoute::Exists("Tags".into()))]
    #[case("BooksOfType/Decimal128", PredicateRoute::BooksOfType(ValueType::Decimal))]
    #[case("BooksOfType/19", PredicateRoute::BooksOfType(ValueType::Decimal))]
    #[case("Regex/^D/x", PredicateRoute::Regex("^D/x".into()))]
    #[case("ElemMatch/10/20.5", PredicateRoute::ElemMatch { min: Decimal::from(10), max: Decimal::new(205, 1) })]
    #[case("Size/2", PredicateRoute::Size(2))]
    #[case("All/a/b", PredicateRoute::All("a".into(), "b".into()))]
    #[case("Nin/Sold/Lost", PredicateRoute::Nin("Sold".into(), "Lost".into()))]
    #[case("price-gte/45.00", PredicateRoute::Price(FieldOp::Gte, Decimal::new(4500, 2)))]
    fn test_parse(#[case] path: &str, #[case] expected: PredicateRoute) {
        assert_eq!(PredicateRoute::parse(path).unwrap(), expected);
    }

    #[rstest]
    #[case("Unknown")]
    #[case("price-between/4")]
    #[case("price-eq/cheap")]
    #[case("ElemMatch/10")]
    #[case("Size/many")]
    #[case("BooksOfType/colour")]
    #[case("Regex")]
    fn test_parse_rejects(#[case] path: &str) {
        assert!(matches!(
            PredicateRoute::parse(path),
            Err(DocumentStoreError::InvalidArgument(_))
        ));
    }

    #[rstest]
    fn test_negative_size_is_rejected_when_building() {
        let route = PredicateRoute::parse("Size/-1").unwrap();

        assert!(matches!(route.to_filter(), Err(DocumentStoreError::InvalidArgument(_))));
    }
}

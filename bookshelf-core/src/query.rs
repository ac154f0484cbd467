//! Filter construction for document stores.
//!
//! Filters are immutable expression trees ([`Expr`]) built without touching any backend. A
//! [`Filter`] builder is bound to a document [`Schema`]: it resolves logical field names to
//! wire names and checks every literal against the declared type of its field, so a decimal
//! field compared with a string fails here with `TypeMismatch` instead of silently matching
//! nothing at query time.
//!
//! ```ignore
//! use bookshelf_core::{book::Book, document::Document, query::Filter};
//!
//! let f = Book::filter();
//! let cheap_fiction = Filter::and([
//!     f.eq("category", "Fiction")?,
//!     f.lt("price", 50)?,
//! ]);
//! ```
//!
//! Backends consume filters through [`QueryVisitor`], translating each node into their
//! native query form or evaluating it directly.
//!
//! # Operators
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Membership: `is_in`, `not_in`, `all`
//! - Element: `exists`, `type_is`
//! - Pattern: `regex`
//! - Array: `size`, `elem_match`
//! - Logical: `and`, `or`, `not`

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
    schema::{FieldSpec, FieldType, Schema},
    value::{Value, ValueType},
};

/// Field operators that compare a field against a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to.
    Eq,
    /// Not equal to. Also matches documents where the field is absent.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Field value is one of the listed values.
    In,
    /// Field value is none of the listed values. Also matches absent fields.
    Nin,
    /// Array field contains every listed value.
    All,
}

/// A filter expression.
///
/// Field names stored in an expression are wire names, already resolved by [`Filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND (all must match). An empty list matches every document.
    And(Vec<Expr>),
    /// Logical OR (any must match). An empty list matches no document.
    Or(Vec<Expr>),
    /// Logical NOT.
    Not(Box<Expr>),
    /// The field key is present, whatever its value (including null).
    Exists(String),
    /// The field's runtime type is the given backend type.
    TypeIs(String, ValueType),
    /// Field comparison expression.
    Field {
        field: String,
        op: FieldOp,
        value: Value,
    },
    /// The string field matches a regular expression, compiled by the backend.
    Regex {
        field: String,
        pattern: String,
        case_insensitive: bool,
    },
    /// The array field has exactly this many elements.
    Size(String, usize),
    /// At least one element of the array field satisfies the nested expression.
    ElemMatch(String, Box<Expr>),
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: impl Into<String>, op: FieldOp, value: Value) -> Self {
        Expr::Field { field: field.into(), op, value }
    }

    /// The universal filter.
    pub fn everything() -> Self {
        Expr::And(Vec::new())
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Visits this expression and every sub-expression, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);

        match self {
            Expr::And(exprs) | Expr::Or(exprs) => {
                for expr in exprs {
                    expr.walk(f);
                }
            }
            Expr::Not(expr) | Expr::ElemMatch(_, expr) => expr.walk(f),
            _ => {}
        }
    }
}

/// Builds filter expressions against a declared schema.
///
/// Obtain one from [`Document::filter`](crate::document::Document::filter) or
/// [`Filter::new`]. Logical connectives are associated functions since they need no schema.
#[derive(Debug, Clone, Copy)]
pub struct Filter {
    schema: &'static Schema,
}

impl Filter {
    pub fn new(schema: &'static Schema) -> Self {
        Self { schema }
    }

    /// The schema this builder checks against.
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Equality. On a string array field, matches if any element is equal.
    pub fn eq(&self, field: &str, value: impl Into<Value>) -> DocumentStoreResult<Expr> {
        self.compare(field, FieldOp::Eq, value.into())
    }

    /// Inequality. Matches documents where the field is absent.
    pub fn ne(&self, field: &str, value: impl Into<Value>) -> DocumentStoreResult<Expr> {
        self.compare(field, FieldOp::Ne, value.into())
    }

    pub fn gt(&self, field: &str, value: impl Into<Value>) -> DocumentStoreResult<Expr> {
        self.compare(field, FieldOp::Gt, value.into())
    }

    pub fn gte(&self, field: &str, value: impl Into<Value>) -> DocumentStoreResult<Expr> {
        self.compare(field, FieldOp::Gte, value.into())
    }

    pub fn lt(&self, field: &str, value: impl Into<Value>) -> DocumentStoreResult<Expr> {
        self.compare(field, FieldOp::Lt, value.into())
    }

    pub fn lte(&self, field: &str, value: impl Into<Value>) -> DocumentStoreResult<Expr> {
        self.compare(field, FieldOp::Lte, value.into())
    }

    /// Membership: the field value is one of `values`. Duplicates are dropped.
    pub fn is_in<V: Into<Value>>(
        &self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> DocumentStoreResult<Expr> {
        self.set(field, FieldOp::In, values)
    }

    /// Exclusion: the field value is none of `values`. Duplicates are dropped.
    pub fn not_in<V: Into<Value>>(
        &self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> DocumentStoreResult<Expr> {
        self.set(field, FieldOp::Nin, values)
    }

    /// The array field contains every one of `values`, in any order.
    pub fn all<V: Into<Value>>(
        &self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> DocumentStoreResult<Expr> {
        let spec = self.schema.require(field)?;

        if !matches!(spec.ty, FieldType::StringArray) {
            return Err(DocumentStoreError::type_mismatch(spec.name, "string array", spec.ty.name()));
        }

        self.set(field, FieldOp::All, values)
    }

    /// The field key is present, whatever its value. Undeclared fields are matched by
    /// their literal name.
    pub fn exists(&self, field: &str) -> Expr {
        Expr::Exists(self.schema.wire_name(field))
    }

    /// The field's runtime value has the given backend type.
    pub fn type_is(&self, field: &str, ty: ValueType) -> Expr {
        Expr::TypeIs(self.schema.wire_name(field), ty)
    }

    /// The field matches `pattern`.
    ///
    /// The pattern is carried as a value and compiled by the backend. A pattern the backend
    /// rejects surfaces as `InvalidPattern` when the query runs; a pattern containing a NUL
    /// byte can never be stored in a backend regex and is rejected here.
    ///
    /// Backends differ in dialect: MongoDB runs PCRE, while the in-memory backend uses the
    /// `regex` crate, which has no lookaround and no backreferences. A pattern such as
    /// `^(D)\1` runs on MongoDB but fails with `InvalidPattern` in memory.
    pub fn regex(
        &self,
        field: &str,
        pattern: impl Into<String>,
        case_insensitive: bool,
    ) -> DocumentStoreResult<Expr> {
        let spec = self.schema.require(field)?;
        let pattern = pattern.into();

        if !matches!(spec.ty, FieldType::String | FieldType::StringArray) {
            return Err(DocumentStoreError::type_mismatch(spec.name, "string", spec.ty.name()));
        }
        if pattern.contains('\0') {
            return Err(DocumentStoreError::InvalidPattern(
                "pattern contains a NUL byte".to_string(),
            ));
        }

        Ok(Expr::Regex { field: spec.wire.to_string(), pattern, case_insensitive })
    }

    /// The array field has exactly `n` elements. Never matches an absent field.
    pub fn size(&self, field: &str, n: i64) -> DocumentStoreResult<Expr> {
        let spec = self.schema.require(field)?;

        if !spec.ty.is_array() {
            return Err(DocumentStoreError::type_mismatch(spec.name, "array", spec.ty.name()));
        }

        let n = usize::try_from(n).map_err(|_| {
            DocumentStoreError::InvalidArgument(format!("size must not be negative, got {n}"))
        })?;

        Ok(Expr::Size(spec.wire.to_string(), n))
    }

    /// At least one element of the record array satisfies the expression built by `build`.
    ///
    /// `build` receives a builder bound to the element schema, so the nested predicate is
    /// written against the element's own fields.
    pub fn elem_match(
        &self,
        field: &str,
        build: impl FnOnce(Filter) -> DocumentStoreResult<Expr>,
    ) -> DocumentStoreResult<Expr> {
        let spec = self.schema.require(field)?;

        let FieldType::RecordArray(nested) = spec.ty else {
            return Err(DocumentStoreError::type_mismatch(spec.name, "record array", spec.ty.name()));
        };

        Ok(Expr::ElemMatch(spec.wire.to_string(), Box::new(build(Filter::new(nested))?)))
    }

    /// Logical AND of `exprs`. Zero expressions yield the universal filter.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Logical OR of `exprs`.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Logical NOT.
    pub fn not(expr: Expr) -> Expr {
        expr.not()
    }

    fn compare(&self, field: &str, op: FieldOp, value: Value) -> DocumentStoreResult<Expr> {
        let spec = self.schema.require(field)?;

        Ok(Expr::field(spec.wire, op, check_value(spec, value)?))
    }

    fn set<V: Into<Value>>(
        &self,
        field: &str,
        op: FieldOp,
        values: impl IntoIterator<Item = V>,
    ) -> DocumentStoreResult<Expr> {
        let spec = self.schema.require(field)?;
        let mut unique: Vec<Value> = Vec::new();

        for value in values {
            let value = check_value(spec, value.into())?;

            if !unique.contains(&value) {
                unique.push(value);
            }
        }

        Ok(Expr::field(spec.wire, op, Value::Array(unique)))
    }
}

// Checks a literal against a field's declared type. Id fields accept the string form of an
// identifier and normalize it to `Value::Id`.
fn check_value(spec: &FieldSpec, value: Value) -> DocumentStoreResult<Value> {
    let mismatch = |value: &Value| {
        DocumentStoreError::type_mismatch(spec.name, spec.ty.name(), value.kind_name())
    };

    match (spec.ty, value) {
        (_, Value::Null) => Ok(Value::Null),
        (FieldType::Id, Value::Id(id)) => Ok(Value::Id(id)),
        (FieldType::Id, Value::String(s)) => DocumentId::parse(&s)
            .map(Value::Id)
            .map_err(|_| mismatch(&Value::String(s))),
        (FieldType::String, Value::String(s)) => Ok(Value::String(s)),
        (FieldType::Decimal, Value::Number(n)) => Ok(Value::Number(n)),
        (FieldType::StringArray, Value::String(s)) => Ok(Value::String(s)),
        (FieldType::StringArray, Value::Array(items)) => {
            if let Some(bad) = items.iter().find(|v| !matches!(v, Value::String(_))) {
                return Err(mismatch(bad));
            }

            Ok(Value::Array(items))
        }
        (_, value) => Err(mismatch(&value)),
    }
}

/// Visitor over filter expressions, implemented by backends to compile or evaluate filters.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(&mut self, field: &str) -> Result<Self::Output, Self::Error>;
    fn visit_type(&mut self, field: &str, ty: ValueType) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: FieldOp,
        value: &Value,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_regex(
        &mut self,
        field: &str,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_size(&mut self, field: &str, len: usize) -> Result<Self::Output, Self::Error>;
    fn visit_elem_match(&mut self, field: &str, expr: &Expr) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field) => self.visit_exists(field),
            Expr::TypeIs(field, ty) => self.visit_type(field, *ty),
            Expr::Field { field, op, value } => self.visit_field(field, *op, value),
            Expr::Regex { field, pattern, case_insensitive } => {
                self.visit_regex(field, pattern, *case_insensitive)
            }
            Expr::Size(field, len) => self.visit_size(field, *len),
            Expr::ElemMatch(field, expr) => self.visit_elem_match(field, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{book::Book, document::Document};
    use rstest::rstest;
    use rust_decimal::Decimal;

    #[rstest]
    fn test_comparison_resolves_wire_name() {
        let expr = Book::filter().eq("name", "Dune").unwrap();

        assert_eq!(expr, Expr::field("Name", FieldOp::Eq, Value::from("Dune")));
    }

    #[rstest]
    fn test_decimal_field_rejects_string_value() {
        let err = Book::filter().lt("price", "50").unwrap_err();

        assert!(matches!(
            err,
            DocumentStoreError::TypeMismatch { ref field, ref found, .. } if field == "price" && found == "string"
        ));
    }

    #[rstest]
    fn test_string_field_rejects_decimal_value() {
        assert!(matches!(
            Book::filter().eq("category", 5),
            Err(DocumentStoreError::TypeMismatch { .. })
        ));
    }

    #[rstest]
    fn test_id_field_accepts_string_form() {
        let id = DocumentId::new();
        let expr = Book::filter().eq("id", id.to_string()).unwrap();

        assert_eq!(expr, Expr::field("_id", FieldOp::Eq, Value::Id(id)));
        assert!(Book::filter().eq("id", "nope").is_err());
    }

    #[rstest]
    fn test_membership_drops_duplicates() {
        let expr = Book::filter()
            .is_in("status", ["Available", "Sold", "Available"])
            .unwrap();

        assert_eq!(
            expr,
            Expr::field("Status", FieldOp::In, Value::from(vec!["Available", "Sold"]))
        );
    }

    #[rstest]
    fn test_all_requires_string_array() {
        assert!(Book::filter().all("tags", ["a", "a", "b"]).is_ok());
        assert!(matches!(
            Book::filter().all("category", ["a"]),
            Err(DocumentStoreError::TypeMismatch { .. })
        ));
    }

    #[rstest]
    fn test_negative_size_is_invalid() {
        assert!(matches!(
            Book::filter().size("tags", -1),
            Err(DocumentStoreError::InvalidArgument(_))
        ));
        assert_eq!(Book::filter().size("comments", 2).unwrap(), Expr::Size("Comments".into(), 2));
    }

    #[rstest]
    fn test_regex_with_nul_byte_is_invalid_pattern() {
        assert!(matches!(
            Book::filter().regex("name", "a\0b", false),
            Err(DocumentStoreError::InvalidPattern(_))
        ));
    }

    #[rstest]
    fn test_regex_requires_string_field() {
        assert!(matches!(
            Book::filter().regex("price", "^4", false),
            Err(DocumentStoreError::TypeMismatch { .. })
        ));
    }

    #[rstest]
    fn test_elem_match_builds_against_nested_schema() {
        let min = Decimal::from(10);
        let max = Decimal::from(20);
        let expr = Book::filter()
            .elem_match("prices", |p| Ok(Filter::and([p.gte("value", min)?, p.lte("value", max)?])))
            .unwrap();

        assert_eq!(
            expr,
            Expr::ElemMatch(
                "Prices".into(),
                Box::new(Expr::And(vec![
                    Expr::field("Value", FieldOp::Gte, Value::Number(min)),
                    Expr::field("Value", FieldOp::Lte, Value::Number(max)),
                ]))
            )
        );
    }

    #[rstest]
    fn test_elem_match_rejects_outer_fields() {
        let result = Book::filter().elem_match("prices", |p| p.eq("category", "Fiction"));

        assert!(matches!(result, Err(DocumentStoreError::InvalidArgument(_))));
    }

    #[rstest]
    fn test_unknown_field_is_invalid_but_exists_passes_through() {
        assert!(matches!(
            Book::filter().eq("publisher", "x"),
            Err(DocumentStoreError::InvalidArgument(_))
        ));
        assert_eq!(Book::filter().exists("publisher"), Expr::Exists("publisher".into()));
        assert_eq!(Book::filter().exists("tags"), Expr::Exists("Tags".into()));
    }

    #[rstest]
    fn test_chained_and_flattens() {
        let f = Book::filter();
        let expr = f
            .eq("category", "Fiction")
            .unwrap()
            .and(f.eq("status", "Available").unwrap())
            .and(f.exists("tags"));

        assert!(matches!(expr, Expr::And(ref list) if list.len() == 3));
        assert_eq!(Filter::and([]), Expr::everything());
    }
}

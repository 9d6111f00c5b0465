//! Store query documents and the lowering of predicates into them.
use super::{document::value_document, matcher};
use crate::{
    error::{FRes, FilterError},
    predicate::{CompareOp, Expr, FieldPath, Predicate, TextOp},
};
use serde_json::{json, Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

/// Filter in the native query form of the [`DocumentStore`](crate::DocumentStore).
///
/// ```text
/// {"$const": bool}
/// {"$and": [q, q]}  {"$or": [q, q]}  {"$not": q}
/// {"<dotted.path>": cond}            "$this" is the current collection element
/// cond := {"$eq"|"$ne"|"$gt"|"$gte"|"$lt"|"$lte": v} | {"$in": [v...]} | {"$null": bool}
///       | {"$icontains"|"$istartswith"|"$iendswith": "lower-cased text"}
///       | {"$any": q} | {"$all": q}
/// ```
///
/// # Example
/// ```
/// use dynfilter::StoreQuery;
/// use serde_json::json;
/// let query: StoreQuery = r#"{"$and": [{"year": {"$gte": 1970}}, {"genres": {"$any": {"$this": {"$eq": "Rock"}}}}]}"#
///     .parse()
///     .unwrap();
/// assert!(query.matches(&json!({"year": 1973, "genres": ["Prog", "Rock"]})).unwrap());
/// assert!(!query.matches(&json!({"year": 1973, "genres": []})).unwrap());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct StoreQuery {
    query: JsonValue,
}

impl StoreQuery {
    /// Wrap and validate a query document.
    pub fn from_json(query: JsonValue) -> FRes<StoreQuery> {
        matcher::validate(&query)?;
        Ok(StoreQuery { query })
    }

    /// Lower a compiled expression, failing on values the document form cannot hold.
    pub fn lower(expr: &Expr) -> FRes<StoreQuery> {
        Ok(StoreQuery { query: lower(expr)? })
    }

    pub fn from_predicate<T>(predicate: &Predicate<T>) -> FRes<StoreQuery> {
        StoreQuery::lower(predicate.expr())
    }

    pub fn as_json(&self) -> &JsonValue {
        &self.query
    }

    pub fn into_json(self) -> JsonValue {
        self.query
    }

    /// Evaluate the query against a document.
    pub fn matches(&self, document: &JsonValue) -> FRes<bool> {
        matcher::matches(&self.query, document)
    }
}

impl fmt::Display for StoreQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query)
    }
}

impl FromStr for StoreQuery {
    type Err = FilterError;
    fn from_str(s: &str) -> FRes<StoreQuery> {
        StoreQuery::from_json(serde_json::from_str(s)?)
    }
}

fn lower(expr: &Expr) -> FRes<JsonValue> {
    Ok(match expr {
        Expr::Const(value) => json!({ "$const": value }),
        Expr::And(l, r) => json!({ "$and": [lower(l)?, lower(r)?] }),
        Expr::Or(l, r) => json!({ "$or": [lower(l)?, lower(r)?] }),
        Expr::Not(e) => json!({ "$not": lower(e)? }),
        Expr::Compare { path, op, value } => {
            let operator = match op {
                CompareOp::Eq => "$eq",
                CompareOp::Neq => "$ne",
                CompareOp::Gt => "$gt",
                CompareOp::Gte => "$gte",
                CompareOp::Lt => "$lt",
                CompareOp::Lte => "$lte",
            };
            let value = value_document(value).map_err(FilterError::Untranslatable)?;
            condition(path, operator, value)
        }
        Expr::IsNull(path) => condition(path, "$null", JsonValue::Bool(true)),
        Expr::Text { path, op, pattern } => {
            let operator = match op {
                TextOp::Contains => "$icontains",
                TextOp::StartsWith => "$istartswith",
                TextOp::EndsWith => "$iendswith",
            };
            condition(path, operator, JsonValue::String(pattern.clone()))
        }
        Expr::In { path, values } => {
            let values = values
                .iter()
                .map(|v| value_document(v).map_err(FilterError::Untranslatable))
                .collect::<FRes<Vec<_>>>()?;
            condition(path, "$in", JsonValue::Array(values))
        }
        Expr::Any { path, predicate } => condition(path, "$any", lower(predicate)?),
        Expr::All { path, predicate } => condition(path, "$all", lower(predicate)?),
    })
}

fn condition(path: &FieldPath, operator: &str, operand: JsonValue) -> JsonValue {
    let mut cond = Map::new();
    cond.insert(operator.to_string(), operand);
    let mut query = Map::new();
    query.insert(path.to_string(), JsonValue::Object(cond));
    JsonValue::Object(query)
}

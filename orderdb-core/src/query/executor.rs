//! Query executor
//!
//! Runs a [`Query`] over a slice of documents: collection scan with filter
//! matching, stable sort, skip, limit, then projection.

use super::ast::{Filter, Projection, Query, Sort, SortOrder};
use crate::document::{Document, Value, ID_FIELD};
use std::cmp::Ordering as CmpOrdering;

/// Query executor
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a query, returning owned copies of the surviving documents in
    /// their original relative order unless a sort is given.
    pub fn execute(&self, documents: &[Document], query: &Query) -> Result<Vec<Document>, QueryError> {
        if let Some(projection) = &query.projection {
            if !projection.is_valid() {
                return Err(QueryError::InvalidProjection(format!("{:?}", projection.fields)));
            }
        }

        let mut results: Vec<Document> = documents
            .iter()
            .filter(|doc| self.matches_filter(doc, &query.filter))
            .cloned()
            .collect();

        if let Some(sort) = &query.sort {
            self.sort_documents(&mut results, sort);
        }

        if let Some(skip) = query.skip {
            let skip = usize::try_from(skip).unwrap_or(usize::MAX).min(results.len());
            results.drain(..skip);
        }

        if let Some(limit) = query.limit {
            results.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        if let Some(projection) = &query.projection {
            results = results.iter().map(|doc| self.project(doc, projection)).collect();
        }

        Ok(results)
    }

    /// Check if a document matches a filter
    pub fn matches_filter(&self, doc: &Document, filter: &Filter) -> bool {
        match filter {
            Filter::Empty => true,

            Filter::Eq { field, value } => field_equals(doc.lookup(field).as_deref(), value),

            Filter::Ne { field, value } => !field_equals(doc.lookup(field).as_deref(), value),

            Filter::Gt { field, value } => {
                field_compares(doc.lookup(field).as_deref(), value, |o| o == CmpOrdering::Greater)
            }

            Filter::Gte { field, value } => {
                field_compares(doc.lookup(field).as_deref(), value, |o| o != CmpOrdering::Less)
            }

            Filter::Lt { field, value } => {
                field_compares(doc.lookup(field).as_deref(), value, |o| o == CmpOrdering::Less)
            }

            Filter::Lte { field, value } => {
                field_compares(doc.lookup(field).as_deref(), value, |o| o != CmpOrdering::Greater)
            }

            Filter::In { field, values } => {
                let doc_value = doc.lookup(field);
                values.iter().any(|v| field_equals(doc_value.as_deref(), v))
            }

            Filter::Nin { field, values } => {
                let doc_value = doc.lookup(field);
                !values.iter().any(|v| field_equals(doc_value.as_deref(), v))
            }

            Filter::Exists { field, exists } => doc.lookup(field).is_some() == *exists,

            Filter::And(filters) => filters.iter().all(|f| self.matches_filter(doc, f)),

            Filter::Or(filters) => filters.iter().any(|f| self.matches_filter(doc, f)),

            Filter::Not(filter) => !self.matches_filter(doc, filter),
        }
    }

    /// Stable multi-key sort; missing fields sort before present ones
    pub fn sort_documents(&self, documents: &mut [Document], sort: &Sort) {
        documents.sort_by(|a, b| {
            for (field, order) in &sort.fields {
                let cmp = match (a.lookup(field).as_deref(), b.lookup(field).as_deref()) {
                    (Some(av), Some(bv)) => compare_values(av, bv),
                    (Some(_), None) => CmpOrdering::Greater,
                    (None, Some(_)) => CmpOrdering::Less,
                    (None, None) => CmpOrdering::Equal,
                };

                let cmp = match order {
                    SortOrder::Ascending => cmp,
                    SortOrder::Descending => cmp.reverse(),
                };

                if cmp != CmpOrdering::Equal {
                    return cmp;
                }
            }
            CmpOrdering::Equal
        });
    }

    /// Apply a projection to a single document
    pub fn project(&self, doc: &Document, projection: &Projection) -> Document {
        let mut projected = Document::new();
        if projection.should_include(ID_FIELD) {
            projected.id = doc.id;
        }

        for (field, value) in &doc.fields {
            if projection.should_include(field) {
                projected.fields.insert(field.clone(), value.clone());
            }
        }

        projected
    }
}

/// Equality as used by `$eq`/`$in`: a missing field equals `null`, and an
/// array field matches when any element is equal.
fn field_equals(doc_value: Option<&Value>, value: &Value) -> bool {
    match doc_value {
        None => value.is_null(),
        Some(v) if values_equal(v, value) => true,
        Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, value)),
        Some(_) => false,
    }
}

/// Range comparison; values of different type classes never match
fn field_compares(doc_value: Option<&Value>, value: &Value, pred: impl Fn(CmpOrdering) -> bool) -> bool {
    match doc_value {
        Some(v) if type_rank(v) == type_rank(value) => pred(compare_values(v, value)),
        _ => false,
    }
}

/// Value equality with numeric values compared across representations
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().zip(y).all(|((lk, lv), (rk, rv))| lk == rk && values_equal(lv, rv))
        }
        _ if a.is_number() && b.is_number() => compare_values(a, b) == CmpOrdering::Equal,
        _ => a == b,
    }
}

/// Canonical type ordering: null < numbers < strings < objects < arrays < booleans
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Int32(_) | Value::Int64(_) | Value::Float64(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total ordering over values, used by sorting and range filters
pub fn compare_values(a: &Value, b: &Value) -> CmpOrdering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }

    match (a, b) {
        (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
        (Value::Int64(x), Value::Int64(y)) => x.cmp(y),
        (Value::Int32(x), Value::Int64(y)) => (*x as i64).cmp(y),
        (Value::Int64(x), Value::Int32(y)) => x.cmp(&(*y as i64)),
        _ if a.is_number() => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let cmp = compare_values(l, r);
                if cmp != CmpOrdering::Equal {
                    return cmp;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y) {
                let cmp = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if cmp != CmpOrdering::Equal {
                    return cmp;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => CmpOrdering::Equal,
    }
}

/// Query execution errors
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Cannot mix inclusion and exclusion in projection: {0}")]
    InvalidProjection(String),
}

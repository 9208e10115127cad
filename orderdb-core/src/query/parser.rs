//! Query parser for MongoDB-style JSON
//!
//! Accepts the shell forms used against order collections, e.g.
//! `{ "status": "A" }`, `{ "price": { "$gte": 300 } }`,
//! `{ "cust_name": 1, "price": 1, "_id": 0 }` and `{ "totalPrice": 1 }`.

use super::ast::{Filter, Projection, ProjectionType, Query, Sort, SortOrder};
use crate::document::Value;
use serde_json::Value as JsonValue;

/// Query parser for JSON queries
pub struct QueryParser;

impl QueryParser {
    /// Parse `{ "filter": .., "projection": .., "sort": .., "skip": n, "limit": n }`
    pub fn parse(json: &str) -> Result<Query, QueryParseError> {
        let value: JsonValue = serde_json::from_str(json)
            .map_err(|e| QueryParseError::InvalidJson(e.to_string()))?;
        Self::parse_from_value(&value)
    }

    pub fn parse_from_value(value: &JsonValue) -> Result<Query, QueryParseError> {
        let obj = value
            .as_object()
            .ok_or_else(|| QueryParseError::InvalidFormat("Query must be an object".to_string()))?;

        let mut query = Query::new();

        if let Some(filter) = obj.get("filter") {
            query.filter = Self::parse_filter(filter)?;
        }
        if let Some(projection) = obj.get("projection") {
            query.projection = Some(Self::parse_projection(projection)?);
        }
        if let Some(sort) = obj.get("sort") {
            query.sort = Some(Self::parse_sort(sort)?);
        }
        if let Some(skip) = obj.get("skip") {
            query.skip = Some(
                skip.as_u64()
                    .ok_or_else(|| QueryParseError::InvalidFormat("skip must be a non-negative integer".to_string()))?,
            );
        }
        if let Some(limit) = obj.get("limit") {
            query.limit = Some(
                limit
                    .as_u64()
                    .ok_or_else(|| QueryParseError::InvalidFormat("limit must be a non-negative integer".to_string()))?,
            );
        }

        Ok(query)
    }

    /// Parse a filter document. Multiple top-level keys are ANDed.
    pub fn parse_filter(value: &JsonValue) -> Result<Filter, QueryParseError> {
        let obj = value
            .as_object()
            .ok_or_else(|| QueryParseError::InvalidFormat("Filter must be an object".to_string()))?;

        let mut filters = Vec::with_capacity(obj.len());
        for (key, val) in obj {
            let filter = match key.as_str() {
                "$and" => Filter::And(Self::parse_filter_list(key, val)?),
                "$or" => Filter::Or(Self::parse_filter_list(key, val)?),
                "$not" => Filter::not(Self::parse_filter(val)?),
                op if op.starts_with('$') => {
                    return Err(QueryParseError::UnsupportedOperator(op.to_string()))
                }
                field => Self::parse_field_condition(field, val)?,
            };
            filters.push(filter);
        }

        Ok(match filters.len() {
            0 => Filter::Empty,
            1 => filters.remove(0),
            _ => Filter::And(filters),
        })
    }

    fn parse_filter_list(op: &str, value: &JsonValue) -> Result<Vec<Filter>, QueryParseError> {
        value
            .as_array()
            .ok_or_else(|| QueryParseError::InvalidFormat(format!("{} must be an array", op)))?
            .iter()
            .map(Self::parse_filter)
            .collect()
    }

    /// `field: value` is equality; `field: { $op: value, .. }` is one
    /// condition per operator, ANDed.
    fn parse_field_condition(field: &str, value: &JsonValue) -> Result<Filter, QueryParseError> {
        let ops = match value {
            JsonValue::Object(obj) if obj.keys().next().is_some_and(|k| k.starts_with('$')) => obj,
            _ => return Ok(Filter::eq(field, Value::from(value.clone()))),
        };

        let mut filters = Vec::with_capacity(ops.len());
        for (op, val) in ops {
            let filter = match op.as_str() {
                "$eq" => Filter::eq(field, Value::from(val.clone())),
                "$ne" => Filter::ne(field, Value::from(val.clone())),
                "$gt" => Filter::gt(field, Value::from(val.clone())),
                "$gte" => Filter::gte(field, Value::from(val.clone())),
                "$lt" => Filter::lt(field, Value::from(val.clone())),
                "$lte" => Filter::lte(field, Value::from(val.clone())),
                "$in" => Filter::in_values(field, Self::parse_value_list(op, val)?),
                "$nin" => Filter::nin(field, Self::parse_value_list(op, val)?),
                "$exists" => Filter::exists(
                    field,
                    val.as_bool()
                        .ok_or_else(|| QueryParseError::InvalidFormat("$exists must be a boolean".to_string()))?,
                ),
                "$not" => Filter::not(Self::parse_field_condition(field, val)?),
                other => return Err(QueryParseError::UnsupportedOperator(other.to_string())),
            };
            filters.push(filter);
        }

        Ok(if filters.len() == 1 {
            filters.remove(0)
        } else {
            Filter::And(filters)
        })
    }

    fn parse_value_list(op: &str, value: &JsonValue) -> Result<Vec<Value>, QueryParseError> {
        let arr = value
            .as_array()
            .ok_or_else(|| QueryParseError::InvalidFormat(format!("{} must be an array", op)))?;
        Ok(arr.iter().cloned().map(Value::from).collect())
    }

    /// Parse `{ field: 1 | 0 | true | false }`
    pub fn parse_projection(value: &JsonValue) -> Result<Projection, QueryParseError> {
        let obj = value
            .as_object()
            .ok_or_else(|| QueryParseError::InvalidFormat("Projection must be an object".to_string()))?;

        let mut projection = Projection::new();
        for (field, flag) in obj {
            let kind = match flag {
                JsonValue::Bool(true) => ProjectionType::Include,
                JsonValue::Bool(false) => ProjectionType::Exclude,
                JsonValue::Number(n) if n.as_f64() == Some(0.0) => ProjectionType::Exclude,
                JsonValue::Number(_) => ProjectionType::Include,
                _ => {
                    return Err(QueryParseError::InvalidFormat(format!(
                        "Projection value for '{}' must be 0/1 or a boolean",
                        field
                    )))
                }
            };
            projection.fields.insert(field.clone(), kind);
        }

        if !projection.is_valid() {
            return Err(QueryParseError::InvalidFormat(
                "Cannot mix inclusion and exclusion in projection".to_string(),
            ));
        }

        Ok(projection)
    }

    /// Parse `{ field: 1 | -1, .. }` keeping key order
    pub fn parse_sort(value: &JsonValue) -> Result<Sort, QueryParseError> {
        let obj = value
            .as_object()
            .ok_or_else(|| QueryParseError::InvalidFormat("Sort must be an object".to_string()))?;

        let mut sort = Sort::new();
        for (field, dir) in obj {
            let order = match dir.as_i64() {
                Some(1) => SortOrder::Ascending,
                Some(-1) => SortOrder::Descending,
                _ => {
                    return Err(QueryParseError::InvalidFormat(format!(
                        "Sort direction for '{}' must be 1 or -1",
                        field
                    )))
                }
            };
            sort = sort.add(field.clone(), order);
        }

        Ok(sort)
    }
}

/// Query parsing errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueryParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
}

//! Query Abstract Syntax Tree (AST) definitions
//!
//! Filters, projections and sort specifications for `find`, `distinct`,
//! `delete_many` and the `$match`/`$project`/`$sort` aggregation stages.

use crate::document::{Value, ID_FIELD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query structure with filter, projection, sort, skip, limit
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub projection: Option<Projection>,
    pub sort: Option<Sort>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl Query {
    /// Create a query matching every document
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Filter conditions for queries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "args")]
pub enum Filter {
    /// Matches every document
    #[default]
    Empty,

    Eq { field: String, value: Value },

    Ne { field: String, value: Value },

    Gt { field: String, value: Value },

    Gte { field: String, value: Value },

    Lt { field: String, value: Value },

    Lte { field: String, value: Value },

    In { field: String, values: Vec<Value> },

    Nin { field: String, values: Vec<Value> },

    Exists { field: String, exists: bool },

    /// All conditions must match
    And(Vec<Filter>),

    /// At least one condition must match
    Or(Vec<Filter>),

    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            field: field.into(),
            values,
        }
    }

    pub fn nin(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::Nin {
            field: field.into(),
            values,
        }
    }

    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Self::Exists {
            field: field.into(),
            exists,
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    /// Check if this filter is empty (matches all)
    pub fn is_empty(&self) -> bool {
        matches!(self, Filter::Empty)
    }

    /// All field paths referenced by this filter, sorted and deduplicated
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields.sort();
        fields.dedup();
        fields
    }

    fn collect_fields(&self, fields: &mut Vec<String>) {
        match self {
            Filter::Empty => {}
            Filter::Eq { field, .. }
            | Filter::Ne { field, .. }
            | Filter::Gt { field, .. }
            | Filter::Gte { field, .. }
            | Filter::Lt { field, .. }
            | Filter::Lte { field, .. }
            | Filter::In { field, .. }
            | Filter::Nin { field, .. }
            | Filter::Exists { field, .. } => fields.push(field.clone()),
            Filter::And(filters) | Filter::Or(filters) => {
                for f in filters {
                    f.collect_fields(fields);
                }
            }
            Filter::Not(filter) => filter.collect_fields(fields),
        }
    }
}

/// Projection specification (fields to include/exclude)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Projection {
    pub fields: BTreeMap<String, ProjectionType>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), ProjectionType::Include);
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), ProjectionType::Exclude);
        self
    }

    /// Inclusion mode: at least one field is explicitly included
    pub fn is_inclusion(&self) -> bool {
        self.fields.values().any(|t| *t == ProjectionType::Include)
    }

    /// Mixing inclusion and exclusion is only allowed for `_id`
    pub fn is_valid(&self) -> bool {
        let mut includes = false;
        let mut excludes = false;
        for (field, kind) in &self.fields {
            if field == ID_FIELD {
                continue;
            }
            match kind {
                ProjectionType::Include => includes = true,
                ProjectionType::Exclude => excludes = true,
            }
        }
        !(includes && excludes)
    }

    /// Whether a top-level field survives this projection. `_id` is kept
    /// unless it is explicitly excluded.
    pub fn should_include(&self, field: &str) -> bool {
        let spec = self.fields.get(field);
        if field == ID_FIELD {
            return spec != Some(&ProjectionType::Exclude);
        }
        if self.is_inclusion() {
            spec == Some(&ProjectionType::Include)
        } else {
            spec != Some(&ProjectionType::Exclude)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProjectionType {
    Include,
    Exclude,
}

/// Sort specification; earlier fields take precedence
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Sort {
    pub fields: Vec<(String, SortOrder)>,
}

impl Sort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.fields.push((field.into(), order));
        self
    }

    pub fn asc(self, field: impl Into<String>) -> Self {
        self.add(field, SortOrder::Ascending)
    }

    pub fn desc(self, field: impl Into<String>) -> Self {
        self.add(field, SortOrder::Descending)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Sort order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (1)
    Ascending,
    /// Descending order (-1)
    Descending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::with_filter(Filter::eq("status", "A"))
            .projection(Projection::new().include("cust_name").include("price"))
            .sort(Sort::new().asc("price"))
            .skip(1)
            .limit(2);

        assert!(!query.filter.is_empty());
        assert!(query.projection.is_some());
        assert_eq!(query.skip, Some(1));
        assert_eq!(query.limit, Some(2));
        assert!(Query::new().filter.is_empty());
    }

    #[test]
    fn test_filter_fields() {
        let filter = Filter::and(vec![
            Filter::eq("status", "A"),
            Filter::not(Filter::gt("price", 100i32)),
            Filter::or(vec![Filter::exists("cust_name", true), Filter::eq("status", "B")]),
        ]);
        assert_eq!(filter.fields(), vec!["cust_name", "price", "status"]);
    }

    #[test]
    fn test_projection_include_keeps_id_by_default() {
        let proj = Projection::new().include("cust_name").include("price");
        assert!(proj.is_inclusion());
        assert!(proj.should_include("cust_name"));
        assert!(proj.should_include("_id"));
        assert!(!proj.should_include("status"));
    }

    #[test]
    fn test_projection_include_with_id_excluded() {
        let proj = Projection::new()
            .include("cust_name")
            .include("price")
            .exclude("_id");
        assert!(proj.is_valid());
        assert!(proj.is_inclusion());
        assert!(!proj.should_include("_id"));
        assert!(proj.should_include("price"));
        assert!(!proj.should_include("cust_id"));
    }

    #[test]
    fn test_projection_exclude() {
        let proj = Projection::new().exclude("status");
        assert!(!proj.is_inclusion());
        assert!(proj.should_include("cust_name"));
        assert!(proj.should_include("_id"));
        assert!(!proj.should_include("status"));
    }

    #[test]
    fn test_projection_mixed_is_invalid() {
        let proj = Projection::new().include("cust_name").exclude("status");
        assert!(!proj.is_valid());
    }

    #[test]
    fn test_sort_creation() {
        let sort = Sort::new().asc("totalPrice").desc("_id");
        assert_eq!(sort.fields.len(), 2);
        assert_eq!(sort.fields[0], ("totalPrice".to_string(), SortOrder::Ascending));
        assert_eq!(sort.fields[1], ("_id".to_string(), SortOrder::Descending));
        assert!(Sort::new().is_empty());
    }
}

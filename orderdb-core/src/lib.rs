//! OrderDB Core - In-memory document store
//!
//! This crate provides the document store the order runner queries:
//! - Documents and values with JSON conversion
//! - Filter/projection/sort queries with a MongoDB-style parser
//! - Aggregation pipelines ($match, $group, $sort, $project, ...)
//! - Named collections inside a database

pub mod aggregation;
pub mod document;
pub mod query;
pub mod storage;

pub use aggregation::{Accumulator, AggregationError, AggregationExecutor, GroupStage, Operand, Pipeline, PipelineStage};
pub use document::*;
pub use query::{
    compare_values, values_equal, Filter, Projection, ProjectionType, Query, QueryError, QueryExecutor,
    QueryParseError, QueryParser, Sort, SortOrder,
};
pub use storage::*;

//! Query engine
//!
//! MongoDB-compatible filter/projection/sort parsing and execution over
//! in-memory documents.

pub mod ast;
pub mod executor;
pub mod parser;

pub use ast::{Filter, Projection, ProjectionType, Query, Sort, SortOrder};
pub use executor::{compare_values, values_equal, QueryError, QueryExecutor};
pub use parser::{QueryParseError, QueryParser};

//! In-memory collection storage

pub mod collection;
pub mod database;

pub use collection::{Collection, CollectionMetadata, DeleteResult, InsertManyResult};
pub use database::Database;

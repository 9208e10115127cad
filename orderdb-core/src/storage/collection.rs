//! Collection management
//!
//! A [`Collection`] keeps its documents in insertion order behind a
//! `parking_lot::RwLock`, so a shared `Arc<Collection>` handle can serve
//! reads and writes from any thread.

use crate::aggregation::{AggregationExecutor, Pipeline};
use crate::document::{Document, DocumentId, Value};
use crate::query::{values_equal, Filter, Query, QueryExecutor};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of a bulk insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertManyResult {
    pub acknowledged: bool,
    pub inserted_count: usize,
    pub inserted_ids: Vec<DocumentId>,
}

/// Outcome of a bulk delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Collection of documents
pub struct Collection {
    name: String,
    documents: RwLock<Vec<Document>>,
    created_at: DateTime<Utc>,
    updated_at: RwLock<DateTime<Utc>>,
    query: QueryExecutor,
    aggregation: AggregationExecutor,
}

impl Collection {
    /// Create a new, empty collection
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            documents: RwLock::new(Vec::new()),
            created_at: now,
            updated_at: RwLock::new(now),
            query: QueryExecutor::new(),
            aggregation: AggregationExecutor::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document_count(&self) -> usize {
        self.documents.read().len()
    }

    /// Insert a single document, assigning an `_id` if it has none
    pub fn insert_one(&self, doc: Document) -> Result<DocumentId> {
        let result = self.insert_many(vec![doc])?;
        result
            .inserted_ids
            .first()
            .copied()
            .context("Insert acknowledged without an id")
    }

    /// Insert documents in order. Every document is validated before any is
    /// stored, so a failed call leaves the collection unchanged.
    pub fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult> {
        for (position, doc) in docs.iter().enumerate() {
            doc.validate()
                .with_context(|| format!("Document {} rejected by collection '{}'", position, self.name))?;
        }

        let mut inserted_ids = Vec::with_capacity(docs.len());
        let mut documents = self.documents.write();
        for mut doc in docs {
            let id = *doc.id.get_or_insert_with(DocumentId::new);
            inserted_ids.push(id);
            documents.push(doc);
        }
        let total = documents.len();
        drop(documents);
        self.touch();

        debug!(collection = %self.name, inserted = inserted_ids.len(), total, "insert_many");

        Ok(InsertManyResult {
            acknowledged: true,
            inserted_count: inserted_ids.len(),
            inserted_ids,
        })
    }

    /// Get a document by ID
    pub fn get(&self, id: DocumentId) -> Option<Document> {
        self.documents.read().iter().find(|d| d.id == Some(id)).cloned()
    }

    /// Run a query; results keep insertion order unless the query sorts
    pub fn find(&self, query: &Query) -> Result<Vec<Document>> {
        let documents = self.documents.read();
        let results = self
            .query
            .execute(&documents, query)
            .with_context(|| format!("Query failed on collection '{}'", self.name))?;
        debug!(collection = %self.name, scanned = documents.len(), returned = results.len(), "find");
        Ok(results)
    }

    /// Snapshot of every document in insertion order
    pub fn scan(&self) -> Vec<Document> {
        self.documents.read().clone()
    }

    pub fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>> {
        let documents = self.documents.read();
        let results = self
            .aggregation
            .execute(&documents, pipeline)
            .with_context(|| format!("Aggregation failed on collection '{}'", self.name))?;
        debug!(
            collection = %self.name,
            stages = pipeline.stages.len(),
            returned = results.len(),
            "aggregate"
        );
        Ok(results)
    }

    /// Distinct values of a field among matching documents, in first-seen
    /// order. Array fields contribute their elements; missing fields are skipped.
    pub fn distinct(&self, field: &str, filter: &Filter) -> Result<Vec<Value>> {
        let documents = self.documents.read();
        let mut values: Vec<Value> = Vec::new();

        for doc in documents.iter().filter(|d| self.query.matches_filter(d, filter)) {
            let Some(found) = doc.lookup(field) else {
                continue;
            };
            let candidates: Vec<&Value> = match &*found {
                Value::Array(items) => items.iter().collect(),
                value => vec![value],
            };
            for candidate in candidates {
                if !values.iter().any(|v| values_equal(v, candidate)) {
                    values.push(candidate.clone());
                }
            }
        }

        debug!(collection = %self.name, field, distinct = values.len(), "distinct");
        Ok(values)
    }

    pub fn count(&self, filter: &Filter) -> usize {
        self.documents
            .read()
            .iter()
            .filter(|d| self.query.matches_filter(d, filter))
            .count()
    }

    /// Remove every matching document. Deleting nothing is not an error.
    pub fn delete_many(&self, filter: &Filter) -> Result<DeleteResult> {
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|d| !self.query.matches_filter(d, filter));
        let deleted = (before - documents.len()) as u64;
        drop(documents);

        if deleted > 0 {
            self.touch();
        }
        debug!(collection = %self.name, deleted, "delete_many");

        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: deleted,
        })
    }

    /// Remove all documents, returning how many were removed
    pub fn clear(&self) -> usize {
        let removed = std::mem::take(&mut *self.documents.write()).len();
        self.touch();
        debug!(collection = %self.name, removed, "clear");
        removed
    }

    pub fn metadata(&self) -> CollectionMetadata {
        let documents = self.documents.read();
        CollectionMetadata {
            name: self.name.clone(),
            document_count: documents.len(),
            total_size_bytes: documents.iter().map(Document::size_bytes).sum(),
            created_at: self.created_at,
            updated_at: *self.updated_at.read(),
        }
    }

    fn touch(&self) {
        *self.updated_at.write() = Utc::now();
    }
}

/// Collection metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub name: String,
    pub document_count: usize,
    pub total_size_bytes: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

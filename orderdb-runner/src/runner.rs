//! Order query runner
//!
//! Typed operations over one orders collection. The runner owns no data: it
//! is handed a collection handle and every call goes straight to the store.

use crate::config::RunnerConfig;
use crate::logging::SlowQueryLogger;
use crate::order::{expect_string, CustomerTotal, OrderLine, OrderRecord, CUST_NAME, PRICE, STATUS, TOTAL_PRICE};
use crate::seed;
use anyhow::Result;
use orderdb_core::{
    Collection, Database, DeleteResult, Filter, GroupStage, Operand, Pipeline, PipelineStage, Projection, Query,
    Sort, ID_FIELD,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct OrderQueryRunner {
    collection: Arc<Collection>,
    slow_queries: Arc<SlowQueryLogger>,
}

impl OrderQueryRunner {
    pub fn new(collection: Arc<Collection>) -> Self {
        Self::with_slow_query_logger(collection, Arc::new(SlowQueryLogger::default()))
    }

    pub fn with_slow_query_logger(collection: Arc<Collection>, slow_queries: Arc<SlowQueryLogger>) -> Self {
        Self {
            collection,
            slow_queries,
        }
    }

    /// Runner over the named collection, created if absent
    pub fn open(db: &Database, collection: &str) -> Self {
        Self::new(db.collection(collection))
    }

    /// Build a runner from configuration: open the collection, then apply the
    /// seed settings. The collection is reset first if asked, then receives the
    /// seed file's orders, or the sample orders when no file is set.
    pub fn from_config(db: &Database, config: &RunnerConfig) -> Result<Self> {
        let slow_queries = Arc::new(SlowQueryLogger::new(Duration::from_millis(
            config.logging.slow_query_threshold_ms,
        )));
        let runner = Self::with_slow_query_logger(db.collection(&config.store.collection), slow_queries);

        if config.seed.reset_on_start {
            runner.reset();
        }
        let orders = match &config.seed.file {
            Some(path) => seed::load_orders(path)?,
            None => seed::sample_orders(),
        };
        runner.insert(&orders)?;

        Ok(runner)
    }

    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    pub fn slow_queries(&self) -> &SlowQueryLogger {
        &self.slow_queries
    }

    /// Remove every order, returning how many were removed
    pub fn reset(&self) -> usize {
        let removed = self.collection.clear();
        info!(collection = %self.collection.name(), removed, "Reset orders");
        removed
    }

    /// Replace the collection contents with `records`
    pub fn seed(&self, records: &[OrderRecord]) -> Result<usize> {
        self.reset();
        self.insert(records)
    }

    /// Append records in order, returning how many were inserted
    pub fn insert(&self, records: &[OrderRecord]) -> Result<usize> {
        let result = self.timed("insertMany", || {
            self.collection
                .insert_many(records.iter().map(OrderRecord::to_document).collect())
        })?;

        info!(
            collection = %self.collection.name(),
            acknowledged = result.acknowledged,
            inserted = result.inserted_count,
            "Inserted orders"
        );
        Ok(result.inserted_count)
    }

    /// Total price per customer, ascending by total, then by name
    pub fn aggregate_total_by_customer(&self) -> Result<Vec<CustomerTotal>> {
        let pipeline = Pipeline::default()
            .stage(PipelineStage::Group(
                GroupStage::by_field(CUST_NAME).sum(TOTAL_PRICE, Operand::field(PRICE)),
            ))
            .stage(PipelineStage::Sort(Sort::new().asc(TOTAL_PRICE).asc(ID_FIELD)));

        let rows = self.timed("aggregate totalPrice by cust_name", || self.collection.aggregate(&pipeline))?;

        let totals = rows
            .iter()
            .map(CustomerTotal::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(customers = totals.len(), "Aggregated totals");
        Ok(totals)
    }

    /// Each customer name once, in the order first inserted
    pub fn distinct_customer_names(&self) -> Result<Vec<String>> {
        let values = self.timed("distinct cust_name", || self.collection.distinct(CUST_NAME, &Filter::Empty))?;

        let names = values
            .iter()
            .map(|v| expect_string(CUST_NAME, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Name and price of every order with exactly this status, in insertion order
    pub fn find_by_status(&self, status: &str) -> Result<Vec<OrderLine>> {
        let query = Query::with_filter(Filter::eq(STATUS, status))
            .projection(Projection::new().include(CUST_NAME).include(PRICE).exclude(ID_FIELD));

        let docs = self.timed(format!("find status={}", status), || self.collection.find(&query))?;

        let lines = docs
            .iter()
            .map(OrderLine::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(status, matched = lines.len(), "Found orders by status");
        Ok(lines)
    }

    /// Delete every order with this status. Repeating the call deletes nothing.
    pub fn delete_by_status(&self, status: &str) -> Result<DeleteResult> {
        let result = self.timed(format!("deleteMany status={}", status), || {
            self.collection.delete_many(&Filter::eq(STATUS, status))
        })?;

        info!(
            collection = %self.collection.name(),
            status,
            deleted = result.deleted_count,
            "Deleted orders by status"
        );
        Ok(result)
    }

    /// Every remaining order in insertion order
    pub fn all_orders(&self) -> Result<Vec<OrderRecord>> {
        let orders = self
            .collection
            .scan()
            .iter()
            .map(OrderRecord::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    /// Run a store call under the slow query tracker. Failed calls are timed too.
    fn timed<T>(&self, query: impl Into<String>, call: impl FnOnce() -> Result<T>) -> Result<T> {
        let tracker = self.slow_queries.start_query(query, self.collection.name());
        let result = call();
        self.slow_queries.finish_query(tracker);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::sample_orders;

    fn seeded() -> OrderQueryRunner {
        let runner = OrderQueryRunner::new(Arc::new(Collection::new("orderinfo")));
        runner.seed(&sample_orders()).unwrap();
        runner
    }

    #[test]
    fn test_ties_break_on_name() {
        let runner = OrderQueryRunner::new(Arc::new(Collection::new("orderinfo")));
        runner
            .insert(&[
                OrderRecord::new(2, "mno", "A", 100.0),
                OrderRecord::new(1, "def", "A", 100.0),
                OrderRecord::new(3, "aaa", "A", 250.0),
            ])
            .unwrap();

        let names: Vec<_> = runner
            .aggregate_total_by_customer()
            .unwrap()
            .into_iter()
            .map(|t| t.customer_name)
            .collect();
        assert_eq!(names, vec!["def", "mno", "aaa"]);
    }

    #[test]
    fn test_distinct_names_first_seen() {
        assert_eq!(seeded().distinct_customer_names().unwrap(), vec!["abc", "xyz", "pqr"]);
    }

    #[test]
    fn test_distinct_rejects_non_string_names() {
        let runner = seeded();
        let mut odd = orderdb_core::Document::new();
        odd.insert(CUST_NAME, 42);
        runner.collection().insert_one(odd).unwrap();

        assert!(runner.distinct_customer_names().is_err());
    }

    #[test]
    fn test_seed_replaces_contents() {
        let runner = seeded();
        assert_eq!(runner.seed(&sample_orders()[..2]).unwrap(), 2);
        assert_eq!(runner.all_orders().unwrap(), sample_orders()[..2].to_vec());
        assert_eq!(runner.reset(), 2);
        assert!(runner.all_orders().unwrap().is_empty());
    }

    #[test]
    fn test_operations_are_tracked() {
        let runner = OrderQueryRunner::with_slow_query_logger(
            Arc::new(Collection::new("orderinfo")),
            Arc::new(SlowQueryLogger::new(Duration::ZERO)),
        );
        runner.insert(&sample_orders()).unwrap();
        runner.find_by_status("A").unwrap();

        let recent = runner.slow_queries().get_slow_queries(2);
        assert_eq!(recent[0].query, "find status=A");
        assert_eq!(recent[1].query, "insertMany");
    }

    #[test]
    fn test_failed_calls_are_tracked() {
        let runner = OrderQueryRunner::with_slow_query_logger(
            Arc::new(Collection::new("orderinfo")),
            Arc::new(SlowQueryLogger::new(Duration::ZERO)),
        );
        let oversized = "x".repeat(orderdb_core::MAX_DOCUMENT_SIZE + 1);

        assert!(runner.insert(&[OrderRecord::new(1, oversized, "A", 1.0)]).is_err());
        assert_eq!(runner.collection().document_count(), 0);

        let recent = runner.slow_queries().get_slow_queries(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].query, "insertMany");
    }
}

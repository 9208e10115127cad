//! End-to-end order report
//!
//! Seeds the collection, then runs each query in turn and keeps every result.

use crate::config::RunnerConfig;
use crate::order::{CustomerTotal, OrderLine, OrderRecord};
use crate::runner::OrderQueryRunner;
use anyhow::Result;
use orderdb_core::{Database, DeleteResult};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Results of one report run, in the order the steps ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    /// Orders in the collection when the report started
    pub starting_orders: usize,
    pub totals: Vec<CustomerTotal>,
    pub customer_names: Vec<String>,
    pub status: String,
    pub matching: Vec<OrderLine>,
    pub deleted: DeleteResult,
    pub remaining: Vec<OrderRecord>,
}

impl OrderQueryRunner {
    /// Seed with `orders`, then [`report`](Self::report) on `status`
    pub fn run_report(&self, orders: &[OrderRecord], status: &str) -> Result<OrderReport> {
        let inserted = self.seed(orders)?;
        info!(inserted, "Seeded orders");
        self.report(status)
    }

    /// Aggregate, list distinct names, look up and delete `status`, and
    /// collect what remains
    pub fn report(&self, status: &str) -> Result<OrderReport> {
        let starting_orders = self.collection().document_count();

        let totals = self.aggregate_total_by_customer()?;
        info!(customers = totals.len(), "Total price by customer");

        let customer_names = self.distinct_customer_names()?;
        info!(names = ?customer_names, "Distinct customer names");

        let matching = self.find_by_status(status)?;
        info!(status, matched = matching.len(), "Orders with status");

        let deleted = self.delete_by_status(status)?;

        let remaining = self.all_orders()?;
        info!(remaining = remaining.len(), "Remaining orders");

        Ok(OrderReport {
            starting_orders,
            totals,
            customer_names,
            status: status.to_string(),
            matching,
            deleted,
            remaining,
        })
    }
}

/// Open the configured database and collection, seed them per `[seed]` and
/// report on `[report] status`
pub fn run_configured_report(config: &RunnerConfig) -> Result<OrderReport> {
    let db = Database::new(config.store.database.as_str());
    let runner = OrderQueryRunner::from_config(&db, config)?;
    info!(
        database = %db.name(),
        collection = %config.store.collection,
        status = %config.report.status,
        "Running configured report"
    );
    runner.report(&config.report.status)
}

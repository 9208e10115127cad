//! Property-based tests for order queries
//!
//! Records inserted with a status are all returned by a lookup on that status,
//! whatever reads run in between, and totals always account for every price.

use orderdb_core::Collection;
use orderdb_runner::{sample_orders, OrderQueryRunner, OrderRecord};
use proptest::prelude::*;
use std::sync::Arc;

/// Strategy for a short status code
fn status_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["A", "B", "C", "D"]).prop_map(str::to_string)
}

/// Strategy for a single order with a whole or half price
fn order_strategy() -> impl Strategy<Value = OrderRecord> {
    (
        100i64..110,
        prop::sample::select(vec!["abc", "xyz", "pqr", "lmn"]),
        status_strategy(),
        0u32..10_000,
    )
        .prop_map(|(id, name, status, halves)| OrderRecord::new(id, name, status, halves as f64 / 2.0))
}

fn orders_strategy() -> impl Strategy<Value = Vec<OrderRecord>> {
    prop::collection::vec(order_strategy(), 0..40)
}

proptest! {
    /// Insert then find by status returns exactly the inserted matches, in order,
    /// even with aggregation and distinct calls interleaved.
    #[test]
    fn prop_insert_then_find_by_status(
        existing in orders_strategy(),
        inserted in orders_strategy(),
        status in status_strategy(),
        interleave in any::<bool>()
    ) {
        let runner = OrderQueryRunner::new(Arc::new(Collection::new("orderinfo")));
        runner.seed(&existing).unwrap();

        let count = runner.insert(&inserted).unwrap();
        prop_assert_eq!(count, inserted.len());

        if interleave {
            runner.aggregate_total_by_customer().unwrap();
            runner.distinct_customer_names().unwrap();
        }

        let found: Vec<(String, f64)> = runner
            .find_by_status(&status)
            .unwrap()
            .into_iter()
            .map(|l| (l.customer_name, l.price))
            .collect();
        let expected: Vec<(String, f64)> = existing
            .iter()
            .chain(inserted.iter())
            .filter(|o| o.status == status)
            .map(|o| (o.customer_name.clone(), o.price))
            .collect();
        prop_assert_eq!(found, expected);
    }

    /// Totals sum every price, ascend, and name each customer once
    #[test]
    fn prop_totals_cover_all_orders(orders in orders_strategy()) {
        let runner = OrderQueryRunner::new(Arc::new(Collection::new("orderinfo")));
        runner.insert(&orders).unwrap();

        let totals = runner.aggregate_total_by_customer().unwrap();
        let sum: f64 = totals.iter().map(|t| t.total_price).sum();
        let expected: f64 = orders.iter().map(|o| o.price).sum();
        prop_assert!((sum - expected).abs() < 1e-6);

        for pair in totals.windows(2) {
            prop_assert!(
                pair[0].total_price < pair[1].total_price
                    || (pair[0].total_price == pair[1].total_price
                        && pair[0].customer_name < pair[1].customer_name)
            );
        }

        let names = runner.distinct_customer_names().unwrap();
        prop_assert_eq!(names.len(), totals.len());
    }

    /// Deleting a status twice removes its orders once and leaves the rest untouched
    #[test]
    fn prop_delete_by_status(status in status_strategy()) {
        let runner = OrderQueryRunner::new(Arc::new(Collection::new("orderinfo")));
        runner.seed(&sample_orders()).unwrap();

        let matching = sample_orders().iter().filter(|o| o.status == status).count() as u64;
        prop_assert_eq!(runner.delete_by_status(&status).unwrap().deleted_count, matching);
        prop_assert_eq!(runner.delete_by_status(&status).unwrap().deleted_count, 0);

        let remaining: Vec<OrderRecord> =
            sample_orders().into_iter().filter(|o| o.status != status).collect();
        prop_assert_eq!(runner.all_orders().unwrap(), remaining);
    }
}

//! Property-based tests for query execution over collections
//!
//! - Equality filters return exactly the matching documents, in insertion order
//! - Sorting yields an ordered permutation of the matches
//! - Numeric equality holds across integer and float representations

use orderdb_core::{compare_values, values_equal, Collection, Document, Filter, Query, Sort, Value};
use proptest::prelude::*;
use std::cmp::Ordering;

/// Strategy for an order document: (status, price)
fn order_strategy() -> impl Strategy<Value = (String, i64)> {
    (
        prop::sample::select(vec!["A", "B", "C"]).prop_map(str::to_string),
        0i64..1_000,
    )
}

fn to_document((status, price): &(String, i64)) -> Document {
    let mut doc = Document::new();
    doc.insert("status", status.as_str());
    doc.insert("price", *price);
    doc
}

fn price(doc: &Document) -> i64 {
    doc.get("price").and_then(Value::as_i64).unwrap_or(-1)
}

proptest! {
    #[test]
    fn prop_eq_filter_keeps_matches_in_order(
        orders in prop::collection::vec(order_strategy(), 0..50),
        status in prop::sample::select(vec!["A", "B", "C", "D"])
    ) {
        let collection = Collection::new("orderinfo");
        collection.insert_many(orders.iter().map(to_document).collect()).unwrap();

        let found: Vec<i64> = collection
            .find(&Query::with_filter(Filter::eq("status", status)))
            .unwrap()
            .iter()
            .map(price)
            .collect();
        let expected: Vec<i64> = orders.iter().filter(|(s, _)| s == status).map(|(_, p)| *p).collect();

        prop_assert_eq!(collection.count(&Filter::eq("status", status)), expected.len());
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn prop_sort_orders_a_permutation(orders in prop::collection::vec(order_strategy(), 0..50)) {
        let collection = Collection::new("orderinfo");
        collection.insert_many(orders.iter().map(to_document).collect()).unwrap();

        let sorted: Vec<i64> = collection
            .find(&Query::new().sort(Sort::new().desc("price")))
            .unwrap()
            .iter()
            .map(price)
            .collect();

        let mut expected: Vec<i64> = orders.iter().map(|(_, p)| *p).collect();
        expected.sort_by(|a, b| b.cmp(a));
        prop_assert_eq!(sorted, expected);
    }

    #[test]
    fn prop_numeric_equality_across_representations(n in -1_000_000i32..1_000_000) {
        let int = Value::Int32(n);
        let long = Value::Int64(n as i64);
        let float = Value::Float64(n as f64);

        prop_assert!(values_equal(&int, &long));
        prop_assert!(values_equal(&long, &float));
        prop_assert_eq!(compare_values(&int, &float), Ordering::Equal);
        prop_assert_eq!(compare_values(&float, &Value::Int64(n as i64 + 1)), Ordering::Less);
    }
}

//! Seed data for the `orderinfo` collection

use crate::order::OrderRecord;
use anyhow::{Context, Result};
use std::path::Path;

/// The canonical five orders: three customers, duplicate names, statuses A/B/C
pub fn sample_orders() -> Vec<OrderRecord> {
    vec![
        OrderRecord::new(101, "abc", "A", 250.0),
        OrderRecord::new(102, "xyz", "B", 450.0),
        OrderRecord::new(103, "pqr", "A", 300.0),
        OrderRecord::new(101, "abc", "A", 150.0),
        OrderRecord::new(102, "xyz", "C", 350.0),
    ]
}

/// Load orders from a JSON array of `{cust_id, cust_name, status, price}` objects
pub fn load_orders(path: &Path) -> Result<Vec<OrderRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| format!("Failed to parse seed file: {}", path.display()))
}

/// Write orders in the format [`load_orders`] reads
pub fn save_orders(path: &Path, orders: &[OrderRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create seed directory: {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(orders).context("Failed to serialize seed orders")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write seed file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sample_orders() {
        let orders = sample_orders();
        assert_eq!(orders.len(), 5);
        assert_eq!(orders.iter().filter(|o| o.status == "A").count(), 3);
    }

    #[test]
    fn test_seed_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed").join("orders.json");

        save_orders(&path, &sample_orders()).unwrap();
        assert_eq!(load_orders(&path).unwrap(), sample_orders());
    }

    #[test]
    fn test_load_reads_collection_field_names() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("orders.json");
        std::fs::write(&path, r#"[{ "cust_id": 7, "cust_name": "lmn", "status": "D", "price": 12.5 }]"#).unwrap();

        assert_eq!(load_orders(&path).unwrap(), vec![OrderRecord::new(7, "lmn", "D", 12.5)]);
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("orders.json");

        let missing = load_orders(&path).unwrap_err();
        assert!(missing.to_string().contains("Failed to read seed file"));

        std::fs::write(&path, "{ not json").unwrap();
        let malformed = load_orders(&path).unwrap_err();
        assert!(malformed.to_string().contains("Failed to parse seed file"));
    }
}

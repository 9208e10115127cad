//! OrderDB Runner - typed order queries over an orderdb collection
//!
//! - Bulk insert of order records
//! - Total price per customer, ascending
//! - Distinct customer names
//! - Status lookup with a name/price projection
//! - Delete by status
//!
//! Configuration is TOML and diagnostics go through `tracing`.

pub mod config;
pub mod logging;
pub mod order;
pub mod report;
pub mod runner;
pub mod seed;

pub use config::{ConfigLoader, LogFormat, LogLevel, LoggingSettings, RunnerConfig};
pub use logging::{init_logging, QueryTracker, SlowQuery, SlowQueryLogger, SlowQueryStats};
pub use order::{CustomerTotal, OrderError, OrderLine, OrderRecord};
pub use report::{run_configured_report, OrderReport};
pub use runner::OrderQueryRunner;
pub use seed::{load_orders, sample_orders, save_orders};

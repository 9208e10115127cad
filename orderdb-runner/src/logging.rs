//! Structured logging with tracing
//!
//! Subscriber setup plus slow query tracking for runner operations.

use crate::config::{LogFormat, LoggingSettings};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Slow queries kept for reporting
const MAX_SLOW_QUERIES: usize = 1000;

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    let subscriber = Registry::default().with(env_filter);

    match settings.format {
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_target(true);

            subscriber
                .with(json_layer)
                .try_init()
                .context("Failed to install JSON log subscriber")?;
        }
        LogFormat::Text => {
            let fmt_layer = fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .compact();

            subscriber
                .with(fmt_layer)
                .try_init()
                .context("Failed to install log subscriber")?;
        }
    }

    tracing::info!(
        "Logging initialized: level={}, format={:?}, slow_query_threshold_ms={}",
        settings.level.as_str(),
        settings.format,
        settings.slow_query_threshold_ms
    );

    Ok(())
}

/// Slow query logger
#[derive(Debug)]
pub struct SlowQueryLogger {
    threshold: Duration,
    queries: RwLock<Vec<SlowQuery>>,
}

/// Slow query record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowQuery {
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub query: String,
    pub collection: String,
}

/// In-flight query timer
#[derive(Debug)]
pub struct QueryTracker {
    start_time: Instant,
    query: String,
    collection: String,
}

impl SlowQueryLogger {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            queries: RwLock::new(Vec::new()),
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Start tracking a query
    pub fn start_query(&self, query: impl Into<String>, collection: impl Into<String>) -> QueryTracker {
        QueryTracker {
            start_time: Instant::now(),
            query: query.into(),
            collection: collection.into(),
        }
    }

    /// Finish tracking a query and record it if slow. Returns the elapsed time.
    pub fn finish_query(&self, tracker: QueryTracker) -> Duration {
        let duration = tracker.start_time.elapsed();
        if duration < self.threshold {
            return duration;
        }

        let slow_query = SlowQuery {
            timestamp: Utc::now(),
            duration_ms: duration.as_millis() as u64,
            query: tracker.query,
            collection: tracker.collection,
        };

        tracing::warn!(
            target: "slow_query",
            duration_ms = slow_query.duration_ms,
            query = %slow_query.query,
            collection = %slow_query.collection,
            "Slow query detected"
        );

        let mut queries = self.queries.write();
        queries.push(slow_query);
        if queries.len() > MAX_SLOW_QUERIES {
            let excess = queries.len() - MAX_SLOW_QUERIES;
            queries.drain(..excess);
        }

        duration
    }

    /// Most recent slow queries first
    pub fn get_slow_queries(&self, limit: usize) -> Vec<SlowQuery> {
        self.queries.read().iter().rev().take(limit).cloned().collect()
    }

    pub fn get_stats(&self) -> SlowQueryStats {
        let queries = self.queries.read();
        let threshold_ms = self.threshold.as_millis() as u64;

        if queries.is_empty() {
            return SlowQueryStats {
                threshold_ms,
                ..SlowQueryStats::default()
            };
        }

        let total_count = queries.len();
        let total_duration: u64 = queries.iter().map(|q| q.duration_ms).sum();

        SlowQueryStats {
            total_count,
            avg_duration_ms: total_duration / total_count as u64,
            max_duration_ms: queries.iter().map(|q| q.duration_ms).max().unwrap_or(0),
            threshold_ms,
        }
    }
}

impl Default for SlowQueryLogger {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

/// Slow query statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowQueryStats {
    pub total_count: usize,
    pub avg_duration_ms: u64,
    pub max_duration_ms: u64,
    pub threshold_ms: u64,
}

//! Collaborator traits and publish errors

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Time-series tables written by the pipeline
pub const UNIVERSE_TABLE: &str = "universe";
pub const ALERTS_TABLE: &str = "activity_alerts";
pub const INDICATORS_TABLE: &str = "technical_indicators";
pub const SIGNALS_TABLE: &str = "trade_signals";

/// Cache keys for low-latency external reads
pub const UNIVERSE_KEY: &str = "scanner:universe";
pub const ALERTS_KEY: &str = "scanner:alerts";

pub fn indicators_key(ticker: &str) -> String {
    format!("scanner:indicators:{ticker}")
}

pub fn signal_key(ticker: &str) -> String {
    format!("scanner:signal:{ticker}")
}

/// Key/value cache collaborator
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()>;

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// Append-only time-series collaborator
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    async fn write_batch(&self, table: &str, records: &[Value]) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Batch for {table} failed after {attempts} attempts: {error}")]
    WriteFailed {
        table: String,
        attempts: u32,
        error: String,
    },
}

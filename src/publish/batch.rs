//! Buffered time-series writer with retry-then-dead-letter

use super::dead_letter::{DeadLetterEntry, DeadLetterSink};
use super::types::{PublishError, TimeSeriesStore};
use crate::config::StorageConfig;
use crate::retry::Backoff;
use crate::telemetry::{increment_counter, record_latency, CounterMetric, LatencyMetric};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// What happened to one flushed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    Empty,
    Written { records: usize, attempts: u32 },
    DeadLettered { records: usize, attempts: u32 },
}

/// Retry settings for a batch write
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }
}

/// Buffers records per table and flushes them in batches
pub struct BatchWriter {
    store: Arc<dyn TimeSeriesStore>,
    dead_letter: DeadLetterSink,
    batch_size: usize,
    batch_interval: Duration,
    retry: RetryPolicy,
    buffers: Mutex<HashMap<String, Vec<Value>>>,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn TimeSeriesStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            dead_letter: DeadLetterSink::new(config.dead_letter_dir.clone()),
            batch_size: config.batch_size.max(1),
            batch_interval: Duration::from_millis(config.batch_interval_ms),
            retry: RetryPolicy::from_config(config),
            buffers: Mutex::new(HashMap::new()),
        }
    }

    pub fn dead_letter(&self) -> &DeadLetterSink {
        &self.dead_letter
    }

    /// Records waiting in `table`'s buffer
    pub fn pending(&self, table: &str) -> usize {
        self.buffers.lock().get(table).map(Vec::len).unwrap_or(0)
    }

    /// Buffer records, flushing full batches immediately
    pub async fn push(&self, table: &str, records: Vec<Value>) -> Result<(), PublishError> {
        let ready: Vec<Vec<Value>> = {
            let mut buffers = self.buffers.lock();
            let buffer = buffers.entry(table.to_string()).or_default();
            buffer.extend(records);
            let mut full = Vec::new();
            while buffer.len() >= self.batch_size {
                full.push(buffer.drain(..self.batch_size).collect());
            }
            full
        };

        for batch in ready {
            self.write_batch(table, batch).await?;
        }
        Ok(())
    }

    /// Flush whatever `table` has buffered
    pub async fn flush_table(&self, table: &str) -> Result<FlushOutcome, PublishError> {
        let batch = self
            .buffers
            .lock()
            .get_mut(table)
            .map(std::mem::take)
            .unwrap_or_default();
        self.write_batch(table, batch).await
    }

    pub async fn flush_all(&self) -> Result<(), PublishError> {
        let tables: Vec<String> = self.buffers.lock().keys().cloned().collect();
        for table in tables {
            self.flush_table(&table).await?;
        }
        Ok(())
    }

    /// Write with retries; exhausted batches go to the dead-letter sink
    pub async fn write_batch(
        &self,
        table: &str,
        records: Vec<Value>,
    ) -> Result<FlushOutcome, PublishError> {
        if records.is_empty() {
            return Ok(FlushOutcome::Empty);
        }

        let start = Instant::now();
        let mut backoff = Backoff::new(self.retry.initial_backoff, MAX_BACKOFF);
        let mut attempts = 0;
        let mut last_error = String::new();

        while attempts < self.retry.max_attempts {
            attempts += 1;
            match self.store.write_batch(table, &records).await {
                Ok(()) => {
                    record_latency(LatencyMetric::BatchWrite, start.elapsed());
                    tracing::debug!(table, records = records.len(), attempts, "Batch written");
                    return Ok(FlushOutcome::Written {
                        records: records.len(),
                        attempts,
                    });
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempts < self.retry.max_attempts {
                        let delay = backoff.next_delay();
                        tracing::warn!(table, attempts, error = %e, ?delay, "Batch write failed, retrying");
                        increment_counter(CounterMetric::BatchRetries, 1);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let entry = DeadLetterEntry {
            batch_id: Uuid::new_v4(),
            table: table.to_string(),
            failed_at: Utc::now(),
            attempts,
            error: last_error,
            records,
        };
        let count = entry.records.len();
        self.dead_letter.write(&entry).await?;
        increment_counter(CounterMetric::BatchesDeadLettered, 1);
        Ok(FlushOutcome::DeadLettered {
            records: count,
            attempts,
        })
    }

    /// Periodic flusher; flushes once more on shutdown
    pub fn spawn_flusher(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.batch_interval.max(Duration::from_millis(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.flush_all().await {
                            tracing::error!(error = %e, "Batch flush failed");
                        }
                    }
                    _ = shutdown.recv() => {
                        if let Err(e) = self.flush_all().await {
                            tracing::error!(error = %e, "Final batch flush failed");
                        }
                        tracing::info!("Batch writer stopped");
                        return;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::InMemoryTimeSeriesStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &TempDir, batch_size: usize) -> StorageConfig {
        StorageConfig {
            batch_size,
            batch_interval_ms: 50,
            max_attempts: 3,
            initial_backoff_ms: 1,
            dead_letter_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_push_flushes_full_batches() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryTimeSeriesStore::new());
        let writer = BatchWriter::new(store.clone(), &config(&dir, 2));

        writer
            .push("trade_signals", vec![json!(1), json!(2), json!(3)])
            .await
            .unwrap();
        assert_eq!(store.records("trade_signals"), vec![json!(1), json!(2)]);
        assert_eq!(writer.pending("trade_signals"), 1);

        let outcome = writer.flush_table("trade_signals").await.unwrap();
        assert_eq!(outcome, FlushOutcome::Written { records: 1, attempts: 1 });
        assert_eq!(store.batches(), 2);
        assert_eq!(writer.flush_table("trade_signals").await.unwrap(), FlushOutcome::Empty);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryTimeSeriesStore::new());
        let writer = BatchWriter::new(store.clone(), &config(&dir, 10));

        store.fail_next(2);
        let outcome = writer.write_batch("universe", vec![json!({"t": "XYZ"})]).await.unwrap();
        assert_eq!(outcome, FlushOutcome::Written { records: 1, attempts: 3 });
        assert!(writer.dead_letter().tables().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_batch_is_dead_lettered() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryTimeSeriesStore::new());
        let writer = BatchWriter::new(store.clone(), &config(&dir, 10));

        store.fail_next(3);
        let outcome = writer
            .write_batch("activity_alerts", vec![json!({"t": "XYZ"})])
            .await
            .unwrap();
        assert_eq!(outcome, FlushOutcome::DeadLettered { records: 1, attempts: 3 });

        let entries = writer.dead_letter().read("activity_alerts").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].attempts, 3);
        assert_eq!(entries[0].records, vec![json!({"t": "XYZ"})]);
        assert!(store.records("activity_alerts").is_empty());
    }

    #[tokio::test]
    async fn test_flusher_drains_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryTimeSeriesStore::new());
        let mut cfg = config(&dir, 100);
        cfg.batch_interval_ms = 60_000;
        let writer = Arc::new(BatchWriter::new(store.clone(), &cfg));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = writer.clone().spawn_flusher(shutdown_rx);
        writer.push("universe", vec![json!(1)]).await.unwrap();

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
        assert_eq!(store.records("universe"), vec![json!(1)]);
    }
}

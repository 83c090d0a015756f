//! In-memory collaborators for local runs, backtests and tests

use super::types::{KeyValueCache, TimeSeriesStore};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// DashMap cache; entries expire on read
#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.value().1 > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueCache for InMemoryCache {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .map(|e| (e.value().0.clone(), e.value().1 > now));
        match hit {
            Some((value, true)) => Ok(Some(value)),
            Some((_, false)) => {
                self.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Records batches per table; can be told to fail upcoming writes
#[derive(Default)]
pub struct InMemoryTimeSeriesStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    batches: AtomicU32,
    failures_pending: AtomicU32,
}

impl InMemoryTimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` writes
    pub fn fail_next(&self, n: u32) {
        self.failures_pending.store(n, Ordering::SeqCst);
    }

    pub fn records(&self, table: &str) -> Vec<Value> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    /// Successful batch writes
    pub fn batches(&self) -> u32 {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimeSeriesStore for InMemoryTimeSeriesStore {
    async fn write_batch(&self, table: &str, records: &[Value]) -> anyhow::Result<()> {
        let failing = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("time-series store unavailable");
        }

        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .extend_from_slice(records);
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

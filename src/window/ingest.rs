//! Bounded, sharded ingestion in front of the window store

use super::store::WindowStore;
use crate::feed::MarketEvent;
use crate::telemetry::{increment_counter, set_gauge, CounterMetric, GaugeMetric};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// Behavior of a full shard queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Evict the oldest queued event to make room
    DropOldest,
    /// Wait until the writer frees a slot
    #[default]
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("ingestor is shut down")]
    Closed,
}

/// Multi-producer, single-consumer bounded queue
struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl<T> BoundedQueue<T> {
    fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            not_empty: Notify::new(),
            not_full: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    async fn push(&self, item: T, policy: BackpressurePolicy) -> Result<(), IngestError> {
        match policy {
            BackpressurePolicy::DropOldest => {
                if self.closed.load(Ordering::Acquire) {
                    return Err(IngestError::Closed);
                }
                let mut items = self.items.lock();
                if items.len() >= self.capacity {
                    items.pop_front();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    increment_counter(CounterMetric::EventsDropped, 1);
                }
                items.push_back(item);
                drop(items);
                self.not_empty.notify_one();
                Ok(())
            }
            BackpressurePolicy::Block => loop {
                if self.closed.load(Ordering::Acquire) {
                    return Err(IngestError::Closed);
                }
                let notified = self.not_full.notified();
                {
                    let mut items = self.items.lock();
                    if items.len() < self.capacity {
                        items.push_back(item);
                        drop(items);
                        self.not_empty.notify_one();
                        return Ok(());
                    }
                }
                notified.await;
            },
        }
    }

    /// Next item; `None` once closed and drained
    async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.not_empty.notified();
            {
                let mut items = self.items.lock();
                if let Some(item) = items.pop_front() {
                    drop(items);
                    self.not_full.notify_one();
                    return Some(item);
                }
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            notified.await;
        }
    }

    fn len(&self) -> usize {
        self.items.lock().len()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }
}

/// Routes events to per-shard queues, each drained by exactly one writer task
///
/// A ticker always hashes to the same shard, so its window only ever sees one
/// writer.
pub struct Ingestor {
    shards: Vec<Arc<BoundedQueue<MarketEvent>>>,
    policy: BackpressurePolicy,
    writers: Vec<JoinHandle<()>>,
}

impl Ingestor {
    /// Spawn one writer task per shard
    pub fn start(
        store: Arc<WindowStore>,
        shards: usize,
        queue_capacity: usize,
        policy: BackpressurePolicy,
    ) -> Self {
        let shards: Vec<Arc<BoundedQueue<MarketEvent>>> = (0..shards.max(1))
            .map(|_| Arc::new(BoundedQueue::new(queue_capacity)))
            .collect();

        let writers = shards
            .iter()
            .enumerate()
            .map(|(shard, queue)| {
                let queue = Arc::clone(queue);
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    while let Some(event) = queue.pop().await {
                        let ticker = event.ticker().to_string();
                        if let Err(e) = store.apply(event) {
                            increment_counter(CounterMetric::EventsRejected, 1);
                            tracing::warn!(shard, %ticker, error = %e, "Dropped market event");
                        }
                    }
                    tracing::debug!(shard, "Ingest writer drained");
                })
            })
            .collect();

        Self {
            shards,
            policy,
            writers,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Stable shard index for a ticker (FNV-1a)
    pub fn shard_for(&self, ticker: &str) -> usize {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in ticker.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.shards.len() as u64) as usize
    }

    pub async fn submit(&self, event: MarketEvent) -> Result<(), IngestError> {
        let shard = self.shard_for(event.ticker());
        self.shards[shard].push(event, self.policy).await
    }

    /// Events queued across all shards
    pub fn queue_depth(&self) -> usize {
        self.shards.iter().map(|q| q.len()).sum()
    }

    /// Events evicted under `DropOldest`
    pub fn dropped(&self) -> u64 {
        self.shards
            .iter()
            .map(|q| q.dropped.load(Ordering::Relaxed))
            .sum()
    }

    pub fn report_gauges(&self) {
        set_gauge(GaugeMetric::IngestQueueDepth, self.queue_depth() as f64);
    }

    /// Forward a feed channel until it closes
    pub async fn pump(&self, mut events: mpsc::Receiver<MarketEvent>) {
        while let Some(event) = events.recv().await {
            if self.submit(event).await.is_err() {
                break;
            }
        }
    }

    /// Close the queues and wait for writers to drain what remains
    pub async fn shutdown(self) {
        for queue in &self.shards {
            queue.close();
        }
        for writer in self.writers {
            if let Err(e) = writer.await {
                tracing::error!(error = %e, "Ingest writer panicked");
            }
        }
    }
}

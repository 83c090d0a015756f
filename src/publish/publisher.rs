//! Fan-out of tier outputs to the cache and the time-series store

use super::batch::BatchWriter;
use super::types::{
    indicators_key, signal_key, KeyValueCache, PublishError, ALERTS_KEY, ALERTS_TABLE,
    INDICATORS_TABLE, SIGNALS_TABLE, UNIVERSE_KEY, UNIVERSE_TABLE,
};
use crate::activity::ActivityAlert;
use crate::signal::TradeSignal;
use crate::technical::TechnicalIndicators;
use crate::universe::Universe;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Cache failures are logged and swallowed; time-series writes go through
/// the batch writer's retry and dead-letter path.
pub struct Publisher {
    cache: Arc<dyn KeyValueCache>,
    writer: Arc<BatchWriter>,
    cache_ttl: Duration,
    confidence_threshold: Decimal,
}

impl Publisher {
    pub fn new(
        cache: Arc<dyn KeyValueCache>,
        writer: Arc<BatchWriter>,
        cache_ttl: Duration,
        confidence_threshold: Decimal,
    ) -> Self {
        Self {
            cache,
            writer,
            cache_ttl,
            confidence_threshold,
        }
    }

    pub fn writer(&self) -> &Arc<BatchWriter> {
        &self.writer
    }

    async fn cache_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let body = match serde_json::to_string(value) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize cache value");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, body, self.cache_ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    fn records<T: Serialize>(items: &[T]) -> Result<Vec<Value>, PublishError> {
        items
            .iter()
            .map(|i| serde_json::to_value(i).map_err(PublishError::from))
            .collect()
    }

    pub async fn publish_universe(&self, universe: &Universe) -> Result<(), PublishError> {
        self.cache_json(UNIVERSE_KEY, universe).await;

        let refreshed_at = universe.refreshed_at;
        let mut rows = Vec::with_capacity(universe.len());
        for stock in universe.stocks.values() {
            let mut row = serde_json::to_value(stock)?;
            if let Value::Object(map) = &mut row {
                map.insert("refreshed_at".to_string(), json!(refreshed_at));
                map.insert("degraded".to_string(), json!(universe.degraded));
            }
            rows.push(row);
        }
        self.writer.push(UNIVERSE_TABLE, rows).await
    }

    pub async fn publish_alerts(&self, alerts: &[ActivityAlert]) -> Result<(), PublishError> {
        self.cache_json(ALERTS_KEY, alerts).await;
        self.writer.push(ALERTS_TABLE, Self::records(alerts)?).await
    }

    pub async fn publish_indicators(
        &self,
        indicators: &[TechnicalIndicators],
    ) -> Result<(), PublishError> {
        for ind in indicators {
            self.cache_json(&indicators_key(&ind.ticker), ind).await;
        }
        self.writer
            .push(INDICATORS_TABLE, Self::records(indicators)?)
            .await
    }

    /// Every signal is persisted; only confident ones reach the cache
    pub async fn publish_signal(&self, signal: &TradeSignal) -> Result<(), PublishError> {
        if signal.confidence >= self.confidence_threshold {
            self.cache_json(&signal_key(&signal.ticker), signal).await;
        }
        self.writer
            .push(SIGNALS_TABLE, vec![serde_json::to_value(signal)?])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::publish::{InMemoryCache, InMemoryTimeSeriesStore};
    use crate::signal::SignalType;
    use crate::universe::Stock;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (Publisher, Arc<InMemoryCache>, Arc<InMemoryTimeSeriesStore>) {
        let cache = Arc::new(InMemoryCache::new());
        let store = Arc::new(InMemoryTimeSeriesStore::new());
        let config = StorageConfig {
            batch_size: 1,
            dead_letter_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let writer = Arc::new(BatchWriter::new(store.clone(), &config));
        let publisher = Publisher::new(cache.clone(), writer, Duration::from_secs(60), dec!(0.6));
        (publisher, cache, store)
    }

    fn signal(confidence: Decimal) -> TradeSignal {
        TradeSignal {
            timestamp: Utc::now(),
            ticker: "XYZ".to_string(),
            signal_type: SignalType::EntryLong,
            confidence,
            price: dec!(5.58),
        }
    }

    #[tokio::test]
    async fn test_confident_signal_is_cached() {
        let dir = TempDir::new().unwrap();
        let (publisher, cache, store) = setup(&dir);

        publisher.publish_signal(&signal(dec!(0.4))).await.unwrap();
        assert_eq!(cache.get("scanner:signal:XYZ").await.unwrap(), None);

        publisher.publish_signal(&signal(dec!(0.7))).await.unwrap();
        let cached = cache.get("scanner:signal:XYZ").await.unwrap().unwrap();
        let back: TradeSignal = serde_json::from_str(&cached).unwrap();
        assert_eq!(back.confidence, dec!(0.7));
        assert_eq!(store.records(SIGNALS_TABLE).len(), 2);
    }

    #[tokio::test]
    async fn test_universe_rows_carry_refresh_time() {
        let dir = TempDir::new().unwrap();
        let (publisher, cache, store) = setup(&dir);
        let universe = Universe::from_stocks(
            vec![Stock {
                ticker: "XYZ".to_string(),
                price: dec!(5.00),
                float_shares: 10_000_000,
                volume: 100_000,
                high: dec!(5.10),
                low: dec!(4.90),
                close: dec!(5.00),
            }],
            Utc::now(),
        );

        publisher.publish_universe(&universe).await.unwrap();
        assert!(cache.get(UNIVERSE_KEY).await.unwrap().is_some());
        let rows = store.records(UNIVERSE_TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["ticker"], "XYZ");
        assert_eq!(rows[0]["degraded"], false);
    }
}

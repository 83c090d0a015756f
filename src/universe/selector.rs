//! Tier 1: universe selection with degraded mode

use super::source::UniverseSource;
use super::types::{Stock, Universe};
use crate::config::UniverseConfig;
use crate::telemetry::{set_gauge, GaugeMetric};
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Eligibility thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniverseCriteria {
    pub min_price: Decimal,
    pub max_price: Decimal,
    /// Exclusive upper bound
    pub max_float_shares: u64,
    pub min_volume: u64,
}

impl UniverseCriteria {
    pub fn from_config(config: &UniverseConfig) -> Self {
        Self {
            min_price: config.min_price,
            max_price: config.max_price,
            max_float_shares: config.max_float_shares,
            min_volume: config.min_volume,
        }
    }

    pub fn is_eligible(&self, stock: &Stock) -> bool {
        stock.price >= self.min_price
            && stock.price <= self.max_price
            && stock.float_shares < self.max_float_shares
            && stock.volume >= self.min_volume
    }

    pub fn filter(&self, snapshot: Vec<Stock>) -> Vec<Stock> {
        snapshot.into_iter().filter(|s| self.is_eligible(s)).collect()
    }
}

/// Refreshes and publishes the eligible universe
pub struct UniverseSelector {
    source: Arc<dyn UniverseSource>,
    criteria: UniverseCriteria,
    current: RwLock<Arc<Universe>>,
}

impl UniverseSelector {
    pub fn new(source: Arc<dyn UniverseSource>, criteria: UniverseCriteria) -> Self {
        Self {
            source,
            criteria,
            current: RwLock::new(Arc::new(Universe::default())),
        }
    }

    pub fn criteria(&self) -> &UniverseCriteria {
        &self.criteria
    }

    /// Last published universe
    pub fn current(&self) -> Arc<Universe> {
        self.current.read().clone()
    }

    /// Fetch, filter and publish a new universe
    ///
    /// A failed or empty upstream snapshot keeps the previous universe and
    /// marks it degraded.
    pub async fn refresh_universe(&self) -> Arc<Universe> {
        let snapshot = match self.source.fetch_snapshot().await {
            Ok(rows) if rows.is_empty() => Err(anyhow::anyhow!("upstream snapshot is empty")),
            other => other,
        };

        let published = match snapshot {
            Ok(rows) => {
                let total = rows.len();
                let eligible = self.criteria.filter(rows);
                if eligible.is_empty() {
                    tracing::warn!(snapshot = total, "No symbols passed universe filters");
                } else {
                    tracing::info!(snapshot = total, eligible = eligible.len(), "Universe refreshed");
                }
                Arc::new(Universe::from_stocks(eligible, Utc::now()))
            }
            Err(e) => {
                let previous = self.current();
                tracing::warn!(
                    error = %e,
                    retained = previous.len(),
                    "Universe refresh failed, keeping previous universe (degraded)"
                );
                let mut retained = (*previous).clone();
                retained.degraded = true;
                Arc::new(retained)
            }
        };

        *self.current.write() = published.clone();
        set_gauge(GaugeMetric::UniverseSize, published.len() as f64);
        set_gauge(
            GaugeMetric::UniverseDegraded,
            if published.degraded { 1.0 } else { 0.0 },
        );
        published
    }
}

//! Tier 3: indicator computation over the active working set

use super::macd::{compute_macd, MacdParams};
use super::momentum::MomentumScorer;
use super::patterns::{detector_for, PatternDetector};
use super::rsi::rsi;
use super::stochastic::stochastic;
use super::types::TechnicalIndicators;
use crate::config::{ConfigError, TechnicalConfig};
use crate::cycle::CycleReport;
use crate::feed::PriceBar;
use crate::telemetry::{increment_counter, CounterMetric};
use crate::window::WindowStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Computes MACD, stochastic, RSI, momentum and patterns for one ticker at a
/// time; holds no per-ticker state, so tickers can run in parallel.
pub struct TechnicalAnalyzer {
    macd: MacdParams,
    stochastic_periods: Vec<usize>,
    rsi_period: usize,
    momentum: MomentumScorer,
    patterns: Vec<Box<dyn PatternDetector>>,
    lookback: usize,
    worker_concurrency: usize,
}

impl TechnicalAnalyzer {
    pub fn from_config(config: &TechnicalConfig) -> Result<Self, ConfigError> {
        let mut stochastic_periods = config.stochastic_periods.clone();
        stochastic_periods.sort_unstable();
        stochastic_periods.dedup();

        let patterns = config
            .patterns
            .iter()
            .map(|tag| detector_for(*tag, config.opening_range_bars))
            .collect();

        Ok(Self {
            macd: config.macd.params()?,
            stochastic_periods,
            rsi_period: config.rsi_period,
            momentum: MomentumScorer::new(config.momentum.clone()),
            patterns,
            lookback: config.max_lookback()?,
            worker_concurrency: config.worker_concurrency.max(1),
        })
    }

    /// Add a custom pattern detector after the configured ones
    pub fn with_pattern(mut self, detector: Box<dyn PatternDetector>) -> Self {
        self.patterns.push(detector);
        self
    }

    /// Bars required before indicators are ready
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Indicators from `bars` (oldest first); `None` for an empty window
    pub fn calculate(&self, ticker: &str, bars: &[PriceBar]) -> Option<TechnicalIndicators> {
        let last = bars.last()?;
        let not_ready = || TechnicalIndicators::not_ready(ticker, last.timestamp, last.close);

        if bars.len() < self.lookback {
            tracing::trace!(ticker, have = bars.len(), need = self.lookback, "Indicators not ready");
            return Some(not_ready());
        }

        let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
        let readings = (
            compute_macd(&closes, self.macd),
            self.stochastic_periods
                .iter()
                .map(|p| stochastic(bars, *p))
                .collect::<Option<Vec<_>>>(),
            rsi(&closes, self.rsi_period),
            self.momentum.score(bars),
        );
        let (Some(macd), Some(stochastic), Some(rsi), Some(momentum_score)) = readings else {
            tracing::debug!(ticker, "Indicator inputs degenerate, treating as not ready");
            return Some(not_ready());
        };

        let patterns = self
            .patterns
            .iter()
            .filter(|p| p.detect(bars))
            .map(|p| p.tag())
            .collect();

        Some(TechnicalIndicators {
            ticker: ticker.to_string(),
            as_of: last.timestamp,
            close: last.close,
            ready: true,
            macd,
            stochastic,
            rsi,
            momentum_score,
            patterns,
        })
    }

    /// Indicators from the ticker's current window
    pub fn calculate_indicators(
        &self,
        store: &WindowStore,
        ticker: &str,
    ) -> Option<TechnicalIndicators> {
        let bars = store.get_window(ticker, store.capacity());
        self.calculate(ticker, &bars)
    }

    /// Compute every ticker of the working set with bounded parallelism
    ///
    /// Returns the ready indicator sets in input order; not-ready tickers are
    /// counted as skipped and a failed task only fails its own ticker.
    pub async fn analyze_active(
        self: &Arc<Self>,
        store: &Arc<WindowStore>,
        tickers: &[String],
    ) -> (Vec<TechnicalIndicators>, CycleReport) {
        let semaphore = Arc::new(Semaphore::new(self.worker_concurrency));
        let mut handles = Vec::with_capacity(tickers.len());

        for ticker in tickers {
            let analyzer = Arc::clone(self);
            let store = Arc::clone(store);
            let semaphore = Arc::clone(&semaphore);
            let ticker = ticker.clone();
            let handle = tokio::spawn({
                let ticker = ticker.clone();
                async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    analyzer.calculate_indicators(&store, &ticker)
                }
            });
            handles.push((ticker, handle));
        }

        let mut report = CycleReport::default();
        let mut results = Vec::new();
        for (ticker, handle) in handles {
            match handle.await {
                Ok(Some(indicators)) if indicators.ready => {
                    report.processed += 1;
                    results.push(indicators);
                }
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    increment_counter(CounterMetric::TickerFailures, 1);
                    tracing::warn!(%ticker, error = %e, "Indicator task failed");
                    report.fail(ticker, e);
                }
            }
        }
        increment_counter(CounterMetric::IndicatorsComputed, results.len() as u64);

        (results, report)
    }
}

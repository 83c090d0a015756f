//! Tiers 2 to 4 over a given universe

use super::state::ScanState;
use crate::activity::{ActivityAlert, ActivityDetector};
use crate::config::{Config, ConfigError};
use crate::cycle::CycleReport;
use crate::signal::{SignalGenerator, TradeSignal};
use crate::technical::{ActiveSet, TechnicalAnalyzer, TechnicalIndicators};
use crate::telemetry::{increment_counter, set_gauge, CounterMetric, GaugeMetric};
use crate::universe::Universe;
use crate::window::WindowStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Everything one synchronous pass produced
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub alerts: Vec<ActivityAlert>,
    pub indicators: Vec<TechnicalIndicators>,
    pub signals: Vec<TradeSignal>,
    pub report: CycleReport,
}

/// The tier chain above the window store
pub struct Scanner {
    store: Arc<WindowStore>,
    detector: ActivityDetector,
    analyzer: Arc<TechnicalAnalyzer>,
    generator: SignalGenerator,
    state: ScanState,
}

impl Scanner {
    pub fn new(
        store: Arc<WindowStore>,
        detector: ActivityDetector,
        analyzer: TechnicalAnalyzer,
        generator: SignalGenerator,
        active: ActiveSet,
    ) -> Self {
        Self {
            store,
            detector,
            analyzer: Arc::new(analyzer),
            generator,
            state: ScanState::new(active),
        }
    }

    pub fn from_config(config: &Config, store: Arc<WindowStore>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            store,
            ActivityDetector::new(&config.activity),
            TechnicalAnalyzer::from_config(&config.technical)?,
            SignalGenerator::new(&config.signal),
            ActiveSet::new(
                config.technical.alert_ttl_secs,
                config.technical.max_active_symbols,
            ),
        ))
    }

    pub fn store(&self) -> &Arc<WindowStore> {
        &self.store
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Tier 2 over the universe; alerts feed the working set
    pub fn detect(&self, universe: &Universe) -> (Vec<ActivityAlert>, CycleReport) {
        let (alerts, report) = self.detector.detect_anomalies(universe, &self.store);
        self.state.record_alerts(alerts.clone());
        (alerts, report)
    }

    /// Tier 3 over the working set as of `now`
    pub async fn analyze(&self, now: DateTime<Utc>) -> (Vec<TechnicalIndicators>, CycleReport) {
        let active = self.state.active_tickers(now);
        set_gauge(GaugeMetric::ActiveSymbols, active.len() as f64);
        if active.is_empty() {
            return (Vec::new(), CycleReport::default());
        }
        self.analyzer.analyze_active(&self.store, &active).await
    }

    /// Tier 4 for each ready indicator set
    pub fn signals(&self, indicators: &[TechnicalIndicators]) -> (Vec<TradeSignal>, CycleReport) {
        let mut report = CycleReport::default();
        let mut signals = Vec::with_capacity(indicators.len());
        for ind in indicators {
            match self.generator.generate_with_store(ind, &self.store) {
                Ok(signal) => {
                    report.processed += 1;
                    signals.push(signal);
                }
                Err(e) => {
                    increment_counter(CounterMetric::TickerFailures, 1);
                    report.fail(&ind.ticker, e);
                }
            }
        }
        (signals, report)
    }

    /// Tiers 2, 3 and 4 back to back
    pub async fn run_cycle(&self, universe: &Universe, now: DateTime<Utc>) -> ScanOutput {
        let (alerts, mut report) = self.detect(universe);
        let (indicators, technical) = self.analyze(now).await;
        let (signals, signal_report) = self.signals(&indicators);
        report.merge(technical);
        report.merge(signal_report);

        ScanOutput {
            alerts,
            indicators,
            signals,
            report,
        }
    }
}

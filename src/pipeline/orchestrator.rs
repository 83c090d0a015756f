//! Periodic tier scheduling

use super::scanner::Scanner;
use crate::config::PipelineConfig;
use crate::publish::Publisher;
use crate::signal::TradeSignal;
use crate::telemetry::{record_latency, set_gauge, GaugeMetric, LatencyMetric};
use crate::universe::UniverseSelector;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Wires the selector and scanner to their schedules and the publisher
pub struct Pipeline {
    config: PipelineConfig,
    selector: Arc<UniverseSelector>,
    scanner: Arc<Scanner>,
    publisher: Option<Arc<Publisher>>,
    signal_tx: broadcast::Sender<TradeSignal>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, selector: Arc<UniverseSelector>, scanner: Arc<Scanner>) -> Self {
        let (signal_tx, _) = broadcast::channel(config.signal_channel_capacity.max(1));
        Self {
            config,
            selector,
            scanner,
            publisher: None,
            signal_tx,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn scanner(&self) -> &Arc<Scanner> {
        &self.scanner
    }

    /// Stream of EntryLong / Exit signals
    pub fn subscribe_signals(&self) -> broadcast::Receiver<TradeSignal> {
        self.signal_tx.subscribe()
    }

    /// Tier 1: refresh and publish the universe
    pub async fn universe_cycle(&self) {
        let start = Instant::now();
        let universe = self.selector.refresh_universe().await;
        self.scanner.state().set_universe(universe.clone());
        record_latency(LatencyMetric::UniverseCycle, start.elapsed());

        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.publish_universe(&universe).await {
                tracing::warn!(error = %e, "Failed to publish universe");
            }
        }
    }

    /// Tier 2 over the last published universe
    pub async fn activity_cycle(&self) {
        let start = Instant::now();
        let universe = self.scanner.state().universe();
        let (alerts, report) = self.scanner.detect(&universe);
        record_latency(LatencyMetric::ActivityCycle, start.elapsed());
        set_gauge(
            GaugeMetric::WindowTickers,
            self.scanner.store().stats().tickers as f64,
        );
        tracing::info!(
            universe = universe.len(),
            alerts = alerts.len(),
            processed = report.processed,
            skipped = report.skipped,
            "Activity cycle complete"
        );

        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.publish_alerts(&alerts).await {
                tracing::warn!(error = %e, "Failed to publish alerts");
            }
        }
    }

    /// Tier 3 over the working set, then Tier 4 on every ready result
    pub async fn technical_cycle(&self) {
        let start = Instant::now();
        let (indicators, mut report) = self.scanner.analyze(Utc::now()).await;
        let (signals, signal_report) = self.scanner.signals(&indicators);
        report.merge(signal_report);
        record_latency(LatencyMetric::TechnicalCycle, start.elapsed());

        if !report.is_clean() {
            tracing::warn!(failed = report.failed, errors = ?report.errors, "Technical cycle had failures");
        }
        tracing::debug!(
            indicators = indicators.len(),
            signals = signals.len(),
            skipped = report.skipped,
            "Technical cycle complete"
        );

        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.publish_indicators(&indicators).await {
                tracing::warn!(error = %e, "Failed to publish indicators");
            }
        }

        for signal in signals {
            if let Some(publisher) = &self.publisher {
                if let Err(e) = publisher.publish_signal(&signal).await {
                    tracing::warn!(ticker = %signal.ticker, error = %e, "Failed to publish signal");
                }
            }
            if signal.signal_type.is_actionable() {
                tracing::info!(
                    ticker = %signal.ticker,
                    signal = %signal.signal_type,
                    confidence = %signal.confidence,
                    price = %signal.price,
                    "Trade signal"
                );
                // No subscribers is fine
                let _ = self.signal_tx.send(signal);
            }
        }
    }

    /// Start one task per tier; all stop when `shutdown` fires
    pub fn spawn(self: &Arc<Self>, shutdown: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        let secs = |s: u64| Duration::from_secs(s.max(1));

        let universe = {
            let this = Arc::clone(self);
            tokio::spawn(run_periodic(
                "universe",
                secs(self.config.universe_interval_secs),
                shutdown.subscribe(),
                move || {
                    let this = Arc::clone(&this);
                    async move { this.universe_cycle().await }
                },
            ))
        };
        let activity = {
            let this = Arc::clone(self);
            tokio::spawn(run_periodic(
                "activity",
                secs(self.config.activity_interval_secs),
                shutdown.subscribe(),
                move || {
                    let this = Arc::clone(&this);
                    async move { this.activity_cycle().await }
                },
            ))
        };
        let technical = {
            let this = Arc::clone(self);
            tokio::spawn(run_periodic(
                "technical",
                secs(self.config.technical_interval_secs),
                shutdown.subscribe(),
                move || {
                    let this = Arc::clone(&this);
                    async move { this.technical_cycle().await }
                },
            ))
        };

        vec![universe, activity, technical]
    }
}

/// Tick `cycle` every `period`; a cycle in flight at shutdown is dropped
/// and leaves the window store untouched (tiers only read it)
async fn run_periodic<F, Fut>(
    tier: &'static str,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut cycle: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tracing::info!(tier, ?period, "Tier task started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => {
                        tracing::info!(tier, "Cycle cancelled");
                        break;
                    }
                    _ = cycle() => {}
                }
            }
        }
    }
    tracing::info!(tier, "Tier task stopped");
}

//! Tier 2: rule engine over the universe's rolling windows

use super::rules::{ActivityRule, RuleDefaults, RuleId, RuleOutcome};
use super::types::ActivityAlert;
use crate::config::ActivityConfig;
use crate::cycle::CycleReport;
use crate::feed::PriceBar;
use crate::telemetry::{increment_counter, CounterMetric};
use crate::technical::mean_volume;
use crate::universe::Universe;
use crate::window::WindowStore;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Baseline length for the reported volume ratio
const VOLUME_RATIO_PERIOD: usize = 20;

/// Evaluates every enabled rule independently; any match raises an alert
/// that records all matching rules
pub struct ActivityDetector {
    rules: Vec<ActivityRule>,
    defaults: RuleDefaults,
    lookback: usize,
}

impl ActivityDetector {
    pub fn new(config: &ActivityConfig) -> Self {
        Self::with_rules(
            config.rules.clone(),
            RuleDefaults {
                volume_spike_threshold: config.volume_spike_threshold,
                price_change_threshold: config.price_change_threshold,
            },
        )
    }

    pub fn with_rules(rules: Vec<ActivityRule>, defaults: RuleDefaults) -> Self {
        let lookback = rules
            .iter()
            .map(|r| r.lookback())
            .max()
            .unwrap_or(0)
            .max(VOLUME_RATIO_PERIOD + 1);
        Self {
            rules,
            defaults,
            lookback,
        }
    }

    pub fn rules(&self) -> &[ActivityRule] {
        &self.rules
    }

    /// Bars fetched per ticker
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Alert for one ticker's window, if any rule matched
    pub fn evaluate(&self, ticker: &str, bars: &[PriceBar]) -> Option<ActivityAlert> {
        let current = bars.last()?;
        let mut triggered = BTreeSet::new();
        let mut notes = Vec::new();
        let mut skipped: Vec<RuleId> = Vec::new();

        for rule in &self.rules {
            match rule.evaluate(bars, self.defaults) {
                RuleOutcome::Triggered(reason) => {
                    triggered.insert(rule.id());
                    notes.push(format!("{}: {}", rule.id(), reason));
                }
                RuleOutcome::NotTriggered => {}
                RuleOutcome::Skipped(why) => {
                    tracing::trace!(ticker, rule = %rule.id(), why, "Rule skipped");
                    skipped.push(rule.id());
                }
            }
        }

        if triggered.is_empty() {
            return None;
        }
        if !skipped.is_empty() {
            let ids: Vec<&str> = skipped.iter().map(|id| id.as_str()).collect();
            notes.push(format!("skipped: {}", ids.join(", ")));
        }

        Some(ActivityAlert {
            ticker: ticker.to_string(),
            timestamp: current.timestamp,
            volume_ratio: volume_ratio(bars),
            triggered_rules: triggered,
            notes,
        })
    }

    /// Run the rule set over every ticker in the universe
    pub fn detect_anomalies(
        &self,
        universe: &Universe,
        store: &WindowStore,
    ) -> (Vec<ActivityAlert>, CycleReport) {
        let mut report = CycleReport::default();
        let mut alerts = Vec::new();

        for ticker in universe.tickers() {
            let bars = store.get_window(ticker, self.lookback);
            if bars.is_empty() {
                report.skipped += 1;
                continue;
            }
            report.processed += 1;
            if let Some(alert) = self.evaluate(ticker, &bars) {
                tracing::debug!(
                    ticker,
                    rules = ?alert.triggered_rules,
                    volume_ratio = %alert.volume_ratio,
                    "Activity alert"
                );
                alerts.push(alert);
            }
        }

        increment_counter(CounterMetric::AlertsRaised, alerts.len() as u64);
        (alerts, report)
    }
}

fn volume_ratio(bars: &[PriceBar]) -> Decimal {
    let n = bars.len();
    if n < VOLUME_RATIO_PERIOD + 1 {
        return Decimal::ZERO;
    }
    match mean_volume(&bars[n - 1 - VOLUME_RATIO_PERIOD..n - 1]) {
        Some(sma) if !sma.is_zero() => Decimal::from(bars[n - 1].volume) / sma,
        _ => Decimal::ZERO,
    }
}

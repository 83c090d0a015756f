//! Backtest simulator engine

use super::analytics::BacktestMetrics;
use super::book::PositionBook;
use super::replay::BarReplay;
use super::trade::BacktestTrade;
use crate::config::Config;
use crate::pipeline::Scanner;
use crate::signal::TradeSignal;
use crate::universe::{Stock, Universe};
use crate::window::WindowStore;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Complete backtest results
#[derive(Debug, Clone, Default)]
pub struct BacktestReport {
    pub bars: usize,
    pub rejected_bars: usize,
    pub alerts: usize,
    /// EntryLong and Exit signals emitted
    pub signals: Vec<TradeSignal>,
    pub trades: Vec<BacktestTrade>,
    pub metrics: BacktestMetrics,
}

/// Replays bars through the window store and the tier chain
pub struct BacktestSimulator {
    config: Config,
}

impl BacktestSimulator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Every replayed ticker is treated as eligible
    fn universe(replay: &BarReplay) -> Universe {
        let stocks = replay.tickers().into_iter().map(|ticker| Stock {
            ticker,
            price: Decimal::ZERO,
            float_shares: 0,
            volume: 0,
            high: Decimal::ZERO,
            low: Decimal::ZERO,
            close: Decimal::ZERO,
        });
        Universe::from_stocks(stocks, Utc::now())
    }

    pub async fn run(&self, replay: &BarReplay) -> anyhow::Result<BacktestReport> {
        let store = Arc::new(WindowStore::new(
            self.config.window.capacity,
            self.config.window.ordering,
        ));
        let scanner = Scanner::from_config(&self.config, store.clone())?;
        let universe = Self::universe(replay);
        let mut book = PositionBook::new(
            self.config.backtest.position_size,
            self.config.backtest.fee_per_share,
        );
        let mut report = BacktestReport::default();

        for (timestamp, bars) in replay.steps() {
            for bar in bars {
                report.bars += 1;
                if let Err(e) = store.append_bar(bar.clone()) {
                    report.rejected_bars += 1;
                    tracing::warn!(ticker = %bar.ticker, error = %e, "Replay bar rejected");
                }
            }

            let output = scanner.run_cycle(&universe, timestamp).await;
            report.alerts += output.alerts.len();
            if !output.report.is_clean() {
                tracing::warn!(%timestamp, errors = ?output.report.errors, "Replay step had failures");
            }

            // Only tickers with a bar at this step produce fresh signals
            for signal in output
                .signals
                .into_iter()
                .filter(|s| s.timestamp == timestamp && s.signal_type.is_actionable())
            {
                if let Some(trade) = book.apply(&signal) {
                    tracing::debug!(ticker = %trade.ticker, net = %trade.net_pl(), "Trade closed");
                }
                report.signals.push(signal);
            }
        }

        for ticker in book.open_tickers() {
            if let Some(last) = store.latest_bar(&ticker) {
                book.close(&ticker, last.timestamp, last.close);
            }
        }

        report.trades = book.into_trades();
        report.metrics = BacktestMetrics::from_trades(&report.trades);
        tracing::info!(
            bars = report.bars,
            signals = report.signals.len(),
            trades = report.trades.len(),
            net_pl = %report.metrics.net_pl,
            "Backtest finished"
        );
        Ok(report)
    }
}

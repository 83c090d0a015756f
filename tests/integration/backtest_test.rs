//! Capture to Parquet, replay through the tiers, score the trades

use crate::common::{bars, scanner_config, session_start, spike_session};
use chrono::Duration;
use premarket_scanner::backtest::{BacktestSimulator, BarReplay};
use premarket_scanner::data::BarParquetWriter;
use premarket_scanner::feed::PriceBar;
use premarket_scanner::signal::SignalType;
use rust_decimal_macros::dec;
use tempfile::TempDir;

/// Spike session followed by a four-bar recovery above the entry
fn session() -> Vec<PriceBar> {
    let mut session = spike_session("XYZ");
    let recovery = bars(
        "XYZ",
        &[dec!(5.58), dec!(5.70), dec!(5.80), dec!(5.90), dec!(6.00)],
        &[10_000; 5],
    );
    for (i, mut bar) in recovery.into_iter().skip(1).enumerate() {
        bar.timestamp = session_start() + Duration::minutes(21 + i as i64);
        session.push(bar);
    }
    session
}

#[tokio::test]
async fn test_backtest_from_captured_parquet() {
    let dir = TempDir::new().unwrap();
    let bars = session();
    assert_eq!(bars.len(), 25);

    let mut writer = BarParquetWriter::new(dir.path(), 3_600);
    writer.write(&bars, session_start()).unwrap();
    writer.close().unwrap();

    let replay = BarReplay::from_dir(dir.path()).unwrap();
    assert_eq!(replay.len(), 25);

    let report = BacktestSimulator::new(scanner_config())
        .run(&replay)
        .await
        .unwrap();

    assert_eq!(report.bars, 25);
    assert_eq!(report.rejected_bars, 0);
    assert!(report.alerts >= 1);

    let entry = &report.signals[0];
    assert_eq!(entry.signal_type, SignalType::EntryLong);
    assert_eq!(entry.timestamp, bars[20].timestamp);
    assert_eq!(entry.price, dec!(5.58));

    assert!(!report.trades.is_empty());
    let trade = &report.trades[0];
    assert_eq!(trade.entry_price, dec!(5.58));
    assert!(trade.exit_price > trade.entry_price);
    assert!(trade.net_pl() > dec!(0));
    assert_eq!(report.metrics.total_trades, report.trades.len());
}

#[tokio::test]
async fn test_backtest_window_filter_excludes_spike() {
    let replay = BarReplay::from_bars(session()).between(None, Some(session_start() + Duration::minutes(19)));
    assert_eq!(replay.len(), 20);

    let report = BacktestSimulator::new(scanner_config())
        .run(&replay)
        .await
        .unwrap();
    assert_eq!(report.alerts, 0);
    assert!(report.signals.is_empty());
    assert_eq!(report.metrics.total_trades, 0);
}

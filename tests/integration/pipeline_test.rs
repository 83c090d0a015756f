//! Feed frame to trade signal, through every tier

use crate::common::{scanner_config, spike_session, universe};
use premarket_scanner::activity::RuleId;
use premarket_scanner::feed::normalize_frame;
use premarket_scanner::pipeline::Scanner;
use premarket_scanner::signal::SignalType;
use premarket_scanner::window::{OrderingPolicy, WindowStore};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;

/// Polygon-style aggregate frame for the spike session
fn aggregate_frame() -> String {
    let messages: Vec<_> = spike_session("XYZ")
        .into_iter()
        .map(|b| {
            json!({
                "ev": "AM",
                "sym": b.ticker,
                "o": b.open,
                "h": b.high,
                "l": b.low,
                "c": b.close,
                "v": b.volume,
                "s": b.timestamp.timestamp_millis(),
            })
        })
        .collect();
    serde_json::to_string(&messages).unwrap()
}

#[tokio::test]
async fn test_volume_spike_reversal_produces_entry() {
    let frame = normalize_frame(&aggregate_frame());
    assert_eq!(frame.events.len(), 21);
    assert_eq!(frame.rejected, 0);

    let store = Arc::new(WindowStore::new(64, OrderingPolicy::Reject));
    for event in frame.events {
        store.apply(event).unwrap();
    }

    let scanner = Scanner::from_config(&scanner_config(), store.clone()).unwrap();
    let last = store.latest_bar("XYZ").unwrap();
    let output = scanner.run_cycle(&universe(&["XYZ"]), last.timestamp).await;

    assert_eq!(output.alerts.len(), 1);
    let alert = &output.alerts[0];
    assert_eq!(alert.ticker, "XYZ");
    assert!(alert.triggered(RuleId::VolumeVsSma));
    assert_eq!(alert.volume_ratio, dec!(4));

    assert_eq!(output.signals.len(), 1);
    let signal = &output.signals[0];
    assert_eq!(signal.signal_type, SignalType::EntryLong);
    assert_eq!(signal.price, dec!(5.58));
    assert_eq!(signal.timestamp, last.timestamp);
    assert!(signal.confidence > dec!(0.5));
    assert!(signal.confidence <= dec!(1));
}

#[tokio::test]
async fn test_ticker_outside_universe_is_ignored() {
    let store = Arc::new(WindowStore::new(64, OrderingPolicy::Reject));
    for bar in spike_session("XYZ") {
        store.append_bar(bar).unwrap();
    }
    let scanner = Scanner::from_config(&scanner_config(), store.clone()).unwrap();
    let last = store.latest_bar("XYZ").unwrap();

    let output = scanner.run_cycle(&universe(&["ABC"]), last.timestamp).await;
    assert!(output.alerts.is_empty());
    assert!(output.signals.is_empty());
}

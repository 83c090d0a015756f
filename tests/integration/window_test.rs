//! Window store and ingestor behavior

use crate::common::{bars, session_start};
use chrono::Duration;
use premarket_scanner::feed::{MarketEvent, Trade};
use premarket_scanner::window::{BackpressurePolicy, Ingestor, OrderingPolicy, WindowError, WindowStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::mpsc;

fn closes(n: usize) -> Vec<Decimal> {
    (0..n).map(|i| dec!(2.00) + dec!(0.01) * Decimal::from(i)).collect()
}

#[test]
fn test_window_never_exceeds_capacity() {
    let store = WindowStore::new(10, OrderingPolicy::Reject);
    for bar in bars("ABC", &closes(25), &[1_000; 25]) {
        store.append_bar(bar).unwrap();
    }

    assert_eq!(store.len("ABC"), 10);
    let window = store.get_window("ABC", 50);
    assert_eq!(window.len(), 10);
    assert_eq!(window[0].timestamp, session_start() + Duration::minutes(15));
    assert!(window.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn test_out_of_order_bar_rejected_and_window_unchanged() {
    let store = WindowStore::new(10, OrderingPolicy::Reject);
    let session = bars("ABC", &closes(3), &[1_000; 3]);
    store.append_bar(session[0].clone()).unwrap();
    store.append_bar(session[2].clone()).unwrap();

    let err = store.append_bar(session[1].clone()).unwrap_err();
    assert!(matches!(err, WindowError::OutOfOrder { .. }));
    assert_eq!(store.len("ABC"), 2);
    assert_eq!(store.stats().rejections, 1);
}

#[test]
fn test_reorder_policy_sorts_late_bar() {
    let store = WindowStore::new(10, OrderingPolicy::Reorder);
    let session = bars("ABC", &closes(3), &[1_000; 3]);
    store.append_bar(session[0].clone()).unwrap();
    store.append_bar(session[2].clone()).unwrap();
    store.append_bar(session[1].clone()).unwrap();

    let window = store.get_window("ABC", 3);
    assert_eq!(window, session);
}

#[test]
fn test_unknown_ticker_reads_empty() {
    let store = WindowStore::new(10, OrderingPolicy::Reject);
    assert!(store.get_window("NOPE", 5).is_empty());
    assert!(store.latest_bar("NOPE").is_none());
    assert_eq!(store.trade_volume_since("NOPE", session_start()), 0);
}

#[tokio::test]
async fn test_ingestor_preserves_per_ticker_order() {
    let store = Arc::new(WindowStore::new(64, OrderingPolicy::Reject));
    let ingestor = Ingestor::start(store.clone(), 4, 16, BackpressurePolicy::Block);

    let (tx, rx) = mpsc::channel(8);
    let producer = tokio::spawn(async move {
        let first = bars("AAA", &closes(30), &[1_000; 30]);
        let second = bars("BBB", &closes(30), &[2_000; 30]);
        for (a, b) in first.into_iter().zip(second) {
            tx.send(MarketEvent::Bar(a)).await.unwrap();
            tx.send(MarketEvent::Bar(b)).await.unwrap();
        }
        tx.send(MarketEvent::Trade(Trade {
            ticker: "AAA".to_string(),
            timestamp: session_start() + Duration::minutes(29),
            price: dec!(2.29),
            size: 500,
        }))
        .await
        .unwrap();
    });

    ingestor.pump(rx).await;
    producer.await.unwrap();
    ingestor.shutdown().await;

    for ticker in ["AAA", "BBB"] {
        let window = store.get_window(ticker, 64);
        assert_eq!(window.len(), 30);
        assert!(window.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
    assert_eq!(store.stats().rejections, 0);
    assert_eq!(store.trade_volume_since("AAA", session_start()), 500);
}

//! Sharded per-ticker window store

use super::types::{OrderingPolicy, RollingWindow, WindowError, WindowStats};
use crate::feed::{MarketEvent, PriceBar, Quote, Trade};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-ticker rolling windows behind per-ticker locks
///
/// Writers take one ticker's write lock for a single push; readers copy the
/// requested slice out under that ticker's read lock and never hold it while
/// computing.
pub struct WindowStore {
    capacity: usize,
    ordering: OrderingPolicy,
    windows: DashMap<String, Arc<RwLock<RollingWindow>>>,
    appends: AtomicU64,
    rejections: AtomicU64,
}

impl WindowStore {
    pub fn new(capacity: usize, ordering: OrderingPolicy) -> Self {
        Self {
            capacity,
            ordering,
            windows: DashMap::new(),
            appends: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn window(&self, ticker: &str) -> Option<Arc<RwLock<RollingWindow>>> {
        self.windows.get(ticker).map(|w| Arc::clone(w.value()))
    }

    fn window_or_insert(&self, ticker: &str) -> Arc<RwLock<RollingWindow>> {
        if let Some(window) = self.window(ticker) {
            return window;
        }
        Arc::clone(
            self.windows
                .entry(ticker.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(RollingWindow::new(self.capacity))))
                .value(),
        )
    }

    fn record<T>(&self, result: Result<T, WindowError>) -> Result<T, WindowError> {
        match &result {
            Ok(_) => self.appends.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.rejections.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    pub fn append_bar(&self, bar: PriceBar) -> Result<(), WindowError> {
        let window = self.window_or_insert(&bar.ticker);
        let result = window.write().push_bar(bar, self.ordering);
        self.record(result)
    }

    pub fn append_quote(&self, quote: Quote) -> Result<(), WindowError> {
        let window = self.window_or_insert(&quote.ticker);
        let result = window.write().push_quote(quote);
        self.record(result)
    }

    pub fn append_trade(&self, trade: Trade) -> Result<(), WindowError> {
        let window = self.window_or_insert(&trade.ticker);
        let result = window.write().push_trade(trade);
        self.record(result)
    }

    pub fn apply(&self, event: MarketEvent) -> Result<(), WindowError> {
        match event {
            MarketEvent::Bar(bar) => self.append_bar(bar),
            MarketEvent::Quote(quote) => self.append_quote(quote),
            MarketEvent::Trade(trade) => self.append_trade(trade),
        }
    }

    /// Most recent `lookback` bars, oldest first; empty for unknown tickers
    pub fn get_window(&self, ticker: &str, lookback: usize) -> Vec<PriceBar> {
        self.window(ticker)
            .map(|w| w.read().last_bars(lookback))
            .unwrap_or_default()
    }

    pub fn latest_bar(&self, ticker: &str) -> Option<PriceBar> {
        self.window(ticker)
            .and_then(|w| w.read().latest_bar().cloned())
    }

    pub fn latest_quote(&self, ticker: &str) -> Option<Quote> {
        self.window(ticker)
            .and_then(|w| w.read().latest_quote().cloned())
    }

    pub fn trade_volume_since(&self, ticker: &str, since: DateTime<Utc>) -> u64 {
        self.window(ticker)
            .map(|w| w.read().trade_volume_since(since))
            .unwrap_or(0)
    }

    /// Bars held for `ticker`
    pub fn len(&self, ticker: &str) -> usize {
        self.window(ticker).map(|w| w.read().len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Known tickers, sorted
    pub fn tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.windows.iter().map(|e| e.key().clone()).collect();
        tickers.sort();
        tickers
    }

    pub fn stats(&self) -> WindowStats {
        let bars = self.windows.iter().map(|e| e.value().read().len()).sum();
        WindowStats {
            tickers: self.windows.len(),
            bars,
            appends: self.appends.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
        }
    }
}

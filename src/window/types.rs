//! Rolling window types

use crate::feed::{PriceBar, Quote, Trade};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// What to do with a bar older than the newest one held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Refuse it with `WindowError::OutOfOrder`
    #[default]
    Reject,
    /// Insert it at its sorted position
    Reorder,
}

/// Window append failures; the window is left unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("{ticker}: event at {timestamp} is not after last stored {last}")]
    OutOfOrder {
        ticker: String,
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },
    #[error("{ticker}: a bar at {timestamp} is already stored")]
    DuplicateTimestamp {
        ticker: String,
        timestamp: DateTime<Utc>,
    },
    #[error("{ticker}: bar at {timestamp} is older than the oldest retained bar {oldest}")]
    Stale {
        ticker: String,
        timestamp: DateTime<Utc>,
        oldest: DateTime<Utc>,
    },
}

/// Fixed-capacity per-ticker history, ascending by timestamp
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    bars: VecDeque<PriceBar>,
    quotes: VecDeque<Quote>,
    trades: VecDeque<Trade>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            bars: VecDeque::with_capacity(capacity),
            quotes: VecDeque::with_capacity(capacity),
            trades: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn push_bar(&mut self, bar: PriceBar, policy: OrderingPolicy) -> Result<(), WindowError> {
        let Some(last) = self.bars.back() else {
            self.bars.push_back(bar);
            return Ok(());
        };

        if bar.timestamp > last.timestamp {
            if self.bars.len() == self.capacity {
                self.bars.pop_front();
            }
            self.bars.push_back(bar);
            return Ok(());
        }

        match policy {
            OrderingPolicy::Reject => Err(WindowError::OutOfOrder {
                timestamp: bar.timestamp,
                last: last.timestamp,
                ticker: bar.ticker,
            }),
            OrderingPolicy::Reorder => self.insert_sorted(bar),
        }
    }

    fn insert_sorted(&mut self, bar: PriceBar) -> Result<(), WindowError> {
        let idx = self.bars.partition_point(|b| b.timestamp < bar.timestamp);
        if self.bars.get(idx).is_some_and(|b| b.timestamp == bar.timestamp) {
            return Err(WindowError::DuplicateTimestamp {
                ticker: bar.ticker,
                timestamp: bar.timestamp,
            });
        }
        if self.bars.len() == self.capacity {
            if idx == 0 {
                let oldest = self.bars.front().map(|b| b.timestamp).unwrap_or(bar.timestamp);
                return Err(WindowError::Stale {
                    ticker: bar.ticker,
                    timestamp: bar.timestamp,
                    oldest,
                });
            }
            self.bars.pop_front();
            self.bars.insert(idx - 1, bar);
        } else {
            self.bars.insert(idx, bar);
        }
        Ok(())
    }

    /// Quotes may share a timestamp; only strictly older ones are refused
    pub fn push_quote(&mut self, quote: Quote) -> Result<(), WindowError> {
        if let Some(last) = self.quotes.back() {
            if quote.timestamp < last.timestamp {
                return Err(WindowError::OutOfOrder {
                    timestamp: quote.timestamp,
                    last: last.timestamp,
                    ticker: quote.ticker,
                });
            }
        }
        if self.quotes.len() == self.capacity {
            self.quotes.pop_front();
        }
        self.quotes.push_back(quote);
        Ok(())
    }

    pub fn push_trade(&mut self, trade: Trade) -> Result<(), WindowError> {
        if let Some(last) = self.trades.back() {
            if trade.timestamp < last.timestamp {
                return Err(WindowError::OutOfOrder {
                    timestamp: trade.timestamp,
                    last: last.timestamp,
                    ticker: trade.ticker,
                });
            }
        }
        if self.trades.len() == self.capacity {
            self.trades.pop_front();
        }
        self.trades.push_back(trade);
        Ok(())
    }

    /// Copy of the most recent `lookback` bars, oldest first; never padded
    pub fn last_bars(&self, lookback: usize) -> Vec<PriceBar> {
        let skip = self.bars.len().saturating_sub(lookback);
        self.bars.iter().skip(skip).cloned().collect()
    }

    pub fn latest_bar(&self) -> Option<&PriceBar> {
        self.bars.back()
    }

    pub fn latest_quote(&self) -> Option<&Quote> {
        self.quotes.back()
    }

    /// Summed trade size at or after `since`
    pub fn trade_volume_since(&self, since: DateTime<Utc>) -> u64 {
        self.trades
            .iter()
            .rev()
            .take_while(|t| t.timestamp >= since)
            .map(|t| t.size)
            .sum()
    }
}

/// Store-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowStats {
    pub tickers: usize,
    pub bars: usize,
    pub appends: u64,
    pub rejections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn bar(minute: i64) -> PriceBar {
        PriceBar {
            ticker: "XYZ".to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap(),
            open: dec!(5.00),
            high: dec!(5.10),
            low: dec!(4.90),
            close: dec!(5.05),
            volume: 1_000 + minute as u64,
        }
    }

    fn minutes(window: &RollingWindow) -> Vec<u64> {
        window.last_bars(usize::MAX).iter().map(|b| b.volume - 1_000).collect()
    }

    #[test]
    fn test_window_keeps_most_recent_in_order() {
        let mut window = RollingWindow::new(5);
        for m in 0..12 {
            window.push_bar(bar(m), OrderingPolicy::Reject).unwrap();
        }
        assert_eq!(window.len(), 5);
        assert_eq!(minutes(&window), vec![7, 8, 9, 10, 11]);
        assert_eq!(window.last_bars(3).len(), 3);
        assert_eq!(window.last_bars(3)[0].volume, 1_009);
    }

    #[test]
    fn test_short_window_is_not_padded() {
        let mut window = RollingWindow::new(10);
        window.push_bar(bar(0), OrderingPolicy::Reject).unwrap();
        window.push_bar(bar(1), OrderingPolicy::Reject).unwrap();
        assert_eq!(window.last_bars(40).len(), 2);
    }

    #[test]
    fn test_reject_out_of_order_leaves_window_unchanged() {
        let mut window = RollingWindow::new(10);
        window.push_bar(bar(0), OrderingPolicy::Reject).unwrap();
        window.push_bar(bar(2), OrderingPolicy::Reject).unwrap();

        let before = window.last_bars(10);
        let err = window.push_bar(bar(1), OrderingPolicy::Reject).unwrap_err();
        assert!(matches!(err, WindowError::OutOfOrder { .. }));
        let err = window.push_bar(bar(2), OrderingPolicy::Reject).unwrap_err();
        assert!(matches!(err, WindowError::OutOfOrder { .. }));
        assert_eq!(window.last_bars(10), before);
    }

    #[test]
    fn test_reorder_inserts_sorted() {
        let mut window = RollingWindow::new(10);
        for m in [0, 2, 4] {
            window.push_bar(bar(m), OrderingPolicy::Reorder).unwrap();
        }
        window.push_bar(bar(3), OrderingPolicy::Reorder).unwrap();
        window.push_bar(bar(1), OrderingPolicy::Reorder).unwrap();
        assert_eq!(minutes(&window), vec![0, 1, 2, 3, 4]);

        let err = window.push_bar(bar(3), OrderingPolicy::Reorder).unwrap_err();
        assert!(matches!(err, WindowError::DuplicateTimestamp { .. }));
    }

    #[test]
    fn test_reorder_into_full_window() {
        let mut window = RollingWindow::new(3);
        for m in [2, 4, 6] {
            window.push_bar(bar(m), OrderingPolicy::Reorder).unwrap();
        }
        let err = window.push_bar(bar(1), OrderingPolicy::Reorder).unwrap_err();
        assert!(matches!(err, WindowError::Stale { .. }));

        window.push_bar(bar(5), OrderingPolicy::Reorder).unwrap();
        assert_eq!(minutes(&window), vec![4, 5, 6]);
    }

    #[test]
    fn test_trades_share_timestamps() {
        let mut window = RollingWindow::new(10);
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let trade = |size| Trade {
            ticker: "XYZ".to_string(),
            timestamp: ts,
            price: dec!(5.00),
            size,
        };
        window.push_trade(trade(100)).unwrap();
        window.push_trade(trade(250)).unwrap();
        assert_eq!(window.trade_volume_since(ts), 350);

        let older = Trade {
            timestamp: ts - chrono::Duration::seconds(1),
            ..trade(10)
        };
        assert!(window.push_trade(older).is_err());
        assert_eq!(window.trade_volume_since(ts + chrono::Duration::seconds(1)), 0);
    }
}

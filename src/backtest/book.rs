//! Pairs EntryLong / Exit signals into trades per ticker

use super::trade::{BacktestTrade, Direction};
use crate::signal::{SignalType, TradeSignal};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// An open long
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPosition {
    pub ticker: String,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub size: Decimal,
    pub entry_confidence: Decimal,
}

/// At most one open position per ticker
pub struct PositionBook {
    size: Decimal,
    fee_per_share: Decimal,
    open: HashMap<String, OpenPosition>,
    closed: Vec<BacktestTrade>,
}

impl PositionBook {
    pub fn new(size: Decimal, fee_per_share: Decimal) -> Self {
        Self {
            size,
            fee_per_share,
            open: HashMap::new(),
            closed: Vec::new(),
        }
    }

    /// Apply a signal; returns the trade it closed, if any
    ///
    /// EntryLong while open and Exit while flat are ignored.
    pub fn apply(&mut self, signal: &TradeSignal) -> Option<BacktestTrade> {
        match signal.signal_type {
            SignalType::EntryLong => {
                if !self.open.contains_key(&signal.ticker) {
                    self.open.insert(
                        signal.ticker.clone(),
                        OpenPosition {
                            ticker: signal.ticker.clone(),
                            entry_time: signal.timestamp,
                            entry_price: signal.price,
                            size: self.size,
                            entry_confidence: signal.confidence,
                        },
                    );
                }
                None
            }
            SignalType::Exit => self.close(&signal.ticker, signal.timestamp, signal.price),
            SignalType::Hold => None,
        }
    }

    pub fn close(
        &mut self,
        ticker: &str,
        time: DateTime<Utc>,
        price: Decimal,
    ) -> Option<BacktestTrade> {
        let position = self.open.remove(ticker)?;
        let trade = BacktestTrade {
            id: Uuid::new_v4(),
            ticker: position.ticker,
            direction: Direction::Long,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_time: time,
            exit_price: price,
            size: position.size,
            fees: self.fee_per_share * position.size * Decimal::TWO,
            entry_confidence: position.entry_confidence,
        };
        self.closed.push(trade.clone());
        Some(trade)
    }

    pub fn is_open(&self, ticker: &str) -> bool {
        self.open.contains_key(ticker)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Tickers with an open position, sorted
    pub fn open_tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.open.keys().cloned().collect();
        tickers.sort();
        tickers
    }

    pub fn closed(&self) -> &[BacktestTrade] {
        &self.closed
    }

    pub fn into_trades(self) -> Vec<BacktestTrade> {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn signal(minute: i64, signal_type: SignalType, price: Decimal) -> TradeSignal {
        TradeSignal {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap() + Duration::minutes(minute),
            ticker: "XYZ".to_string(),
            signal_type,
            confidence: dec!(0.7),
            price,
        }
    }

    #[test]
    fn test_pairs_entry_and_exit() {
        let mut book = PositionBook::new(dec!(100), dec!(0.005));
        assert!(book.apply(&signal(0, SignalType::EntryLong, dec!(5.00))).is_none());
        assert!(book.is_open("XYZ"));

        let trade = book.apply(&signal(5, SignalType::Exit, dec!(5.30))).unwrap();
        assert_eq!(trade.entry_price, dec!(5.00));
        assert_eq!(trade.exit_price, dec!(5.30));
        assert_eq!(trade.fees, dec!(1.000));
        assert_eq!(trade.net_pl(), dec!(29.000));
        assert_eq!(book.open_count(), 0);
    }

    #[test]
    fn test_ignores_duplicate_entry_and_orphan_exit() {
        let mut book = PositionBook::new(dec!(100), dec!(0));
        assert!(book.apply(&signal(0, SignalType::Exit, dec!(5.00))).is_none());

        book.apply(&signal(1, SignalType::EntryLong, dec!(5.00)));
        book.apply(&signal(2, SignalType::EntryLong, dec!(6.00)));
        book.apply(&signal(3, SignalType::Hold, dec!(6.50)));
        let trade = book.apply(&signal(4, SignalType::Exit, dec!(5.50))).unwrap();

        assert_eq!(trade.entry_price, dec!(5.00));
        assert!(book.apply(&signal(5, SignalType::Exit, dec!(5.60))).is_none());
        assert_eq!(book.closed().len(), 1);
    }
}

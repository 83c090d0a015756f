//! Tier 1 types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full-market snapshot row for one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub ticker: String,
    pub price: Decimal,
    pub float_shares: u64,
    pub volume: u64,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// The eligible symbol set published by the last refresh
///
/// Replaced wholesale on every successful refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Universe {
    pub stocks: BTreeMap<String, Stock>,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Set when the last refresh failed and this snapshot was retained
    pub degraded: bool,
}

impl Universe {
    pub fn from_stocks(stocks: impl IntoIterator<Item = Stock>, refreshed_at: DateTime<Utc>) -> Self {
        Self {
            stocks: stocks.into_iter().map(|s| (s.ticker.clone(), s)).collect(),
            refreshed_at: Some(refreshed_at),
            degraded: false,
        }
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.stocks.keys().map(String::as_str)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.stocks.contains_key(ticker)
    }

    pub fn get(&self, ticker: &str) -> Option<&Stock> {
        self.stocks.get(ticker)
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }
}

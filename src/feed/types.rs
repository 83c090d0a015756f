//! Market data event types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One aggregate bar (typically one minute) for a ticker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Ticker symbol (upper case)
    pub ticker: String,
    /// Bar start time
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Shares traded during the bar
    pub volume: u64,
}

impl PriceBar {
    /// Typical price (high + low + close) / 3
    pub fn typical_price(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }
}

/// Top-of-book quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub bid_price: Decimal,
    pub bid_size: u64,
    pub ask_price: Decimal,
    pub ask_size: u64,
}

impl Quote {
    /// Absolute bid/ask spread
    pub fn spread(&self) -> Decimal {
        self.ask_price - self.bid_price
    }

    /// Midpoint between bid and ask
    pub fn mid(&self) -> Decimal {
        (self.bid_price + self.ask_price) / Decimal::TWO
    }
}

/// A single print
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub size: u64,
}

/// Normalized market event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    Bar(PriceBar),
    Quote(Quote),
    Trade(Trade),
}

impl MarketEvent {
    /// Ticker the event belongs to
    pub fn ticker(&self) -> &str {
        match self {
            MarketEvent::Bar(bar) => &bar.ticker,
            MarketEvent::Quote(quote) => &quote.ticker,
            MarketEvent::Trade(trade) => &trade.ticker,
        }
    }

    /// Event timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MarketEvent::Bar(bar) => bar.timestamp,
            MarketEvent::Quote(quote) => quote.timestamp,
            MarketEvent::Trade(trade) => trade.timestamp,
        }
    }

    /// Short event kind label, used for logging and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            MarketEvent::Bar(_) => "bar",
            MarketEvent::Quote(_) => "quote",
            MarketEvent::Trade(_) => "trade",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar() -> PriceBar {
        PriceBar {
            ticker: "XYZ".to_string(),
            timestamp: Utc::now(),
            open: dec!(5.00),
            high: dec!(5.30),
            low: dec!(4.90),
            close: dec!(5.10),
            volume: 12_000,
        }
    }

    #[test]
    fn test_typical_price() {
        assert_eq!(bar().typical_price(), dec!(5.10));
    }

    #[test]
    fn test_quote_spread_and_mid() {
        let quote = Quote {
            ticker: "XYZ".to_string(),
            timestamp: Utc::now(),
            bid_price: dec!(5.10),
            bid_size: 300,
            ask_price: dec!(5.14),
            ask_size: 500,
        };
        assert_eq!(quote.spread(), dec!(0.04));
        assert_eq!(quote.mid(), dec!(5.12));
    }

    #[test]
    fn test_event_accessors() {
        let bar = bar();
        let ts = bar.timestamp;
        let event = MarketEvent::Bar(bar);
        assert_eq!(event.ticker(), "XYZ");
        assert_eq!(event.timestamp(), ts);
        assert_eq!(event.kind(), "bar");
    }

    #[test]
    fn test_event_serde_round_trip() {
        let event = MarketEvent::Bar(bar());
        let json = serde_json::to_string(&event).unwrap();
        let back: MarketEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}

//! Tier 4 signal types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signal state for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalType {
    Hold,
    EntryLong,
    Exit,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "Hold",
            Self::EntryLong => "EntryLong",
            Self::Exit => "Exit",
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::Hold)
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An emitted trade signal; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Timestamp of the bar the indicators were computed at
    pub timestamp: DateTime<Utc>,
    pub ticker: String,
    pub signal_type: SignalType,
    /// Always within [0, 1]
    pub confidence: Decimal,
    /// Latest close at signal time
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("Indicators for {ticker} are not ready")]
    NotReady { ticker: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trade_signal_serde_round_trip() {
        let signal = TradeSignal {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 9, 20, 0).unwrap(),
            ticker: "XYZ".to_string(),
            signal_type: SignalType::EntryLong,
            confidence: dec!(0.6128),
            price: dec!(5.58),
        };
        let json = serde_json::to_string(&signal).unwrap();
        let back: TradeSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signal);
    }

    #[test]
    fn test_signal_type_display() {
        assert_eq!(SignalType::EntryLong.to_string(), "EntryLong");
        assert!(SignalType::Exit.is_actionable());
        assert!(!SignalType::Hold.is_actionable());
    }
}

//! Backtest trades; P/L and duration are derived, never stored

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

/// A closed round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub id: Uuid,
    pub ticker: String,
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_time: DateTime<Utc>,
    pub exit_price: Decimal,
    pub size: Decimal,
    /// Total commission for both legs
    pub fees: Decimal,
    /// Signal confidence at entry
    pub entry_confidence: Decimal,
}

impl BacktestTrade {
    pub fn gross_pl(&self) -> Decimal {
        match self.direction {
            Direction::Long => (self.exit_price - self.entry_price) * self.size,
            Direction::Short => (self.entry_price - self.exit_price) * self.size,
        }
    }

    pub fn net_pl(&self) -> Decimal {
        self.gross_pl() - self.fees
    }

    pub fn duration(&self) -> Duration {
        self.exit_time - self.entry_time
    }

    pub fn is_win(&self) -> bool {
        self.net_pl() > Decimal::ZERO
    }
}

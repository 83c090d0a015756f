//! Tier 3 indicator types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// MACD state at the latest bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdReading {
    pub value: Decimal,
    pub signal: Decimal,
    pub histogram: Decimal,
    pub crossover_up: bool,
    pub crossover_down: bool,
}

/// Stochastic %K/%D for one lookback period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StochasticReading {
    pub period: usize,
    pub k: Decimal,
    pub d: Decimal,
}

/// Named bar patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternTag {
    HigherLows,
    OpeningRangeBreakout,
    NewSessionHigh,
}

/// Indicator snapshot for one ticker
///
/// When `ready` is false the numeric fields are zero/default and must not be
/// consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub ticker: String,
    /// Timestamp of the latest bar used
    pub as_of: DateTime<Utc>,
    pub close: Decimal,
    pub ready: bool,
    pub macd: MacdReading,
    /// One reading per configured period, shortest (fastest) first
    pub stochastic: Vec<StochasticReading>,
    pub rsi: Decimal,
    pub momentum_score: Decimal,
    pub patterns: Vec<PatternTag>,
}

impl TechnicalIndicators {
    /// Placeholder for a ticker without enough history
    pub fn not_ready(ticker: impl Into<String>, as_of: DateTime<Utc>, close: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            as_of,
            close,
            ready: false,
            macd: MacdReading::default(),
            stochastic: Vec::new(),
            rsi: Decimal::ZERO,
            momentum_score: Decimal::ZERO,
            patterns: Vec::new(),
        }
    }

    /// Reading for the shortest configured period
    pub fn fastest_stochastic(&self) -> Option<&StochasticReading> {
        self.stochastic.iter().min_by_key(|s| s.period)
    }
}

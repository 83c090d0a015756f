//! Backtesting module
//!
//! Replays captured bars through the tiers and pairs the resulting signals
//! into trades.

mod analytics;
mod book;
mod replay;
mod simulator;
mod trade;

pub use analytics::BacktestMetrics;
pub use book::{OpenPosition, PositionBook};
pub use replay::BarReplay;
pub use simulator::{BacktestReport, BacktestSimulator};
pub use trade::{BacktestTrade, Direction};

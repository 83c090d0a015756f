//! Tier 3: technical analysis
//!
//! MACD, multi-period stochastic, RSI, momentum score and pattern flags for
//! the tickers in the active working set.

mod active;
mod analyzer;
mod macd;
mod math;
mod momentum;
mod patterns;
mod rsi;
mod stochastic;
mod types;

pub use active::ActiveSet;
pub use analyzer::TechnicalAnalyzer;
pub use macd::{compute_macd, MacdParams};
pub use math::{clamp_unit, ema_series, mean_volume, sma};
pub use momentum::MomentumScorer;
pub use patterns::{detector_for, HigherLows, NewSessionHigh, OpeningRangeBreakout, PatternDetector};
pub use rsi::rsi;
pub use stochastic::{percent_k, stochastic};
pub use types::{MacdReading, PatternTag, StochasticReading, TechnicalIndicators};

#[cfg(test)]
pub(crate) fn bars_with_volumes(
    closes: &[rust_decimal::Decimal],
    volumes: &[u64],
) -> Vec<crate::feed::PriceBar> {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
    let mut prev = closes.first().copied().unwrap_or_default();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (close, volume))| {
            let open = prev;
            prev = *close;
            crate::feed::PriceBar {
                ticker: "XYZ".to_string(),
                timestamp: start + Duration::minutes(i as i64),
                open,
                high: open.max(*close) + dec!(0.02),
                low: open.min(*close) - dec!(0.02),
                close: *close,
                volume: *volume,
            }
        })
        .collect()
}

/// Bars that open at the previous close and wick 0.02 either side
#[cfg(test)]
pub(crate) fn test_bars(closes: &[rust_decimal::Decimal], volume: u64) -> Vec<crate::feed::PriceBar> {
    bars_with_volumes(closes, &vec![volume; closes.len()])
}

//! Stochastic oscillator

use super::types::StochasticReading;
use crate::feed::PriceBar;
use rust_decimal::Decimal;

/// %D smoothing length
pub const D_PERIOD: usize = 3;

/// %K of the latest bar over the last `period` bars; 50 when the range is flat
pub fn percent_k(bars: &[PriceBar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let window = &bars[bars.len() - period..];
    let high = window.iter().map(|b| b.high).max()?;
    let low = window.iter().map(|b| b.low).min()?;
    let close = window.last()?.close;

    if high == low {
        return Some(Decimal::from(50));
    }
    Some((close - low) / (high - low) * Decimal::ONE_HUNDRED)
}

/// %K and %D (SMA of the last three %K values); needs `period + 2` bars
pub fn stochastic(bars: &[PriceBar], period: usize) -> Option<StochasticReading> {
    if bars.len() < period + D_PERIOD - 1 {
        return None;
    }
    let n = bars.len();
    let mut ks = Vec::with_capacity(D_PERIOD);
    for end in (n + 1 - D_PERIOD)..=n {
        ks.push(percent_k(&bars[..end], period)?);
    }
    let k = *ks.last()?;
    let d = ks.iter().copied().sum::<Decimal>() / Decimal::from(D_PERIOD);
    Some(StochasticReading { period, k, d })
}

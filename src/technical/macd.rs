//! MACD line, signal line and crossover detection

use super::math::ema_series;
use super::types::MacdReading;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// MACD periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl MacdParams {
    /// 12/26/9
    pub fn standard() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }

    /// 5/13/8
    pub fn short_form() -> Self {
        Self {
            fast: 5,
            slow: 13,
            signal: 8,
        }
    }

    /// Closes needed for a reading with a previous signal value to compare
    pub fn lookback(&self) -> usize {
        self.slow + self.signal
    }
}

/// MACD over `closes` (oldest first); `None` until `lookback` closes exist
///
/// A crossover is a sign change of `MACD - signal` between the previous and
/// the latest close: up when it goes from <= 0 to > 0, down from >= 0 to < 0.
pub fn compute_macd(closes: &[Decimal], params: MacdParams) -> Option<MacdReading> {
    if closes.len() < params.lookback() || params.fast >= params.slow {
        return None;
    }

    let fast = ema_series(closes, params.fast);
    let slow = ema_series(closes, params.slow);
    let offset = params.slow - params.fast;
    let line: Vec<Decimal> = slow
        .iter()
        .enumerate()
        .map(|(i, s)| fast[i + offset] - s)
        .collect();

    let signal = ema_series(&line, params.signal);
    if signal.len() < 2 {
        return None;
    }

    let value = line[line.len() - 1];
    let prev_value = line[line.len() - 2];
    let signal_now = signal[signal.len() - 1];
    let signal_prev = signal[signal.len() - 2];

    let prev_diff = prev_value - signal_prev;
    let diff = value - signal_now;

    Some(MacdReading {
        value,
        signal: signal_now,
        histogram: diff,
        crossover_up: prev_diff <= Decimal::ZERO && diff > Decimal::ZERO,
        crossover_down: prev_diff >= Decimal::ZERO && diff < Decimal::ZERO,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// 40 falling closes then 20 rising ones
    fn v_shape() -> Vec<Decimal> {
        let down = (0..40).map(|i| dec!(20.00) - dec!(0.10) * Decimal::from(i));
        let up = (1..=20).map(|i| dec!(16.10) + dec!(0.10) * Decimal::from(i));
        down.chain(up).collect()
    }

    fn crossings(closes: &[Decimal], params: MacdParams) -> (Vec<usize>, Vec<usize>) {
        let mut ups = Vec::new();
        let mut downs = Vec::new();
        for n in params.lookback()..=closes.len() {
            let reading = compute_macd(&closes[..n], params).unwrap();
            if reading.crossover_up {
                ups.push(n);
            }
            if reading.crossover_down {
                downs.push(n);
            }
        }
        (ups, downs)
    }

    #[test]
    fn test_crossover_up_only_at_turn() {
        let closes = v_shape();
        for params in [MacdParams::standard(), MacdParams::short_form()] {
            let (ups, downs) = crossings(&closes, params);
            assert_eq!(ups, vec![41], "{params:?}");
            assert!(downs.is_empty(), "{params:?}");
        }
    }

    #[test]
    fn test_crossover_down_mirrors() {
        let up = (0..40).map(|i| dec!(10.00) + dec!(0.10) * Decimal::from(i));
        let down = (1..=20).map(|i| dec!(13.90) - dec!(0.10) * Decimal::from(i));
        let closes: Vec<Decimal> = up.chain(down).collect();

        let (ups, downs) = crossings(&closes, MacdParams::standard());
        assert!(ups.is_empty());
        assert_eq!(downs, vec![41]);
    }

    #[test]
    fn test_not_ready_below_lookback() {
        let closes = vec![dec!(5); 34];
        assert!(compute_macd(&closes, MacdParams::standard()).is_none());
        let closes = vec![dec!(5); 35];
        let reading = compute_macd(&closes, MacdParams::standard()).unwrap();
        assert!(reading.value.abs() < dec!(0.000000001));
    }

    #[test]
    fn test_presets() {
        assert_eq!(MacdParams::standard().lookback(), 35);
        assert_eq!(MacdParams::short_form().lookback(), 21);
    }
}

//! Moving averages and small numeric helpers

use crate::feed::PriceBar;
use rust_decimal::Decimal;

/// Arithmetic mean; `None` for an empty slice
pub fn sma(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().copied().sum();
    Some(sum / Decimal::from(values.len()))
}

/// Mean bar volume
pub fn mean_volume(bars: &[PriceBar]) -> Option<Decimal> {
    if bars.is_empty() {
        return None;
    }
    let sum: u64 = bars.iter().map(|b| b.volume).sum();
    Some(Decimal::from(sum) / Decimal::from(bars.len()))
}

/// EMA seeded with the SMA of the first `period` values
///
/// Element `i` of the result is the EMA at `values[i + period - 1]`; the
/// result is empty when there are fewer than `period` values.
pub fn ema_series(values: &[Decimal], period: usize) -> Vec<Decimal> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let alpha = Decimal::TWO / Decimal::from(period + 1);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut ema = values[..period].iter().copied().sum::<Decimal>() / Decimal::from(period);
    out.push(ema);
    for value in &values[period..] {
        ema = alpha * value + (Decimal::ONE - alpha) * ema;
        out.push(ema);
    }
    out
}

/// Clamp into [0, 1]
pub fn clamp_unit(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sma() {
        assert_eq!(sma(&[dec!(1), dec!(2), dec!(3), dec!(6)]), Some(dec!(3)));
        assert_eq!(sma(&[]), None);
    }

    #[test]
    fn test_ema_series_seed_and_update() {
        let values = [dec!(2), dec!(4), dec!(6), dec!(8)];
        let ema = ema_series(&values, 3);
        // seed = 4, alpha = 0.5, next = 0.5 * 8 + 0.5 * 4
        assert_eq!(ema, vec![dec!(4), dec!(6)]);
        assert!(ema_series(&values, 5).is_empty());
    }

    #[test]
    fn test_ema_of_constant_is_constant() {
        let values = vec![dec!(7.25); 30];
        let ema = ema_series(&values, 12);
        assert_eq!(ema.len(), 19);
        assert!(ema.iter().all(|v| (*v - dec!(7.25)).abs() < dec!(0.000000001)));
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(dec!(-0.2)), dec!(0));
        assert_eq!(clamp_unit(dec!(0.4)), dec!(0.4));
        assert_eq!(clamp_unit(dec!(1.7)), dec!(1));
    }
}

//! Momentum score: price rate of change blended with volume trend

use super::math::{clamp_unit, mean_volume};
use crate::config::MomentumConfig;
use crate::feed::PriceBar;
use rust_decimal::Decimal;

/// Bounded [0, 1] momentum score
///
/// Price component: `0.5 + roc / (2 * roc_scale)`, so flat is 0.5 and a move of
/// `roc_scale` or more saturates. Volume component: recent/baseline mean
/// volume ratio mapped so 1x is 0 and `volume_ratio_cap` saturates. Both
/// components are non-decreasing in their input, and so is the blend.
#[derive(Debug, Clone)]
pub struct MomentumScorer {
    config: MomentumConfig,
}

impl MomentumScorer {
    pub fn new(config: MomentumConfig) -> Self {
        Self { config }
    }

    pub fn lookback(&self) -> usize {
        self.config.lookback()
    }

    /// Score for the latest bar; `None` until `lookback` bars exist
    pub fn score(&self, bars: &[PriceBar]) -> Option<Decimal> {
        let c = &self.config;
        let n = bars.len();
        if n < self.lookback() {
            return None;
        }

        let current = bars[n - 1].close;
        let past = bars[n - 1 - c.roc_period].close;
        if past.is_zero() {
            return None;
        }
        let roc = (current - past) / past;
        let price_component = clamp_unit(Decimal::new(5, 1) + roc / (Decimal::TWO * c.roc_scale));

        let recent = mean_volume(&bars[n - c.recent_volume_bars..])?;
        let baseline_start = n - c.recent_volume_bars - c.baseline_volume_bars;
        let baseline = mean_volume(&bars[baseline_start..n - c.recent_volume_bars])?;
        let volume_component = if baseline.is_zero() {
            if recent.is_zero() {
                Decimal::ZERO
            } else {
                Decimal::ONE
            }
        } else {
            let ratio = recent / baseline;
            clamp_unit((ratio - Decimal::ONE) / (c.volume_ratio_cap - Decimal::ONE))
        };

        Some(c.roc_weight * price_component + c.volume_weight * volume_component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::technical::{bars_with_volumes, test_bars};
    use rust_decimal_macros::dec;

    fn scorer() -> MomentumScorer {
        MomentumScorer::new(MomentumConfig::default())
    }

    #[test]
    fn test_flat_market_scores_price_midpoint_only() {
        let bars = test_bars(&[dec!(4.00); 13], 10_000);
        assert_eq!(scorer().score(&bars), Some(dec!(0.3)));
    }

    #[test]
    fn test_strong_move_on_volume_saturates() {
        let mut closes = vec![dec!(4.00); 13];
        closes[12] = dec!(4.40);
        let mut volumes = vec![10_000u64; 13];
        volumes[10..].fill(30_000);
        let bars = bars_with_volumes(&closes, &volumes);
        assert_eq!(scorer().score(&bars), Some(dec!(1)));
    }

    #[test]
    fn test_score_is_monotonic_in_price() {
        let mut last = Decimal::ZERO;
        for step in 0..10 {
            let mut closes = vec![dec!(4.00); 13];
            closes[12] = dec!(3.90) + dec!(0.03) * Decimal::from(step);
            let score = scorer().score(&test_bars(&closes, 10_000)).unwrap();
            assert!(score >= last);
            assert!(score >= dec!(0) && score <= dec!(1));
            last = score;
        }
    }

    #[test]
    fn test_not_ready() {
        let bars = test_bars(&[dec!(4.00); 12], 10_000);
        assert!(scorer().score(&bars).is_none());
    }
}

//! Tier 2 rule kinds and their evaluation

use crate::config::{non_zero, positive, ConfigError};
use crate::feed::PriceBar;
use crate::technical::{mean_volume, percent_k};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable rule identifiers, as written in config and alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleId {
    #[serde(rename = "VolumeVsSMA")]
    VolumeVsSma,
    VolumeStepUp,
    VolumeBurst3Bar,
    AbsoluteVolumeFloor,
    StochasticJump,
    PriceChange,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::VolumeVsSma => "VolumeVsSMA",
            RuleId::VolumeStepUp => "VolumeStepUp",
            RuleId::VolumeBurst3Bar => "VolumeBurst3Bar",
            RuleId::AbsoluteVolumeFloor => "AbsoluteVolumeFloor",
            RuleId::StochasticJump => "StochasticJump",
            RuleId::PriceChange => "PriceChange",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BURST_BARS: usize = 3;

/// A configured rule with its typed parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule")]
pub enum ActivityRule {
    /// `volume >= multiplier x SMA(volume, period)` over the preceding bars
    #[serde(rename = "VolumeVsSMA")]
    VolumeVsSma {
        /// Falls back to `activity.volume_spike_threshold`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        multiplier: Option<Decimal>,
        #[serde(default = "default_sma_period")]
        period: usize,
    },
    /// `volume >= multiplier x previous bar volume`
    VolumeStepUp {
        #[serde(default = "default_step_multiplier")]
        multiplier: Decimal,
    },
    /// Latest 3-bar volume sum vs the mean 3-bar sum of the preceding bars
    VolumeBurst3Bar {
        #[serde(default = "default_burst_multiplier")]
        multiplier: Decimal,
        #[serde(default = "default_burst_baseline")]
        baseline_bars: usize,
    },
    /// `volume >= threshold`
    AbsoluteVolumeFloor {
        #[serde(default = "default_volume_floor")]
        threshold: u64,
    },
    /// Multi-period stochastic %K jump
    StochasticJump {
        #[serde(default = "default_jump_periods")]
        periods: Vec<usize>,
        #[serde(default = "default_oversold")]
        oversold: Decimal,
        #[serde(default = "default_single_rise")]
        single_rise: Decimal,
        #[serde(default = "default_all_rise")]
        all_rise: Decimal,
        #[serde(default = "default_volume_floor")]
        min_volume: u64,
    },
    /// `|close - prev close| / prev close >= threshold`
    PriceChange {
        /// Falls back to `activity.price_change_threshold`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<Decimal>,
    },
}

fn default_sma_period() -> usize {
    20
}
fn default_step_multiplier() -> Decimal {
    Decimal::TWO
}
fn default_burst_multiplier() -> Decimal {
    Decimal::from(3)
}
fn default_burst_baseline() -> usize {
    20
}
fn default_volume_floor() -> u64 {
    20_000
}
fn default_jump_periods() -> Vec<usize> {
    vec![9, 14, 40]
}
fn default_oversold() -> Decimal {
    Decimal::from(20)
}
fn default_single_rise() -> Decimal {
    Decimal::TEN
}
fn default_all_rise() -> Decimal {
    Decimal::from(20)
}

/// Every built-in rule with default parameters
pub fn default_rules() -> Vec<ActivityRule> {
    vec![
        ActivityRule::VolumeVsSma {
            multiplier: None,
            period: default_sma_period(),
        },
        ActivityRule::VolumeStepUp {
            multiplier: default_step_multiplier(),
        },
        ActivityRule::VolumeBurst3Bar {
            multiplier: default_burst_multiplier(),
            baseline_bars: default_burst_baseline(),
        },
        ActivityRule::AbsoluteVolumeFloor {
            threshold: default_volume_floor(),
        },
        ActivityRule::StochasticJump {
            periods: default_jump_periods(),
            oversold: default_oversold(),
            single_rise: default_single_rise(),
            all_rise: default_all_rise(),
            min_volume: default_volume_floor(),
        },
        ActivityRule::PriceChange { threshold: None },
    ]
}

/// Host-level fallbacks for rules that leave their threshold unset
#[derive(Debug, Clone, Copy)]
pub struct RuleDefaults {
    pub volume_spike_threshold: Decimal,
    pub price_change_threshold: Decimal,
}

/// Result of one rule against one ticker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Matched, with a short reason
    Triggered(String),
    NotTriggered,
    /// Not enough history or a degenerate baseline; not a negative result
    Skipped(&'static str),
}

impl ActivityRule {
    pub fn id(&self) -> RuleId {
        match self {
            ActivityRule::VolumeVsSma { .. } => RuleId::VolumeVsSma,
            ActivityRule::VolumeStepUp { .. } => RuleId::VolumeStepUp,
            ActivityRule::VolumeBurst3Bar { .. } => RuleId::VolumeBurst3Bar,
            ActivityRule::AbsoluteVolumeFloor { .. } => RuleId::AbsoluteVolumeFloor,
            ActivityRule::StochasticJump { .. } => RuleId::StochasticJump,
            ActivityRule::PriceChange { .. } => RuleId::PriceChange,
        }
    }

    /// Bars (current included) the rule needs to evaluate
    pub fn lookback(&self) -> usize {
        match self {
            ActivityRule::VolumeVsSma { period, .. } => period + 1,
            ActivityRule::VolumeStepUp { .. } => 2,
            ActivityRule::VolumeBurst3Bar { baseline_bars, .. } => baseline_bars + BURST_BARS,
            ActivityRule::AbsoluteVolumeFloor { .. } => 1,
            ActivityRule::StochasticJump { periods, .. } => {
                periods.iter().max().map(|p| p + 1).unwrap_or(1)
            }
            ActivityRule::PriceChange { .. } => 2,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let field = |name: &str| format!("activity.rules.{}.{}", self.id(), name);
        match self {
            ActivityRule::VolumeVsSma { multiplier, period } => {
                if let Some(m) = multiplier {
                    positive(&field("multiplier"), *m)?;
                }
                non_zero(&field("period"), *period as u64)
            }
            ActivityRule::VolumeStepUp { multiplier } => positive(&field("multiplier"), *multiplier),
            ActivityRule::VolumeBurst3Bar {
                multiplier,
                baseline_bars,
            } => {
                positive(&field("multiplier"), *multiplier)?;
                if *baseline_bars < BURST_BARS {
                    return Err(ConfigError::Zero {
                        field: field("baseline_bars (needs at least 3)"),
                    });
                }
                Ok(())
            }
            ActivityRule::AbsoluteVolumeFloor { threshold } => {
                non_zero(&field("threshold"), *threshold)
            }
            ActivityRule::StochasticJump {
                periods,
                single_rise,
                all_rise,
                ..
            } => {
                if periods.is_empty() || periods.contains(&0) {
                    return Err(ConfigError::Zero {
                        field: field("periods"),
                    });
                }
                positive(&field("single_rise"), *single_rise)?;
                positive(&field("all_rise"), *all_rise)
            }
            ActivityRule::PriceChange { threshold } => match threshold {
                Some(t) => positive(&field("threshold"), *t),
                None => Ok(()),
            },
        }
    }

    /// Evaluate against `bars` (oldest first, last = current bar)
    pub fn evaluate(&self, bars: &[PriceBar], defaults: RuleDefaults) -> RuleOutcome {
        if bars.len() < self.lookback() {
            return RuleOutcome::Skipped("insufficient history");
        }
        let n = bars.len();
        let current = &bars[n - 1];
        let volume = Decimal::from(current.volume);

        match self {
            ActivityRule::VolumeVsSma { multiplier, period } => {
                let k = multiplier.unwrap_or(defaults.volume_spike_threshold);
                let Some(sma) = mean_volume(&bars[n - 1 - period..n - 1]) else {
                    return RuleOutcome::Skipped("insufficient history");
                };
                if sma.is_zero() {
                    return RuleOutcome::Skipped("zero volume baseline");
                }
                if volume >= k * sma {
                    RuleOutcome::Triggered(format!(
                        "volume {} is {:.2}x SMA{}",
                        current.volume,
                        volume / sma,
                        period
                    ))
                } else {
                    RuleOutcome::NotTriggered
                }
            }
            ActivityRule::VolumeStepUp { multiplier } => {
                let previous = bars[n - 2].volume;
                if previous == 0 {
                    return RuleOutcome::Skipped("zero previous volume");
                }
                if volume >= *multiplier * Decimal::from(previous) {
                    RuleOutcome::Triggered(format!(
                        "volume {} vs previous {}",
                        current.volume, previous
                    ))
                } else {
                    RuleOutcome::NotTriggered
                }
            }
            ActivityRule::VolumeBurst3Bar {
                multiplier,
                baseline_bars,
            } => {
                let burst: u64 = bars[n - BURST_BARS..].iter().map(|b| b.volume).sum();
                let baseline = &bars[n - BURST_BARS - baseline_bars..n - BURST_BARS];
                let sums: Vec<u64> = baseline
                    .windows(BURST_BARS)
                    .map(|w| w.iter().map(|b| b.volume).sum())
                    .collect();
                let total: u64 = sums.iter().sum();
                if total == 0 {
                    return RuleOutcome::Skipped("zero volume baseline");
                }
                let mean = Decimal::from(total) / Decimal::from(sums.len());
                if Decimal::from(burst) >= *multiplier * mean {
                    RuleOutcome::Triggered(format!(
                        "3-bar volume {} is {:.2}x the average 3-bar sum",
                        burst,
                        Decimal::from(burst) / mean
                    ))
                } else {
                    RuleOutcome::NotTriggered
                }
            }
            ActivityRule::AbsoluteVolumeFloor { threshold } => {
                if current.volume >= *threshold {
                    RuleOutcome::Triggered(format!("volume {} >= {}", current.volume, threshold))
                } else {
                    RuleOutcome::NotTriggered
                }
            }
            ActivityRule::StochasticJump {
                periods,
                oversold,
                single_rise,
                all_rise,
                min_volume,
            } => {
                let mut lines = Vec::with_capacity(periods.len());
                for period in periods {
                    match (percent_k(&bars[..n - 1], *period), percent_k(bars, *period)) {
                        (Some(prev), Some(now)) => lines.push((prev, now - prev)),
                        _ => return RuleOutcome::Skipped("insufficient history"),
                    }
                }
                let volume_ok = current.volume >= *min_volume;
                let all_oversold = lines.iter().all(|(prev, _)| prev < oversold);
                let any_single = lines.iter().any(|(_, rise)| rise >= single_rise);
                let strong = lines.iter().filter(|(_, rise)| rise >= all_rise).count();

                let reason = if all_oversold && any_single && volume_ok {
                    Some("rising out of oversold on volume")
                } else if !lines.is_empty() && strong == lines.len() {
                    Some("every line jumped")
                } else if strong >= 2 && volume_ok {
                    Some("two lines jumped on volume")
                } else {
                    None
                };
                match reason {
                    Some(r) => RuleOutcome::Triggered(format!("stochastic {r}")),
                    None => RuleOutcome::NotTriggered,
                }
            }
            ActivityRule::PriceChange { threshold } => {
                let t = threshold.unwrap_or(defaults.price_change_threshold);
                let prev_close = bars[n - 2].close;
                if prev_close.is_zero() {
                    return RuleOutcome::Skipped("zero previous close");
                }
                let change = (current.close - prev_close) / prev_close;
                if change.abs() >= t {
                    RuleOutcome::Triggered(format!("price moved {:.2}%", change * Decimal::ONE_HUNDRED))
                } else {
                    RuleOutcome::NotTriggered
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::technical::{bars_with_volumes, test_bars};
    use rust_decimal_macros::dec;

    fn defaults() -> RuleDefaults {
        RuleDefaults {
            volume_spike_threshold: dec!(3),
            price_change_threshold: dec!(0.05),
        }
    }

    fn volumes_then(last: u64) -> Vec<PriceBar> {
        let mut volumes = vec![10_000u64; 20];
        volumes.push(last);
        bars_with_volumes(&vec![dec!(5.00); 21], &volumes)
    }

    fn sma_rule() -> ActivityRule {
        ActivityRule::VolumeVsSma {
            multiplier: None,
            period: 20,
        }
    }

    #[test]
    fn test_volume_vs_sma_fires_at_4x_not_2x() {
        assert!(matches!(
            sma_rule().evaluate(&volumes_then(40_000), defaults()),
            RuleOutcome::Triggered(_)
        ));
        assert_eq!(
            sma_rule().evaluate(&volumes_then(20_000), defaults()),
            RuleOutcome::NotTriggered
        );
    }

    #[test]
    fn test_volume_vs_sma_excludes_current_bar() {
        // exactly 3x the preceding 20 bars; including the spike in the SMA would miss
        assert!(matches!(
            sma_rule().evaluate(&volumes_then(30_000), defaults()),
            RuleOutcome::Triggered(_)
        ));
    }

    #[test]
    fn test_short_history_is_skipped() {
        let bars = volumes_then(40_000);
        assert_eq!(
            sma_rule().evaluate(&bars[1..], defaults()),
            RuleOutcome::Skipped("insufficient history")
        );
    }

    #[test]
    fn test_step_up_and_floor() {
        let bars = bars_with_volumes(&[dec!(5.00), dec!(5.00)], &[10_000, 25_000]);
        let step = ActivityRule::VolumeStepUp {
            multiplier: dec!(2),
        };
        assert!(matches!(step.evaluate(&bars, defaults()), RuleOutcome::Triggered(_)));

        let floor = ActivityRule::AbsoluteVolumeFloor { threshold: 20_000 };
        assert!(matches!(floor.evaluate(&bars, defaults()), RuleOutcome::Triggered(_)));
        assert_eq!(
            floor.evaluate(&bars[..1], defaults()),
            RuleOutcome::NotTriggered
        );
    }

    #[test]
    fn test_volume_burst() {
        let burst = ActivityRule::VolumeBurst3Bar {
            multiplier: dec!(3),
            baseline_bars: 20,
        };
        let mut volumes = vec![1_000u64; 20];
        volumes.extend([3_000, 3_000, 3_000]);
        let bars = bars_with_volumes(&vec![dec!(2.00); 23], &volumes);
        assert!(matches!(burst.evaluate(&bars, defaults()), RuleOutcome::Triggered(_)));

        volumes[22] = 2_000;
        let bars = bars_with_volumes(&vec![dec!(2.00); 23], &volumes);
        assert_eq!(burst.evaluate(&bars, defaults()), RuleOutcome::NotTriggered);
    }

    fn jump_rule() -> ActivityRule {
        ActivityRule::StochasticJump {
            periods: vec![3, 5, 7],
            oversold: dec!(20),
            single_rise: dec!(10),
            all_rise: dec!(20),
            min_volume: 20_000,
        }
    }

    #[test]
    fn test_stochastic_jump_after_selloff() {
        let mut closes: Vec<Decimal> = (0..12)
            .map(|i| dec!(10.00) - dec!(0.10) * Decimal::from(i))
            .collect();
        closes.push(dec!(9.05));
        let bars = test_bars(&closes, 30_000);
        assert!(matches!(
            jump_rule().evaluate(&bars, defaults()),
            RuleOutcome::Triggered(_)
        ));
    }

    #[test]
    fn test_stochastic_jump_quiet_on_flat_tape() {
        let bars = test_bars(&[dec!(4.00); 13], 30_000);
        assert_eq!(jump_rule().evaluate(&bars, defaults()), RuleOutcome::NotTriggered);
    }

    #[test]
    fn test_price_change_uses_host_threshold() {
        let bars = test_bars(&[dec!(4.00), dec!(4.25)], 1_000);
        let rule = ActivityRule::PriceChange { threshold: None };
        assert!(matches!(rule.evaluate(&bars, defaults()), RuleOutcome::Triggered(_)));

        let strict = RuleDefaults {
            price_change_threshold: dec!(0.10),
            ..defaults()
        };
        assert_eq!(rule.evaluate(&bars, strict), RuleOutcome::NotTriggered);
    }

    #[test]
    fn test_rule_config_parses_by_id() {
        let rules: Vec<ActivityRule> = serde_json::from_str(
            r#"[{"rule":"VolumeVsSMA","multiplier":"4"},{"rule":"StochasticJump","periods":[5,9,14]}]"#,
        )
        .unwrap();
        assert_eq!(rules[0].id(), RuleId::VolumeVsSma);
        assert_eq!(rules[0].lookback(), 21);
        assert_eq!(rules[1].lookback(), 15);
        assert_eq!(RuleId::VolumeVsSma.to_string(), "VolumeVsSMA");
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let rule = ActivityRule::VolumeStepUp {
            multiplier: dec!(0),
        };
        assert!(rule.validate().is_err());
        assert!(default_rules().iter().all(|r| r.validate().is_ok()));
    }
}

//! Pluggable bar pattern detectors

use super::types::PatternTag;
use crate::feed::PriceBar;

/// A named pattern evaluated against a ticker's window (oldest first)
pub trait PatternDetector: Send + Sync {
    fn tag(&self) -> PatternTag;

    fn detect(&self, bars: &[PriceBar]) -> bool;
}

/// Last three lows strictly rising
pub struct HigherLows;

impl PatternDetector for HigherLows {
    fn tag(&self) -> PatternTag {
        PatternTag::HigherLows
    }

    fn detect(&self, bars: &[PriceBar]) -> bool {
        if bars.len() < 3 {
            return false;
        }
        let tail = &bars[bars.len() - 3..];
        tail.windows(2).all(|w| w[1].low > w[0].low)
    }
}

/// Bars of the latest bar's UTC session day still held in the window
fn session(bars: &[PriceBar]) -> &[PriceBar] {
    let Some(last) = bars.last() else {
        return bars;
    };
    let day = last.timestamp.date_naive();
    let start = bars
        .iter()
        .rposition(|b| b.timestamp.date_naive() != day)
        .map(|i| i + 1)
        .unwrap_or(0);
    &bars[start..]
}

/// Close above the high of the session's first `range_bars` bars
pub struct OpeningRangeBreakout {
    pub range_bars: usize,
}

impl PatternDetector for OpeningRangeBreakout {
    fn tag(&self) -> PatternTag {
        PatternTag::OpeningRangeBreakout
    }

    fn detect(&self, bars: &[PriceBar]) -> bool {
        let session = session(bars);
        if self.range_bars == 0 || session.len() <= self.range_bars {
            return false;
        }
        let range_high = session[..self.range_bars].iter().map(|b| b.high).max();
        match (range_high, session.last()) {
            (Some(high), Some(last)) => last.close > high,
            _ => false,
        }
    }
}

/// Latest high above every earlier high of the session
pub struct NewSessionHigh;

impl PatternDetector for NewSessionHigh {
    fn tag(&self) -> PatternTag {
        PatternTag::NewSessionHigh
    }

    fn detect(&self, bars: &[PriceBar]) -> bool {
        let session = session(bars);
        let Some((last, earlier)) = session.split_last() else {
            return false;
        };
        match earlier.iter().map(|b| b.high).max() {
            Some(prior_high) => last.high > prior_high,
            None => false,
        }
    }
}

/// Built-in detector for a tag
pub fn detector_for(tag: PatternTag, opening_range_bars: usize) -> Box<dyn PatternDetector> {
    match tag {
        PatternTag::HigherLows => Box::new(HigherLows),
        PatternTag::OpeningRangeBreakout => Box::new(OpeningRangeBreakout {
            range_bars: opening_range_bars,
        }),
        PatternTag::NewSessionHigh => Box::new(NewSessionHigh),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::technical::test_bars;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn closes(values: &[&str]) -> Vec<PriceBar> {
        let closes: Vec<Decimal> = values.iter().map(|v| v.parse().unwrap()).collect();
        test_bars(&closes, 1_000)
    }

    #[test]
    fn test_higher_lows() {
        assert!(HigherLows.detect(&closes(&["5.00", "5.10", "5.20", "5.30"])));
        assert!(!HigherLows.detect(&closes(&["5.00", "5.10", "5.05", "5.30"])));
        assert!(!HigherLows.detect(&closes(&["5.00", "5.10"])));
    }

    #[test]
    fn test_opening_range_breakout() {
        let detector = OpeningRangeBreakout { range_bars: 5 };
        // opening range high = 5.12 (bar 4: open 5.10, close 5.05 -> high 5.12)
        let bars = closes(&["5.00", "5.05", "5.00", "5.10", "5.05", "5.08", "5.20"]);
        assert!(detector.detect(&bars));

        let inside = closes(&["5.00", "5.05", "5.00", "5.10", "5.05", "5.08", "5.09"]);
        assert!(!detector.detect(&inside));

        // only the opening range itself: nothing to break out of yet
        assert!(!detector.detect(&bars[..5]));
    }

    #[test]
    fn test_session_resets_on_new_day() {
        let mut bars = closes(&["9.00", "9.50", "9.80", "5.00", "5.10"]);
        for bar in bars.iter_mut().skip(3) {
            bar.timestamp += Duration::days(1);
        }
        bars[3].open = dec!(5.00);
        bars[3].high = dec!(5.02);
        // yesterday's highs do not count against today's session
        assert!(NewSessionHigh.detect(&bars));
        assert_eq!(session(&bars).len(), 2);
    }

    #[test]
    fn test_new_session_high_needs_prior_bar() {
        let bars = closes(&["5.00"]);
        assert!(!NewSessionHigh.detect(&bars));
        let bars = closes(&["5.00", "4.90"]);
        assert!(!NewSessionHigh.detect(&bars));
    }

    #[test]
    fn test_detector_for_tags() {
        for tag in [
            PatternTag::HigherLows,
            PatternTag::OpeningRangeBreakout,
            PatternTag::NewSessionHigh,
        ] {
            assert_eq!(detector_for(tag, 5).tag(), tag);
        }
    }
}

//! Relative strength index (Wilder smoothing)

use rust_decimal::Decimal;

/// RSI of the latest close; needs `period + 1` closes
///
/// No losses in the window reads 100 (or 50 when there were no gains either).
pub fn rsi(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let changes: Vec<Decimal> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let p = Decimal::from(period);

    let mut avg_gain = changes[..period]
        .iter()
        .map(|c| (*c).max(Decimal::ZERO))
        .sum::<Decimal>()
        / p;
    let mut avg_loss = changes[..period]
        .iter()
        .map(|c| (-*c).max(Decimal::ZERO))
        .sum::<Decimal>()
        / p;

    for change in &changes[period..] {
        let gain = (*change).max(Decimal::ZERO);
        let loss = (-*change).max(Decimal::ZERO);
        avg_gain = (avg_gain * (p - Decimal::ONE) + gain) / p;
        avg_loss = (avg_loss * (p - Decimal::ONE) + loss) / p;
    }

    if avg_loss.is_zero() {
        return Some(if avg_gain > Decimal::ZERO {
            Decimal::ONE_HUNDRED
        } else {
            Decimal::from(50)
        });
    }
    let rs = avg_gain / avg_loss;
    Some(Decimal::ONE_HUNDRED - Decimal::ONE_HUNDRED / (Decimal::ONE + rs))
}

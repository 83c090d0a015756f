//! Exit confirmation hooks

use crate::config::ExitConfirmationConfig;
use crate::technical::TechnicalIndicators;
use crate::window::WindowStore;
use chrono::Duration;
use rust_decimal::Decimal;

/// Extra condition an Exit must satisfy before it is emitted
///
/// `store` is absent when the generator runs without market context; hooks
/// that need it then decline to confirm.
pub trait ExitConfirmation: Send + Sync {
    fn name(&self) -> &'static str;

    fn confirm(&self, indicators: &TechnicalIndicators, store: Option<&WindowStore>) -> bool;
}

/// Every exit passes
pub struct NoConfirmation;

impl ExitConfirmation for NoConfirmation {
    fn name(&self) -> &'static str {
        "none"
    }

    fn confirm(&self, _indicators: &TechnicalIndicators, _store: Option<&WindowStore>) -> bool {
        true
    }
}

/// Requires recent trade volume at or above a floor
pub struct VolumeConfirmation {
    pub min_volume: u64,
    pub lookback: Duration,
}

impl ExitConfirmation for VolumeConfirmation {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn confirm(&self, indicators: &TechnicalIndicators, store: Option<&WindowStore>) -> bool {
        let Some(store) = store else {
            return false;
        };
        let since = indicators.as_of - self.lookback;
        store.trade_volume_since(&indicators.ticker, since) >= self.min_volume
    }
}

/// Requires sell-side pressure in the latest quote (ask size / bid size)
pub struct QuoteImbalanceConfirmation {
    pub min_ratio: Decimal,
}

impl ExitConfirmation for QuoteImbalanceConfirmation {
    fn name(&self) -> &'static str {
        "quote_imbalance"
    }

    fn confirm(&self, indicators: &TechnicalIndicators, store: Option<&WindowStore>) -> bool {
        let Some(quote) = store.and_then(|s| s.latest_quote(&indicators.ticker)) else {
            return false;
        };
        if quote.bid_size == 0 {
            return quote.ask_size > 0;
        }
        Decimal::from(quote.ask_size) / Decimal::from(quote.bid_size) >= self.min_ratio
    }
}

pub fn confirmation_from_config(config: &ExitConfirmationConfig) -> Box<dyn ExitConfirmation> {
    match config {
        ExitConfirmationConfig::None => Box::new(NoConfirmation),
        ExitConfirmationConfig::Volume {
            min_volume,
            lookback_secs,
        } => Box::new(VolumeConfirmation {
            min_volume: *min_volume,
            lookback: Duration::seconds(*lookback_secs as i64),
        }),
        ExitConfirmationConfig::QuoteImbalance { min_ratio } => {
            Box::new(QuoteImbalanceConfirmation {
                min_ratio: *min_ratio,
            })
        }
    }
}

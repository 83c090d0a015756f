//! Shared fixtures

use chrono::{DateTime, Duration, TimeZone, Utc};
use premarket_scanner::config::{Config, MacdConfig, MacdPreset};
use premarket_scanner::feed::PriceBar;
use premarket_scanner::universe::{Stock, Universe};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
}

/// One-minute bars opening at the previous close, wicking 0.02 either side
pub fn bars(ticker: &str, closes: &[Decimal], volumes: &[u64]) -> Vec<PriceBar> {
    let mut prev = closes[0];
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (close, volume))| {
            let open = prev;
            prev = *close;
            PriceBar {
                ticker: ticker.to_string(),
                timestamp: session_start() + Duration::minutes(i as i64),
                open,
                high: open.max(*close) + dec!(0.02),
                low: open.min(*close) - dec!(0.02),
                close: *close,
                volume: *volume,
            }
        })
        .collect()
}

/// Twenty quiet declining bars, then a 4x volume reversal bar
pub fn spike_session(ticker: &str) -> Vec<PriceBar> {
    let mut closes: Vec<Decimal> = (0..20)
        .map(|i| dec!(6.00) - dec!(0.03) * Decimal::from(i))
        .collect();
    closes.push(dec!(5.58));
    let mut volumes = vec![10_000u64; 20];
    volumes.push(40_000);
    bars(ticker, &closes, &volumes)
}

pub fn scanner_config() -> Config {
    let mut config = Config::default();
    config.technical.macd = MacdConfig::preset(MacdPreset::Short);
    config.technical.stochastic_periods = vec![9, 14];
    config
}

pub fn stock(ticker: &str) -> Stock {
    Stock {
        ticker: ticker.to_string(),
        price: dec!(5.58),
        float_shares: 10_000_000,
        volume: 100_000,
        high: dec!(6.00),
        low: dec!(5.40),
        close: dec!(5.58),
    }
}

pub fn universe(tickers: &[&str]) -> Universe {
    Universe::from_stocks(tickers.iter().map(|t| stock(t)), session_start())
}

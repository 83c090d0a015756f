//! Raw feed message normalization
//!
//! Converts the aggregate/quote/trade messages of a Polygon-style stock stream
//! into [`MarketEvent`]s. Stateless: every message is validated on its own.

use super::{MarketEvent, PriceBar, Quote, Trade};
use crate::telemetry::{increment_counter, CounterMetric};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Errors for messages that cannot become market events
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
    #[error("empty ticker symbol")]
    EmptyTicker,
    #[error("{ticker}: non-positive {field}")]
    NonPositivePrice { ticker: String, field: &'static str },
    #[error("{ticker}: high below low")]
    InvertedRange { ticker: String },
    #[error("{ticker}: open/close outside high-low range")]
    OutsideRange { ticker: String },
    #[error("{ticker}: crossed quote (bid above ask)")]
    CrossedQuote { ticker: String },
    #[error("{ticker}: zero trade size")]
    ZeroSize { ticker: String },
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}

/// Minute aggregate message (`ev = "AM"`, or `"A"` for second aggregates)
#[derive(Debug, Clone, Deserialize)]
pub struct RawAggregate {
    pub sym: String,
    pub o: Decimal,
    pub h: Decimal,
    pub l: Decimal,
    pub c: Decimal,
    pub v: u64,
    /// Window start (epoch ms)
    pub s: i64,
    /// Window end (epoch ms)
    #[serde(default)]
    pub e: Option<i64>,
}

/// Quote message (`ev = "Q"`)
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuote {
    pub sym: String,
    pub bp: Decimal,
    pub bs: u64,
    pub ap: Decimal,
    #[serde(rename = "as")]
    pub ask_size: u64,
    pub t: i64,
}

/// Trade message (`ev = "T"`)
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrade {
    pub sym: String,
    pub p: Decimal,
    pub s: u64,
    pub t: i64,
}

/// Raw market data message, tagged by `ev`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "ev")]
pub enum RawFeedMessage {
    #[serde(rename = "AM", alias = "A")]
    Aggregate(RawAggregate),
    #[serde(rename = "Q")]
    Quote(RawQuote),
    #[serde(rename = "T")]
    Trade(RawTrade),
}

/// Result of normalizing one WebSocket frame
#[derive(Debug, Default)]
pub struct NormalizedFrame {
    /// Valid market events, in frame order
    pub events: Vec<MarketEvent>,
    /// Status messages (auth/subscription acknowledgements)
    pub status: Vec<String>,
    /// Number of messages dropped as malformed
    pub rejected: usize,
}

/// Convert a raw message into a typed event
pub fn normalize(raw: RawFeedMessage) -> Result<MarketEvent, NormalizeError> {
    match raw {
        RawFeedMessage::Aggregate(agg) => {
            let ticker = normalize_ticker(&agg.sym)?;
            for (field, value) in [("open", agg.o), ("high", agg.h), ("low", agg.l), ("close", agg.c)] {
                if value <= Decimal::ZERO {
                    return Err(NormalizeError::NonPositivePrice { ticker, field });
                }
            }
            if agg.h < agg.l {
                return Err(NormalizeError::InvertedRange { ticker });
            }
            let in_range = |p: Decimal| p >= agg.l && p <= agg.h;
            if !in_range(agg.o) || !in_range(agg.c) {
                return Err(NormalizeError::OutsideRange { ticker });
            }
            Ok(MarketEvent::Bar(PriceBar {
                ticker,
                timestamp: millis_to_utc(agg.s)?,
                open: agg.o,
                high: agg.h,
                low: agg.l,
                close: agg.c,
                volume: agg.v,
            }))
        }
        RawFeedMessage::Quote(q) => {
            let ticker = normalize_ticker(&q.sym)?;
            if q.bp <= Decimal::ZERO {
                return Err(NormalizeError::NonPositivePrice { ticker, field: "bid" });
            }
            if q.ap <= Decimal::ZERO {
                return Err(NormalizeError::NonPositivePrice { ticker, field: "ask" });
            }
            if q.bp > q.ap {
                return Err(NormalizeError::CrossedQuote { ticker });
            }
            Ok(MarketEvent::Quote(Quote {
                ticker,
                timestamp: millis_to_utc(q.t)?,
                bid_price: q.bp,
                bid_size: q.bs,
                ask_price: q.ap,
                ask_size: q.ask_size,
            }))
        }
        RawFeedMessage::Trade(t) => {
            let ticker = normalize_ticker(&t.sym)?;
            if t.p <= Decimal::ZERO {
                return Err(NormalizeError::NonPositivePrice { ticker, field: "price" });
            }
            if t.s == 0 {
                return Err(NormalizeError::ZeroSize { ticker });
            }
            Ok(MarketEvent::Trade(Trade {
                ticker,
                timestamp: millis_to_utc(t.t)?,
                price: t.p,
                size: t.s,
            }))
        }
    }
}

/// Parse and normalize a single JSON message
pub fn normalize_message(value: serde_json::Value) -> Result<MarketEvent, NormalizeError> {
    let ev = value
        .get("ev")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    match ev.as_str() {
        "AM" | "A" | "Q" | "T" => {}
        other => return Err(NormalizeError::UnknownEventType(other.to_string())),
    }
    let raw: RawFeedMessage =
        serde_json::from_value(value).map_err(|e| NormalizeError::InvalidJson(e.to_string()))?;
    normalize(raw)
}

/// Normalize a whole frame (a JSON array of messages, or a single object)
///
/// Malformed members are dropped with a warning; they never stop the rest of
/// the frame from being processed.
pub fn normalize_frame(text: &str) -> NormalizedFrame {
    let mut frame = NormalizedFrame::default();

    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping unparseable feed frame");
            frame.rejected += 1;
            increment_counter(CounterMetric::EventsMalformed, 1);
            return frame;
        }
    };

    let messages = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    for message in messages {
        if message.get("ev").and_then(|v| v.as_str()) == Some("status") {
            let text = message
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            frame.status.push(text);
            continue;
        }

        match normalize_message(message) {
            Ok(event) => frame.events.push(event),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed market event");
                frame.rejected += 1;
            }
        }
    }

    if frame.rejected > 0 {
        increment_counter(CounterMetric::EventsMalformed, frame.rejected as u64);
    }
    increment_counter(CounterMetric::EventsNormalized, frame.events.len() as u64);

    frame
}

fn normalize_ticker(sym: &str) -> Result<String, NormalizeError> {
    let ticker = sym.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(NormalizeError::EmptyTicker);
    }
    Ok(ticker)
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, NormalizeError> {
    if ms <= 0 {
        return Err(NormalizeError::InvalidTimestamp(ms));
    }
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(NormalizeError::InvalidTimestamp(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const AGG: &str = r#"{"ev":"AM","sym":"xyz","v":40000,"o":5.43,"c":5.58,"h":5.60,"l":5.41,"s":1704096000000,"e":1704096060000}"#;

    #[test]
    fn test_normalize_aggregate() {
        let frame = normalize_frame(AGG);
        assert_eq!(frame.events.len(), 1);
        assert_eq!(frame.rejected, 0);
        match &frame.events[0] {
            MarketEvent::Bar(bar) => {
                assert_eq!(bar.ticker, "XYZ");
                assert_eq!(bar.close, dec!(5.58));
                assert_eq!(bar.volume, 40_000);
                assert_eq!(bar.timestamp.timestamp_millis(), 1_704_096_000_000);
            }
            other => panic!("expected bar, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_quote_and_trade() {
        let text = r#"[
            {"ev":"Q","sym":"ABC","bp":2.10,"bs":300,"ap":2.12,"as":500,"t":1704096000123},
            {"ev":"T","sym":"ABC","p":2.11,"s":100,"t":1704096000456}
        ]"#;
        let frame = normalize_frame(text);
        assert_eq!(frame.events.len(), 2);
        assert!(matches!(&frame.events[0], MarketEvent::Quote(q) if q.ask_size == 500));
        assert!(matches!(&frame.events[1], MarketEvent::Trade(t) if t.price == dec!(2.11)));
    }

    #[test]
    fn test_status_messages_collected() {
        let text = r#"[{"ev":"status","status":"auth_success","message":"authenticated"}]"#;
        let frame = normalize_frame(text);
        assert!(frame.events.is_empty());
        assert_eq!(frame.status, vec!["authenticated".to_string()]);
        assert_eq!(frame.rejected, 0);
    }

    #[test]
    fn test_malformed_member_does_not_drop_frame() {
        let text = r#"[
            {"ev":"AM","sym":"BAD","v":100,"o":5.0,"c":5.0,"h":4.0,"l":4.5,"s":1704096000000},
            {"ev":"T","sym":"OK","p":1.5,"s":10,"t":1704096000456},
            {"ev":"XX","sym":"OK"}
        ]"#;
        let frame = normalize_frame(text);
        assert_eq!(frame.events.len(), 1);
        assert_eq!(frame.rejected, 2);
    }

    #[test]
    fn test_invalid_json_frame() {
        let frame = normalize_frame("not json");
        assert!(frame.events.is_empty());
        assert_eq!(frame.rejected, 1);
    }

    #[test]
    fn test_reject_inverted_range() {
        let raw = RawFeedMessage::Aggregate(RawAggregate {
            sym: "XYZ".into(),
            o: dec!(5),
            h: dec!(4),
            l: dec!(6),
            c: dec!(5),
            v: 10,
            s: 1_704_096_000_000,
            e: None,
        });
        assert_eq!(
            normalize(raw),
            Err(NormalizeError::InvertedRange {
                ticker: "XYZ".into()
            })
        );
    }

    #[test]
    fn test_reject_crossed_quote() {
        let raw = RawFeedMessage::Quote(RawQuote {
            sym: "XYZ".into(),
            bp: dec!(2.20),
            bs: 1,
            ap: dec!(2.10),
            ask_size: 1,
            t: 1_704_096_000_000,
        });
        assert!(matches!(normalize(raw), Err(NormalizeError::CrossedQuote { .. })));
    }

    #[test]
    fn test_reject_zero_size_trade() {
        let raw = RawFeedMessage::Trade(RawTrade {
            sym: "XYZ".into(),
            p: dec!(2.20),
            s: 0,
            t: 1_704_096_000_000,
        });
        assert!(matches!(normalize(raw), Err(NormalizeError::ZeroSize { .. })));
    }

    #[test]
    fn test_reject_empty_ticker_and_bad_timestamp() {
        let raw = RawFeedMessage::Trade(RawTrade {
            sym: "  ".into(),
            p: dec!(2.20),
            s: 5,
            t: 1,
        });
        assert_eq!(normalize(raw), Err(NormalizeError::EmptyTicker));

        let raw = RawFeedMessage::Trade(RawTrade {
            sym: "XYZ".into(),
            p: dec!(2.20),
            s: 5,
            t: -5,
        });
        assert_eq!(normalize(raw), Err(NormalizeError::InvalidTimestamp(-5)));
    }
}

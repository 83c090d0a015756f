//! Tier 3 working set: recently alerted tickers

use crate::activity::ActivityAlert;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct ActiveEntry {
    alerted_at: DateTime<Utc>,
    volume_ratio: Decimal,
}

/// Tickers carrying an alert from the current or a recent Tier 2 cycle
#[derive(Debug, Clone)]
pub struct ActiveSet {
    ttl: Duration,
    max_symbols: usize,
    entries: HashMap<String, ActiveEntry>,
}

impl ActiveSet {
    pub fn new(ttl_secs: u64, max_symbols: usize) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            max_symbols,
            entries: HashMap::new(),
        }
    }

    /// Record alerts; a newer alert refreshes the ticker's entry
    pub fn record(&mut self, alerts: &[ActivityAlert]) {
        for alert in alerts {
            let entry = ActiveEntry {
                alerted_at: alert.timestamp,
                volume_ratio: alert.volume_ratio,
            };
            self.entries
                .entry(alert.ticker.clone())
                .and_modify(|e| {
                    if entry.alerted_at >= e.alerted_at {
                        *e = entry;
                    }
                })
                .or_insert(entry);
        }
    }

    /// Drop expired entries and return at most `max_symbols` tickers, most
    /// recent alert first, ties broken by higher volume ratio then ticker
    pub fn select(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let cutoff = now - self.ttl;
        self.entries.retain(|_, e| e.alerted_at >= cutoff);

        let mut ranked: Vec<(&String, &ActiveEntry)> = self.entries.iter().collect();
        ranked.sort_by(|(ta, a), (tb, b)| {
            b.alerted_at
                .cmp(&a.alerted_at)
                .then(b.volume_ratio.cmp(&a.volume_ratio))
                .then(ta.cmp(tb))
        });
        ranked
            .into_iter()
            .take(self.max_symbols)
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

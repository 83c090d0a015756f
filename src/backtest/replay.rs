//! Timestamp-ordered bar replay

use crate::data::read_bars_dir;
use crate::feed::PriceBar;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;

/// Bars grouped into steps that share a timestamp
pub struct BarReplay {
    bars: Vec<PriceBar>,
}

impl BarReplay {
    pub fn from_bars(mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.ticker.cmp(&b.ticker)));
        Self { bars }
    }

    /// Every capture file under `dir`
    pub fn from_dir(dir: &Path) -> anyhow::Result<Self> {
        Ok(Self::from_bars(read_bars_dir(dir)?))
    }

    /// Keep bars within `[start, end]`
    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.bars.retain(|b| {
            start.map_or(true, |s| b.timestamp >= s) && end.map_or(true, |e| b.timestamp <= e)
        });
        self
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn tickers(&self) -> BTreeSet<String> {
        self.bars.iter().map(|b| b.ticker.clone()).collect()
    }

    /// Bars in order, one step per distinct timestamp
    pub fn steps(&self) -> impl Iterator<Item = (DateTime<Utc>, &[PriceBar])> {
        self.bars
            .chunk_by(|a, b| a.timestamp == b.timestamp)
            .map(|chunk| (chunk[0].timestamp, chunk))
    }
}

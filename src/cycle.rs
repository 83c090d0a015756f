//! Per-cycle outcome accounting shared by the tiers

use serde::Serialize;

/// A single ticker's failure inside a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerError {
    pub ticker: String,
    pub error: String,
}

/// What one tier cycle did; failures are per ticker and never abort the cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<TickerError>,
}

impl CycleReport {
    pub fn fail(&mut self, ticker: impl Into<String>, error: impl ToString) {
        self.failed += 1;
        self.errors.push(TickerError {
            ticker: ticker.into(),
            error: error.to_string(),
        });
    }

    pub fn merge(&mut self, other: CycleReport) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

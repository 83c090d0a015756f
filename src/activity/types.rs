//! Tier 2 alert type

use super::rules::RuleId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unusual activity on one ticker in one detection cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityAlert {
    pub ticker: String,
    /// Timestamp of the bar that triggered the alert
    pub timestamp: DateTime<Utc>,
    /// Current volume over SMA(volume, 20) of the preceding bars; 0 when unknown
    pub volume_ratio: Decimal,
    pub triggered_rules: BTreeSet<RuleId>,
    pub notes: Vec<String>,
}

impl ActivityAlert {
    pub fn triggered(&self, rule: RuleId) -> bool {
        self.triggered_rules.contains(&rule)
    }
}

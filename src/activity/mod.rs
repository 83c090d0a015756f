//! Tier 2: activity detection
//!
//! Configurable volume/price anomaly rules over each universe ticker's window.

mod detector;
mod rules;
mod types;

pub use detector::ActivityDetector;
pub use rules::{default_rules, ActivityRule, RuleDefaults, RuleId, RuleOutcome};
pub use types::ActivityAlert;

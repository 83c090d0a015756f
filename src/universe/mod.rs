//! Tier 1: universe selection
//!
//! Filters the full-market snapshot down to eligible low-price, low-float
//! candidates on a fixed refresh interval.

mod selector;
mod source;
mod types;

pub use selector::{UniverseCriteria, UniverseSelector};
pub use source::{HttpUniverseSource, StaticUniverseSource, UniverseSource};
pub use types::{Stock, Universe};

//! Tier 4: signal generation
//!
//! Combines indicator state into Hold / EntryLong / Exit with a confidence score.

mod confirmation;
mod generator;
mod types;

pub use confirmation::{
    confirmation_from_config, ExitConfirmation, NoConfirmation, QuoteImbalanceConfirmation,
    VolumeConfirmation,
};
pub use generator::{Agreement, SignalGenerator};
pub use types::{SignalError, SignalType, TradeSignal};

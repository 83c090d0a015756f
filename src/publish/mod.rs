//! Output collaborators
//!
//! Key/value cache for current state, batched time-series persistence with
//! retry and a local dead-letter sink.

mod batch;
mod dead_letter;
mod memory;
mod publisher;
mod types;

pub use batch::{BatchWriter, FlushOutcome, RetryPolicy};
pub use dead_letter::{DeadLetterEntry, DeadLetterSink, ReplayReport};
pub use memory::{InMemoryCache, InMemoryTimeSeriesStore};
pub use publisher::Publisher;
pub use types::{
    indicators_key, signal_key, KeyValueCache, PublishError, TimeSeriesStore, ALERTS_KEY,
    ALERTS_TABLE, INDICATORS_TABLE, SIGNALS_TABLE, UNIVERSE_KEY, UNIVERSE_TABLE,
};

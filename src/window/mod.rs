//! Rolling window store
//!
//! Per-ticker bounded bar/quote/trade history shared by every tier, fed by a
//! sharded single-writer ingestion queue.

mod ingest;
mod store;
mod types;

pub use ingest::{BackpressurePolicy, IngestError, Ingestor};
pub use store::WindowStore;
pub use types::{OrderingPolicy, RollingWindow, WindowError, WindowStats};

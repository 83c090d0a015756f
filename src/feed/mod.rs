//! Market data feed module
//!
//! Normalizes the streaming aggregate/quote/trade feed into typed events

mod normalizer;
mod polygon;
mod socket;
mod types;

pub use normalizer::{
    normalize, normalize_frame, normalize_message, NormalizeError, NormalizedFrame, RawAggregate,
    RawFeedMessage, RawQuote, RawTrade,
};
pub use polygon::PolygonFeed;
pub use socket::{spawn_socket, SocketError, SocketEvent, SocketSettings};
pub use types::{MarketEvent, PriceBar, Quote, Trade};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for market feed implementations
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Subscribe to normalized market events
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<MarketEvent>>;
}

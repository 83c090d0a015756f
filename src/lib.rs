//! premarket-scanner: four-tier pre-market equities scanner
//!
//! This library provides the core components for:
//! - Normalizing the streaming aggregate/quote/trade feed
//! - Per-ticker rolling windows with sharded single-writer ingestion
//! - Tier 1 universe selection (price, float, volume)
//! - Tier 2 activity detection over a configurable rule set
//! - Tier 3 technical indicators (MACD, stochastic, RSI, momentum, patterns)
//! - Tier 4 signal generation with confidence scoring
//! - Periodic orchestration and publishing to cache / time-series collaborators
//! - Bar capture to Parquet and backtesting
//! - Structured logging and Prometheus metrics

pub mod activity;
pub mod backtest;
pub mod cli;
pub mod config;
pub mod cycle;
pub mod data;
pub mod feed;
pub mod pipeline;
pub mod publish;
pub mod retry;
pub mod signal;
pub mod technical;
pub mod telemetry;
pub mod universe;
pub mod window;

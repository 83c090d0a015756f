//! Integration tests for premarket-scanner

mod backtest_test;
mod common;
mod pipeline_test;
mod publish_test;
mod window_test;

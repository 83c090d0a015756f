//! Data capture module
//!
//! Stores normalized bars to Parquet for backtesting

mod parquet;
mod recorder;

pub use parquet::{bar_schema, read_bars, read_bars_dir, BarParquetWriter, BARS_PREFIX};
pub use recorder::{BarRecorder, RecorderConfig, RecorderStats};

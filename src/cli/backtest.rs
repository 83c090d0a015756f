//! Backtest command implementation

use crate::backtest::{BacktestSimulator, BarReplay};
use crate::config::Config;
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BacktestArgs {
    /// Directory containing captured bar Parquet files
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Start time filter (RFC 3339)
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// End time filter (RFC 3339)
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,

    /// Output format: table or json
    #[arg(long, default_value = "table")]
    pub format: String,
}

impl BacktestArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        tracing::info!(data_dir = ?self.data_dir, "Running backtest");
        let replay = BarReplay::from_dir(&self.data_dir)?.between(self.start, self.end);
        if replay.is_empty() {
            anyhow::bail!("no bars found in {}", self.data_dir.display());
        }

        let report = BacktestSimulator::new(config.clone()).run(&replay).await?;
        match self.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&report.metrics)?),
            _ => println!("{}", report.metrics.format_table()),
        }
        Ok(())
    }
}

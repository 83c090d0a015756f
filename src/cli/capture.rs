//! Capture command implementation

use crate::config::Config;
use crate::data::{BarRecorder, RecorderConfig};
use crate::feed::{MarketEvent, MarketFeed, PolygonFeed};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Output directory for captured bars (defaults to data.output_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CaptureArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut recorder_config = RecorderConfig::from_config(&config.data)?;
        if let Some(output) = &self.output {
            recorder_config.output_dir = output.clone();
        }
        tracing::info!(output = ?recorder_config.output_dir, "Starting bar capture");

        let recorder = BarRecorder::new(recorder_config);
        let mut events = PolygonFeed::from_config(&config.feed)?.subscribe().await?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => match event {
                    Some(MarketEvent::Bar(bar)) => recorder.record(bar).await?,
                    Some(_) => {}
                    None => {
                        tracing::warn!("Feed closed");
                        break;
                    }
                },
            }
        }

        let stats = recorder.shutdown().await;
        tracing::info!(
            received = stats.bars_received,
            written = stats.bars_written,
            errors = stats.write_errors,
            "Capture stopped"
        );
        Ok(())
    }
}

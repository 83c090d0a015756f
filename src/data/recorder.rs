//! Bar recorder for data capture

use super::parquet::BarParquetWriter;
use crate::config::{ConfigError, DataConfig};
use crate::feed::PriceBar;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

/// Configuration for bar recording
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub output_dir: PathBuf,
    pub rotation_interval_secs: u64,
    /// Buffered bars that trigger a flush
    pub buffer_size: usize,
    pub flush_interval_secs: u64,
    pub channel_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data"),
            rotation_interval_secs: 3600,
            buffer_size: 1000,
            flush_interval_secs: 5,
            channel_capacity: 10_000,
        }
    }
}

impl RecorderConfig {
    pub fn from_config(config: &DataConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            output_dir: config.output_dir.clone(),
            rotation_interval_secs: config.rotation_interval_secs()?,
            buffer_size: config.flush_batch_size.max(1),
            flush_interval_secs: config.flush_interval_secs.max(1),
            ..Default::default()
        })
    }
}

/// Recording statistics
#[derive(Debug, Default, Clone)]
pub struct RecorderStats {
    pub bars_received: u64,
    pub bars_written: u64,
    pub flushes: u64,
    pub write_errors: u64,
    pub last_flush: Option<DateTime<Utc>>,
}

/// Buffers bars from a channel and flushes them to rotating Parquet files
pub struct BarRecorder {
    config: RecorderConfig,
    bar_tx: mpsc::Sender<PriceBar>,
    stats: Arc<RwLock<RecorderStats>>,
    task: JoinHandle<()>,
}

impl BarRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        let (bar_tx, bar_rx) = mpsc::channel(config.channel_capacity.max(1));
        let stats = Arc::new(RwLock::new(RecorderStats::default()));
        let writer = BarParquetWriter::new(config.output_dir.clone(), config.rotation_interval_secs);

        let task = tokio::spawn(Self::run_writer(
            bar_rx,
            writer,
            config.clone(),
            stats.clone(),
        ));

        Self {
            config,
            bar_tx,
            stats,
            task,
        }
    }

    async fn run_writer(
        mut rx: mpsc::Receiver<PriceBar>,
        mut writer: BarParquetWriter,
        config: RecorderConfig,
        stats: Arc<RwLock<RecorderStats>>,
    ) {
        let mut buffer: Vec<PriceBar> = Vec::with_capacity(config.buffer_size);
        let mut interval = tokio::time::interval(Duration::from_secs(config.flush_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(bar) => {
                        stats.write().await.bars_received += 1;
                        buffer.push(bar);
                        if buffer.len() >= config.buffer_size {
                            Self::flush(&mut buffer, &mut writer, &stats).await;
                        }
                    }
                    None => {
                        Self::flush(&mut buffer, &mut writer, &stats).await;
                        if let Err(e) = writer.close() {
                            tracing::error!(error = %e, "Failed to close capture file");
                        }
                        tracing::info!("Bar recorder shutting down");
                        break;
                    }
                },
                _ = interval.tick() => {
                    Self::flush(&mut buffer, &mut writer, &stats).await;
                }
            }
        }
    }

    async fn flush(
        buffer: &mut Vec<PriceBar>,
        writer: &mut BarParquetWriter,
        stats: &Arc<RwLock<RecorderStats>>,
    ) {
        if buffer.is_empty() {
            return;
        }
        let now = Utc::now();
        let count = buffer.len();

        let result = writer.write(buffer, now);
        let mut s = stats.write().await;
        match result {
            Ok(()) => {
                s.bars_written += count as u64;
                s.flushes += 1;
                s.last_flush = Some(now);
                tracing::debug!(count, "Flushed bars");
            }
            Err(e) => {
                s.write_errors += 1;
                tracing::error!(error = %e, count, "Failed to write bars");
            }
        }
        buffer.clear();
    }

    pub async fn record(&self, bar: PriceBar) -> anyhow::Result<()> {
        self.bar_tx
            .send(bar)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send bar: {}", e))
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.config.output_dir
    }

    pub async fn stats(&self) -> RecorderStats {
        self.stats.read().await.clone()
    }

    /// Flush what is buffered, close the file and return final stats
    pub async fn shutdown(self) -> RecorderStats {
        drop(self.bar_tx);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Recorder task failed");
        }
        let stats = self.stats.read().await.clone();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::read_bars_dir;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn bar(minute: u32) -> PriceBar {
        PriceBar {
            ticker: "XYZ".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 9, minute, 0).unwrap(),
            open: dec!(5.00),
            high: dec!(5.05),
            low: dec!(4.95),
            close: dec!(5.01),
            volume: 10_000,
        }
    }

    fn config(dir: &TempDir, buffer_size: usize) -> RecorderConfig {
        RecorderConfig {
            output_dir: dir.path().to_path_buf(),
            buffer_size,
            flush_interval_secs: 60,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_shutdown_flushes_buffer() {
        let dir = TempDir::new().unwrap();
        let recorder = BarRecorder::new(config(&dir, 100));
        for minute in 0..3 {
            recorder.record(bar(minute)).await.unwrap();
        }

        let stats = recorder.shutdown().await;
        assert_eq!(stats.bars_received, 3);
        assert_eq!(stats.bars_written, 3);
        assert_eq!(read_bars_dir(dir.path()).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_full_buffer_flushes() {
        let dir = TempDir::new().unwrap();
        let recorder = BarRecorder::new(config(&dir, 2));
        recorder.record(bar(0)).await.unwrap();
        recorder.record(bar(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let stats = recorder.stats().await;
        assert_eq!(stats.bars_written, 2);
        assert_eq!(stats.flushes, 1);
        recorder.shutdown().await;
    }

    #[test]
    fn test_config_from_data_section() {
        let config = RecorderConfig::from_config(&DataConfig::default()).unwrap();
        assert_eq!(config.rotation_interval_secs, 3600);
        assert_eq!(config.buffer_size, 1000);
    }
}

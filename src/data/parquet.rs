//! Parquet storage for captured bars with time-based rotation

use crate::feed::PriceBar;
use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// File name prefix for bar captures
pub const BARS_PREFIX: &str = "bars";

/// Bar schema; prices are decimal strings to keep exact precision
pub fn bar_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("ticker", DataType::Utf8, false),
        Field::new("open", DataType::Utf8, false),
        Field::new("high", DataType::Utf8, false),
        Field::new("low", DataType::Utf8, false),
        Field::new("close", DataType::Utf8, false),
        Field::new("volume", DataType::UInt64, false),
    ])
}

fn to_batch(schema: Arc<Schema>, bars: &[PriceBar]) -> anyhow::Result<RecordBatch> {
    let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp.timestamp_micros()).collect();
    let tickers: Vec<&str> = bars.iter().map(|b| b.ticker.as_str()).collect();
    let price = |f: fn(&PriceBar) -> Decimal| -> ArrayRef {
        Arc::new(StringArray::from(
            bars.iter().map(|b| f(b).to_string()).collect::<Vec<_>>(),
        ))
    };
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")) as ArrayRef,
            Arc::new(StringArray::from(tickers)) as ArrayRef,
            price(|b| b.open),
            price(|b| b.high),
            price(|b| b.low),
            price(|b| b.close),
            Arc::new(UInt64Array::from(volumes)) as ArrayRef,
        ],
    )?)
}

struct OpenFile {
    started: DateTime<Utc>,
    path: PathBuf,
    writer: ArrowWriter<File>,
    rows: usize,
}

/// Appends bar batches to the current file, starting a new one each
/// rotation interval
pub struct BarParquetWriter {
    output_dir: PathBuf,
    rotation_interval: Duration,
    schema: Arc<Schema>,
    current: Option<OpenFile>,
}

impl BarParquetWriter {
    pub fn new(output_dir: impl Into<PathBuf>, rotation_interval_secs: u64) -> Self {
        Self {
            output_dir: output_dir.into(),
            rotation_interval: Duration::seconds(rotation_interval_secs as i64),
            schema: Arc::new(bar_schema()),
            current: None,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn needs_rotation(&self, now: DateTime<Utc>) -> bool {
        match &self.current {
            None => true,
            Some(file) => now - file.started >= self.rotation_interval,
        }
    }

    pub fn file_path(&self, timestamp: DateTime<Utc>) -> PathBuf {
        let filename = format!("{}_{}.parquet", BARS_PREFIX, timestamp.format("%Y%m%d_%H%M%S"));
        self.output_dir.join(filename)
    }

    /// Path of the file currently being written
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|f| f.path.as_path())
    }

    /// Append bars, rotating first when the interval has elapsed
    pub fn write(&mut self, bars: &[PriceBar], now: DateTime<Utc>) -> anyhow::Result<()> {
        if bars.is_empty() {
            return Ok(());
        }
        if self.needs_rotation(now) {
            self.close()?;
            self.open(now)?;
        }

        let batch = to_batch(self.schema.clone(), bars)?;
        let file = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no open Parquet file"))?;
        file.writer.write(&batch)?;
        file.writer.flush()?;
        file.rows += bars.len();
        tracing::debug!(path = ?file.path, count = bars.len(), "Wrote bars to Parquet");
        Ok(())
    }

    fn open(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.file_path(now);
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let writer = ArrowWriter::try_new(File::create(&path)?, self.schema.clone(), Some(props))?;
        tracing::info!(path = ?path, "Opened capture file");
        self.current = Some(OpenFile {
            started: now,
            path,
            writer,
            rows: 0,
        });
        Ok(())
    }

    /// Finish the current file, if any
    pub fn close(&mut self) -> anyhow::Result<Option<PathBuf>> {
        let Some(file) = self.current.take() else {
            return Ok(None);
        };
        file.writer.close()?;
        tracing::info!(path = ?file.path, rows = file.rows, "Closed capture file");
        Ok(Some(file.path))
    }
}

/// Read every bar from one capture file
pub fn read_bars(path: &Path) -> anyhow::Result<Vec<PriceBar>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut bars = Vec::new();

    for batch in reader {
        let batch = batch?;
        let timestamps = batch
            .column(0)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .ok_or_else(|| anyhow::anyhow!("Invalid timestamp column"))?;
        let string_col = |i: usize, name: &str| {
            batch
                .column(i)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid {} column", name))
        };
        let tickers = string_col(1, "ticker")?;
        let opens = string_col(2, "open")?;
        let highs = string_col(3, "high")?;
        let lows = string_col(4, "low")?;
        let closes = string_col(5, "close")?;
        let volumes = batch
            .column(6)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .ok_or_else(|| anyhow::anyhow!("Invalid volume column"))?;

        for i in 0..batch.num_rows() {
            bars.push(PriceBar {
                ticker: tickers.value(i).to_string(),
                timestamp: DateTime::from_timestamp_micros(timestamps.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?,
                open: Decimal::from_str(opens.value(i))?,
                high: Decimal::from_str(highs.value(i))?,
                low: Decimal::from_str(lows.value(i))?,
                close: Decimal::from_str(closes.value(i))?,
                volume: volumes.value(i),
            });
        }
    }
    Ok(bars)
}

/// Bars from every `bars_*.parquet` file in `dir`, sorted by timestamp then ticker
pub fn read_bars_dir(dir: &Path) -> anyhow::Result<Vec<PriceBar>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension().is_some_and(|e| e == "parquet")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(BARS_PREFIX))
        })
        .collect();
    paths.sort();

    let mut bars = Vec::new();
    for path in &paths {
        bars.extend(read_bars(path)?);
    }
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.ticker.cmp(&b.ticker)));
    tracing::info!(files = paths.len(), bars = bars.len(), "Loaded captured bars");
    Ok(bars)
}

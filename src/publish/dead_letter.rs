//! JSON-lines dead-letter sink for batches that exhausted their retries

use super::types::{PublishError, TimeSeriesStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// One failed batch, one line in `<dir>/<table>.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub batch_id: Uuid,
    pub table: String,
    pub failed_at: DateTime<Utc>,
    pub attempts: u32,
    pub error: String,
    pub records: Vec<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub replayed: usize,
    pub remaining: usize,
}

pub struct DeadLetterSink {
    dir: PathBuf,
}

impl DeadLetterSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.jsonl"))
    }

    pub async fn write(&self, entry: &DeadLetterEntry) -> Result<(), PublishError> {
        fs::create_dir_all(&self.dir).await?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(&entry.table))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::warn!(
            table = %entry.table,
            batch_id = %entry.batch_id,
            records = entry.records.len(),
            "Batch dead-lettered"
        );
        Ok(())
    }

    /// Entries stored for `table`; unparseable lines are skipped
    pub async fn read(&self, table: &str) -> Result<Vec<DeadLetterEntry>, PublishError> {
        let path = self.path_for(table);
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).await?;
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| match serde_json::from_str(l) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(table, error = %e, "Skipping unreadable dead-letter line");
                    None
                }
            })
            .collect())
    }

    /// Tables with a dead-letter file, sorted
    pub async fn tables(&self) -> Result<Vec<String>, PublishError> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }
        let mut tables = Vec::new();
        let mut dir = fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "jsonl") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tables.push(stem.to_string());
                }
            }
        }
        tables.sort();
        Ok(tables)
    }

    /// Re-submit every entry once; failures stay in the file
    pub async fn replay(&self, store: &dyn TimeSeriesStore) -> Result<ReplayReport, PublishError> {
        let mut report = ReplayReport::default();

        for table in self.tables().await? {
            let mut remaining = Vec::new();
            for mut entry in self.read(&table).await? {
                match store.write_batch(&entry.table, &entry.records).await {
                    Ok(()) => report.replayed += 1,
                    Err(e) => {
                        entry.attempts += 1;
                        entry.error = e.to_string();
                        remaining.push(entry);
                    }
                }
            }

            report.remaining += remaining.len();
            let path = self.path_for(&table);
            if remaining.is_empty() {
                fs::remove_file(&path).await?;
            } else {
                let mut content = String::new();
                for entry in &remaining {
                    content.push_str(&serde_json::to_string(entry)?);
                    content.push('\n');
                }
                fs::write(&path, content).await?;
            }
        }

        tracing::info!(
            replayed = report.replayed,
            remaining = report.remaining,
            "Dead-letter replay finished"
        );
        Ok(report)
    }
}

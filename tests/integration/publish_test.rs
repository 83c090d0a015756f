//! Batch persistence with dead-lettering and replay

use premarket_scanner::config::StorageConfig;
use premarket_scanner::publish::{
    BatchWriter, DeadLetterSink, FlushOutcome, InMemoryTimeSeriesStore, SIGNALS_TABLE,
    UNIVERSE_TABLE,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn storage(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        batch_size: 10,
        max_attempts: 2,
        initial_backoff_ms: 1,
        dead_letter_dir: dir.path().to_path_buf(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_dead_lettered_batch_replays_later() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(InMemoryTimeSeriesStore::new());
    let writer = BatchWriter::new(store.clone(), &storage(&dir));

    store.fail_next(2);
    writer
        .push(SIGNALS_TABLE, vec![json!({"ticker": "XYZ"}), json!({"ticker": "ABC"})])
        .await
        .unwrap();
    let outcome = writer.flush_table(SIGNALS_TABLE).await.unwrap();
    assert_eq!(outcome, FlushOutcome::DeadLettered { records: 2, attempts: 2 });
    assert!(store.records(SIGNALS_TABLE).is_empty());

    // A fresh sink over the same directory sees what the writer left behind
    let sink = DeadLetterSink::new(dir.path());
    assert_eq!(sink.tables().await.unwrap(), vec![SIGNALS_TABLE.to_string()]);

    let report = sink.replay(store.as_ref()).await.unwrap();
    assert_eq!(report.replayed, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(store.records(SIGNALS_TABLE).len(), 2);
    assert!(sink.tables().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_replay_keeps_entry() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(InMemoryTimeSeriesStore::new());
    let writer = BatchWriter::new(store.clone(), &storage(&dir));

    store.fail_next(3);
    writer
        .write_batch(UNIVERSE_TABLE, vec![json!({"ticker": "XYZ"})])
        .await
        .unwrap();

    let sink = writer.dead_letter();
    let report = sink.replay(store.as_ref()).await.unwrap();
    assert_eq!(report.replayed, 0);
    assert_eq!(report.remaining, 1);

    let entries = sink.read(UNIVERSE_TABLE).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].attempts, 3);
}

//! Full-market snapshot sources

use super::types::Stock;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Upstream market-data collaborator for Tier 1
#[async_trait]
pub trait UniverseSource: Send + Sync {
    /// Latest full-market snapshot
    async fn fetch_snapshot(&self) -> anyhow::Result<Vec<Stock>>;
}

/// Snapshot endpoint bodies: a bare array or `{"stocks": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotBody {
    Rows(Vec<Stock>),
    Wrapped { stocks: Vec<Stock> },
}

/// Snapshot fetched over HTTP
pub struct HttpUniverseSource {
    url: String,
    client: Client,
}

impl HttpUniverseSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UniverseSource for HttpUniverseSource {
    async fn fetch_snapshot(&self) -> anyhow::Result<Vec<Stock>> {
        tracing::debug!(url = %self.url, "Fetching market snapshot");

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Snapshot API error: {} - {}", status, body);
        }

        let rows = match response.json::<SnapshotBody>().await? {
            SnapshotBody::Rows(rows) => rows,
            SnapshotBody::Wrapped { stocks } => stocks,
        };
        tracing::debug!(rows = rows.len(), "Fetched market snapshot");
        Ok(rows)
    }
}

/// Fixed snapshot held in memory; used by backtests and tests
#[derive(Default)]
pub struct StaticUniverseSource {
    snapshot: RwLock<Option<Vec<Stock>>>,
}

impl StaticUniverseSource {
    pub fn new(stocks: Vec<Stock>) -> Self {
        Self {
            snapshot: RwLock::new(Some(stocks)),
        }
    }

    pub fn set(&self, stocks: Vec<Stock>) {
        *self.snapshot.write() = Some(stocks);
    }

    /// Make subsequent fetches fail until `set` is called again
    pub fn set_unavailable(&self) {
        *self.snapshot.write() = None;
    }
}

#[async_trait]
impl UniverseSource for StaticUniverseSource {
    async fn fetch_snapshot(&self) -> anyhow::Result<Vec<Stock>> {
        self.snapshot
            .read()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("snapshot source unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_body_shapes() {
        let row = r#"{"ticker":"XYZ","price":"5.00","float_shares":10000000,"volume":100000,"high":"5.10","low":"4.90","close":"5.00"}"#;
        let bare: SnapshotBody = serde_json::from_str(&format!("[{row}]")).unwrap();
        let wrapped: SnapshotBody = serde_json::from_str(&format!("{{\"stocks\":[{row}]}}")).unwrap();
        assert!(matches!(bare, SnapshotBody::Rows(ref r) if r.len() == 1));
        assert!(matches!(wrapped, SnapshotBody::Wrapped { ref stocks } if stocks[0].ticker == "XYZ"));
    }

    #[tokio::test]
    async fn test_static_source_availability() {
        let source = StaticUniverseSource::new(Vec::new());
        assert!(source.fetch_snapshot().await.unwrap().is_empty());
        source.set_unavailable();
        assert!(source.fetch_snapshot().await.is_err());
    }

    #[test]
    fn test_http_source_creation() {
        let source =
            HttpUniverseSource::new("http://localhost:8080/snapshot", Duration::from_secs(5)).unwrap();
        assert_eq!(source.url(), "http://localhost:8080/snapshot");
    }
}

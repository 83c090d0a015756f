//! Run command implementation

use crate::config::Config;
use crate::feed::{MarketFeed, PolygonFeed};
use crate::pipeline::{Pipeline, Scanner};
use crate::publish::{BatchWriter, InMemoryCache, InMemoryTimeSeriesStore, Publisher};
use crate::universe::{HttpUniverseSource, StaticUniverseSource, UniverseCriteria, UniverseSelector, UniverseSource};
use crate::window::{Ingestor, WindowStore};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds between ingest queue gauge reports
    #[arg(long, default_value = "5")]
    pub stats_interval: u64,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = Arc::new(WindowStore::new(config.window.capacity, config.window.ordering));
        let ingestor = Arc::new(Ingestor::start(
            store.clone(),
            config.ingest.shards,
            config.ingest.queue_capacity,
            config.ingest.backpressure,
        ));

        let source: Arc<dyn UniverseSource> = match &config.universe.source_url {
            Some(url) => Arc::new(HttpUniverseSource::new(
                url.clone(),
                Duration::from_secs(config.universe.request_timeout_secs),
            )?),
            None => {
                tracing::warn!("No universe source configured, universe stays empty");
                Arc::new(StaticUniverseSource::new(Vec::new()))
            }
        };
        let selector = Arc::new(UniverseSelector::new(
            source,
            UniverseCriteria::from_config(&config.universe),
        ));
        let scanner = Arc::new(Scanner::from_config(config, store.clone())?);

        let writer = Arc::new(BatchWriter::new(
            Arc::new(InMemoryTimeSeriesStore::new()),
            &config.storage,
        ));
        let publisher = Arc::new(Publisher::new(
            Arc::new(InMemoryCache::new()),
            writer.clone(),
            Duration::from_secs(config.storage.cache_ttl_secs),
            config.signal.confidence_threshold,
        ));
        let pipeline = Arc::new(
            Pipeline::new(config.pipeline.clone(), selector, scanner).with_publisher(publisher),
        );

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut handles = pipeline.spawn(&shutdown_tx);
        handles.push(writer.clone().spawn_flusher(shutdown_tx.subscribe()));

        let feed = PolygonFeed::from_config(&config.feed)?;
        let events = feed.subscribe().await?;
        let pump = {
            let ingestor = ingestor.clone();
            tokio::spawn(async move { ingestor.pump(events).await })
        };

        let mut signals = pipeline.subscribe_signals();
        let mut stats = tokio::time::interval(Duration::from_secs(self.stats_interval.max(1)));
        tracing::info!("Scanner running, press Ctrl-C to stop");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = stats.tick() => {
                    ingestor.report_gauges();
                    tracing::debug!(
                        queue_depth = ingestor.queue_depth(),
                        dropped = ingestor.dropped(),
                        "Ingest stats"
                    );
                }
                received = signals.recv() => match received {
                    Ok(signal) => println!(
                        "{} {} {} confidence={} price={}",
                        signal.timestamp, signal.ticker, signal.signal_type, signal.confidence, signal.price
                    ),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Signal printer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        tracing::info!("Shutting down");
        let _ = shutdown_tx.send(());
        pump.abort();
        let _ = pump.await;
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Task failed during shutdown");
            }
        }
        match Arc::try_unwrap(ingestor) {
            Ok(ingestor) => ingestor.shutdown().await,
            Err(_) => tracing::warn!("Ingestor still shared, skipping drain"),
        }
        Ok(())
    }
}

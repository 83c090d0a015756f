//! Polygon-style stocks WebSocket feed

use super::socket::{spawn_socket, SocketEvent, SocketSettings};
use super::{normalize_frame, MarketEvent, MarketFeed};
use crate::config::FeedConfig;
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

/// Streaming aggregate/quote/trade feed
pub struct PolygonFeed {
    config: FeedConfig,
    api_key: String,
}

impl PolygonFeed {
    pub fn new(config: FeedConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            api_key: api_key.into(),
        }
    }

    /// Build from config, reading the API key from the configured env var
    pub fn from_config(config: &FeedConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!("feed API key variable {} is not set", config.api_key_env)
        })?;
        Ok(Self::new(config.clone(), api_key))
    }

    /// Auth then subscribe, replayed on every connect
    fn handshake(&self) -> Vec<String> {
        vec![
            json!({ "action": "auth", "params": self.api_key }).to_string(),
            json!({ "action": "subscribe", "params": self.config.subscriptions.join(",") })
                .to_string(),
        ]
    }

    async fn forward_events(
        mut socket: mpsc::Receiver<SocketEvent>,
        events: mpsc::Sender<MarketEvent>,
    ) {
        while let Some(event) = socket.recv().await {
            match event {
                SocketEvent::Frame(text) => {
                    let frame = normalize_frame(&text);
                    for status in &frame.status {
                        tracing::debug!(%status, "Feed status");
                    }
                    for event in frame.events {
                        if events.send(event).await.is_err() {
                            tracing::debug!("Event receiver dropped, stopping feed");
                            return;
                        }
                    }
                }
                SocketEvent::Connected => tracing::info!("Market feed connected and subscribed"),
                SocketEvent::Reconnecting { attempt, delay } => {
                    tracing::warn!(attempt, ?delay, "Market feed reconnecting");
                }
                SocketEvent::Closed => {
                    tracing::warn!("Market feed closed");
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl MarketFeed for PolygonFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<MarketEvent>> {
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_capacity.max(1));

        tracing::info!(
            url = %self.config.url,
            subscriptions = %self.config.subscriptions.join(","),
            "Subscribing to market feed"
        );

        let socket = spawn_socket(SocketSettings::from_config(&self.config, self.handshake()));
        tokio::spawn(Self::forward_events(socket, event_tx));

        Ok(event_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn feed(subscriptions: &[&str]) -> PolygonFeed {
        let config = FeedConfig {
            subscriptions: subscriptions.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        PolygonFeed::new(config, "secret")
    }

    #[test]
    fn test_handshake_messages() {
        let handshake = feed(&["AM.*", "Q.*"]).handshake();
        assert_eq!(handshake.len(), 2);

        let auth: serde_json::Value = serde_json::from_str(&handshake[0]).unwrap();
        assert_eq!(auth["action"], "auth");
        assert_eq!(auth["params"], "secret");

        let sub: serde_json::Value = serde_json::from_str(&handshake[1]).unwrap();
        assert_eq!(sub["action"], "subscribe");
        assert_eq!(sub["params"], "AM.*,Q.*");
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = FeedConfig {
            api_key_env: "SCANNER_TEST_UNSET_KEY_VAR".to_string(),
            ..Default::default()
        };
        assert!(PolygonFeed::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_forwards_valid_events_until_closed() {
        let (socket_tx, socket_rx) = mpsc::channel(16);
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let task = tokio::spawn(PolygonFeed::forward_events(socket_rx, event_tx));

        socket_tx.send(SocketEvent::Connected).await.unwrap();
        socket_tx
            .send(SocketEvent::Frame(
                r#"[{"ev":"T","sym":"XYZ","p":5.01,"s":200,"t":1700000000000},{"ev":"T","sym":"","p":1,"s":1,"t":1}]"#
                    .to_string(),
            ))
            .await
            .unwrap();
        socket_tx
            .send(SocketEvent::Reconnecting {
                attempt: 1,
                delay: Duration::from_millis(10),
            })
            .await
            .unwrap();
        socket_tx.send(SocketEvent::Closed).await.unwrap();
        task.await.unwrap();

        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.ticker(), "XYZ");
        // Sender dropped with the task
        assert!(event_rx.recv().await.is_none());
    }
}

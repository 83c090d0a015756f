//! Reconnecting feed socket
//!
//! One background task per socket: connect, send the handshake frames, stream
//! text frames to the caller and keep the session alive with pings. A dropped
//! session is retried with exponential backoff and the handshake is replayed,
//! since the server forgets authentication and subscriptions on reconnect.

use crate::config::FeedConfig;
use crate::retry::Backoff;
use crate::telemetry::{increment_counter, CounterMetric};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Connection settings for one feed socket
#[derive(Debug, Clone)]
pub struct SocketSettings {
    pub url: String,
    /// Frames sent, in order, after every successful connect
    pub handshake: Vec<String>,
    /// 0 = retry forever
    pub max_reconnect_attempts: u32,
    pub initial_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub ping_interval: Duration,
    pub channel_capacity: usize,
}

impl SocketSettings {
    pub fn from_config(config: &FeedConfig, handshake: Vec<String>) -> Self {
        Self {
            url: config.url.clone(),
            handshake,
            max_reconnect_attempts: config.max_reconnect_attempts,
            initial_reconnect_delay: Duration::from_millis(config.initial_reconnect_delay_ms),
            max_reconnect_delay: Duration::from_millis(config.max_reconnect_delay_ms),
            ping_interval: PING_INTERVAL,
            channel_capacity: config.channel_capacity.max(1),
        }
    }
}

/// What the socket task reports to its reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Connected and handshake sent
    Connected,
    /// Inbound text frame
    Frame(String),
    /// Session dropped; next connect after `delay`
    Reconnecting { attempt: u32, delay: Duration },
    /// Socket task finished; no more events follow
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },
    #[error("send failed: {0}")]
    Send(String),
    #[error("read failed: {0}")]
    Read(String),
    #[error("server closed the session")]
    ServerClosed,
    #[error("no pong within {0:?}")]
    PongTimeout(Duration),
    #[error("gave up after {0} reconnect attempts")]
    GaveUp(u32),
}

/// Spawn the socket task and return its event stream
///
/// The task stops when the receiver is dropped or the reconnect budget runs
/// out; either way a final `Closed` is attempted.
pub fn spawn_socket(settings: SocketSettings) -> mpsc::Receiver<SocketEvent> {
    let (tx, rx) = mpsc::channel(settings.channel_capacity);
    tokio::spawn(async move {
        if let Err(e) = run(&settings, &tx).await {
            tracing::error!(url = %settings.url, error = %e, "Feed socket stopped");
        }
        let _ = tx.send(SocketEvent::Closed).await;
    });
    rx
}

async fn run(settings: &SocketSettings, tx: &mpsc::Sender<SocketEvent>) -> Result<(), SocketError> {
    let mut backoff = Backoff::new(
        settings.initial_reconnect_delay,
        settings.max_reconnect_delay,
    );

    loop {
        let error = match session(settings, tx, &mut backoff).await {
            // Reader went away
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        let attempt = backoff.attempts() + 1;
        if settings.max_reconnect_attempts > 0 && attempt > settings.max_reconnect_attempts {
            return Err(SocketError::GaveUp(settings.max_reconnect_attempts));
        }
        let delay = backoff.next_delay();
        tracing::warn!(error = %error, attempt, delay_ms = delay.as_millis() as u64, "Feed session dropped");
        increment_counter(CounterMetric::FeedReconnects, 1);

        if tx.send(SocketEvent::Reconnecting { attempt, delay }).await.is_err() {
            return Ok(());
        }
        tokio::time::sleep(delay).await;
    }
}

/// One connected session; `Ok` only when the reader is gone
async fn session(
    settings: &SocketSettings,
    tx: &mpsc::Sender<SocketEvent>,
    backoff: &mut Backoff,
) -> Result<(), SocketError> {
    tracing::info!(url = %settings.url, "Connecting feed socket");
    let (stream, _) = connect_async(&settings.url)
        .await
        .map_err(|e| SocketError::Connect {
            url: settings.url.clone(),
            reason: e.to_string(),
        })?;
    let (mut write, mut read) = stream.split();

    for frame in &settings.handshake {
        write
            .send(Message::Text(frame.clone()))
            .await
            .map_err(|e| SocketError::Send(e.to_string()))?;
    }
    backoff.reset();
    if tx.send(SocketEvent::Connected).await.is_err() {
        return Ok(());
    }

    let mut ping = tokio::time::interval(settings.ping_interval);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick fires immediately
    ping.tick().await;
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if tx.send(SocketEvent::Frame(text)).await.is_err() {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    write
                        .send(Message::Pong(payload))
                        .await
                        .map_err(|e| SocketError::Send(e.to_string()))?;
                }
                Some(Ok(Message::Pong(_))) => awaiting_pong = false,
                Some(Ok(Message::Close(_))) | None => return Err(SocketError::ServerClosed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(SocketError::Read(e.to_string())),
            },
            _ = ping.tick() => {
                if awaiting_pong {
                    return Err(SocketError::PongTimeout(settings.ping_interval));
                }
                write
                    .send(Message::Ping(Vec::new()))
                    .await
                    .map_err(|e| SocketError::Send(e.to_string()))?;
                awaiting_pong = true;
            }
        }
    }
}

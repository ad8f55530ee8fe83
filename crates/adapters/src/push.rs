// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push client — authenticated websocket subscriber.
//!
//! Mints a ticket through the gateway, opens the socket with the ticket as a
//! query parameter, and forwards `task.available` frames to local listeners.
//! Reconnects with capped exponential backoff; `stop()` disables reconnects
//! and closes the socket.

use crate::gateway::GatewayClient;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Keepalive frame sent on the ping interval.
const PING_FRAME: &str = r#"{"type":"ping"}"#;

/// Reconnect delay cap.
const MAX_RECONNECT_DELAY_MS: u64 = 30_000;

/// Configuration for the push client.
#[derive(Debug, Clone)]
pub struct PushClientConfig {
    pub ws_url: String,
    pub base_backoff: Duration,
    pub ping_interval: Duration,
}

impl PushClientConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            base_backoff: Duration::from_secs(1),
            ping_interval: Duration::from_secs(20),
        }
    }
}

/// Events surfaced to local listeners.
#[derive(Debug, Clone)]
pub enum PushEvent {
    Connected,
    Disconnected,
    Error(String),
    TaskAvailable(TaskAvailable),
}

/// Payload of a `task.available` frame.
#[derive(Debug, Clone)]
pub struct TaskAvailable {
    pub task_id: String,
    pub stream_id: Option<String>,
    pub payload: Value,
}

/// Compute the reconnect delay for the given attempt number.
///
/// `min(30_000, max(base, base * 2^attempt))`, saturating.
pub fn reconnect_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let exponential = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    exponential.max(base_ms).min(MAX_RECONNECT_DELAY_MS)
}

/// Parse a server frame; only `task.available` yields an event.
pub fn parse_push_frame(text: &str) -> Option<TaskAvailable> {
    let json: Value = serde_json::from_str(text).ok()?;
    if json.get("type").and_then(Value::as_str) != Some("task.available") {
        return None;
    }
    Some(TaskAvailable {
        task_id: json
            .get("taskId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        stream_id: json
            .get("streamId")
            .and_then(Value::as_str)
            .map(str::to_string),
        payload: json,
    })
}

/// Websocket subscriber with automatic reconnect.
pub struct PushClient {
    gateway: GatewayClient,
    config: PushClientConfig,
    stop: CancellationToken,
}

impl PushClient {
    pub fn new(gateway: GatewayClient, config: PushClientConfig) -> Self {
        Self {
            gateway,
            config,
            stop: CancellationToken::new(),
        }
    }

    /// Disable reconnects and close the socket.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Start the connection loop; events arrive on the returned channel.
    pub fn start(&self) -> mpsc::Receiver<PushEvent> {
        let (tx, rx) = mpsc::channel(64);
        let gateway = self.gateway.clone();
        let config = self.config.clone();
        let stop = self.stop.clone();
        tokio::spawn(run_loop(gateway, config, stop, tx));
        rx
    }
}

async fn run_loop(
    gateway: GatewayClient,
    config: PushClientConfig,
    stop: CancellationToken,
    tx: mpsc::Sender<PushEvent>,
) {
    let mut attempt: u32 = 0;
    loop {
        if stop.is_cancelled() {
            break;
        }

        connect_once(&gateway, &config, &stop, &tx, &mut attempt).await;

        if stop.is_cancelled() {
            break;
        }

        let delay = Duration::from_millis(reconnect_delay_ms(
            config.base_backoff.as_millis() as u64,
            attempt,
        ));
        attempt = attempt.saturating_add(1);
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "push reconnect scheduled");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stop.cancelled() => break,
        }
    }
}

/// One connection attempt plus its read loop. Resets `attempt` on open.
async fn connect_once(
    gateway: &GatewayClient,
    config: &PushClientConfig,
    stop: &CancellationToken,
    tx: &mpsc::Sender<PushEvent>,
    attempt: &mut u32,
) {
    let ticket = match gateway.mint_push_ticket().await {
        Ok(ticket) => ticket,
        Err(e) => {
            let _ = tx.send(PushEvent::Error(e.to_string())).await;
            return;
        }
    };

    let url = format!("{}?ticket={}", config.ws_url, ticket);
    let (ws, _) = match connect_async(url).await {
        Ok(conn) => conn,
        Err(e) => {
            let _ = tx.send(PushEvent::Error(e.to_string())).await;
            return;
        }
    };

    *attempt = 0;
    let _ = tx.send(PushEvent::Connected).await;
    tracing::info!("push client connected");

    let (mut write, mut read) = ws.split();
    let mut ping = tokio::time::interval_at(
        tokio::time::Instant::now() + config.ping_interval,
        config.ping_interval,
    );

    loop {
        tokio::select! {
            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = parse_push_frame(text.as_str()) {
                            let _ = tx.send(PushEvent::TaskAvailable(event)).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = tx.send(PushEvent::Disconnected).await;
                        return;
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(PushEvent::Error(e.to_string())).await;
                        let _ = tx.send(PushEvent::Disconnected).await;
                        return;
                    }
                    _ => {} // Ping/Pong/Binary — ignore
                }
            }
            _ = ping.tick() => {
                if write.send(Message::Text(PING_FRAME.into())).await.is_err() {
                    let _ = tx.send(PushEvent::Disconnected).await;
                    return;
                }
            }
            _ = stop.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod tests;

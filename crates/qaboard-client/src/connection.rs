//! Push connection lifecycle: state machine plus the socket task driving it.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use qaboard_sync::{
    decode_push_bytes, decode_push_frame, truncate_frame_for_log, PushDecodeError, PushEvent,
};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use crate::reconnect::ReconnectPolicy;

pub const PUSH_STREAM_PATH: &str = "/ws/questions";
pub const DEFAULT_KEEPALIVE_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_KEEPALIVE_PAYLOAD: &str = "ping";
pub const CONNECTION_ERROR_MESSAGE: &str = "WebSocket connection error";
const MALFORMED_FRAME_LOG_CHARS: usize = 256;

/// Push stream URL for an HTTP api base: `http` becomes `ws`, `https`
/// becomes `wss`, and the push path is appended.
pub fn push_url_from_api_base(api_base: &str) -> String {
    let base = api_base.trim().trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}{PUSH_STREAM_PATH}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Human-readable connectivity flag. Survives a close; cleared by a new
    /// attempt or a successful open.
    pub error: Option<String>,
    /// Connection attempts since the last successful open.
    pub attempts: u32,
}

impl ConnectionStatus {
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }
}

#[derive(Debug, Default)]
pub struct ConnectionTracker {
    status: ConnectionStatus,
}

impl ConnectionTracker {
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn begin_connect(&mut self) {
        self.status.state = ConnectionState::Connecting;
        self.status.error = None;
        self.status.attempts = self.status.attempts.saturating_add(1);
    }

    pub fn opened(&mut self) {
        self.status.state = ConnectionState::Open;
        self.status.error = None;
        self.status.attempts = 0;
    }

    /// Transport error. Records the flag without changing state.
    pub fn errored(&mut self, message: &str) {
        self.status.error = Some(message.to_string());
    }

    pub fn closed(&mut self) {
        self.status.state = ConnectionState::Disconnected;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub ws_url: String,
    pub keepalive_interval: Duration,
    pub keepalive_payload: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ws_url: push_url_from_api_base(crate::api_client::DEFAULT_API_BASE),
            keepalive_interval: Duration::from_millis(DEFAULT_KEEPALIVE_INTERVAL_MS),
            keepalive_payload: DEFAULT_KEEPALIVE_PAYLOAD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What the connection task reports to its session, in delivery order.
pub enum ConnectionUpdate {
    Status(ConnectionStatus),
    Event(PushEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SocketExit {
    Shutdown,
    SessionGone,
    Closed { was_open: bool },
    Failed { was_open: bool, reason: String },
}

/// Decodes one inbound message. Control frames yield `Ok(None)`.
pub fn decode_push_message(message: &WsMessage) -> Result<Option<PushEvent>, PushDecodeError> {
    match message {
        WsMessage::Text(text) => decode_push_frame(text.as_str()).map(Some),
        WsMessage::Binary(bytes) => decode_push_bytes(bytes).map(Some),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => {
            Ok(None)
        }
    }
}

/// Runs the push connection until shutdown, session teardown, or the
/// reconnect policy gives up.
pub async fn run_push_connection(
    config: ConnectionConfig,
    policy: Arc<dyn ReconnectPolicy>,
    updates: mpsc::Sender<ConnectionUpdate>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tracker = ConnectionTracker::default();
    // Reconnects scheduled since the last successful open.
    let mut retries: u32 = 0;
    loop {
        tracker.begin_connect();
        if !publish_status(&updates, &tracker).await {
            return;
        }
        let exit = run_socket_session(&config, &mut tracker, &updates, &mut shutdown).await;
        if matches!(
            exit,
            SocketExit::Closed { was_open: true } | SocketExit::Failed { was_open: true, .. }
        ) {
            retries = 0;
        }
        match &exit {
            SocketExit::Shutdown | SocketExit::SessionGone => {
                tracker.closed();
                let _ = updates.try_send(ConnectionUpdate::Status(tracker.status().clone()));
                return;
            }
            SocketExit::Closed { was_open } => {
                info!(url = %config.ws_url, was_open, "push connection closed");
            }
            SocketExit::Failed { was_open, reason } => {
                warn!(url = %config.ws_url, was_open, %reason, "push connection error");
                tracker.errored(CONNECTION_ERROR_MESSAGE);
            }
        }
        tracker.closed();
        if !publish_status(&updates, &tracker).await {
            return;
        }

        retries = retries.saturating_add(1);
        let Some(delay) = policy.next_delay(retries) else {
            debug!(policy = policy.name(), "push connection not retried");
            return;
        };
        info!(
            policy = policy.name(),
            attempt = retries,
            delay_ms = delay.as_millis() as u64,
            "scheduling push reconnect"
        );
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn run_socket_session(
    config: &ConnectionConfig,
    tracker: &mut ConnectionTracker,
    updates: &mpsc::Sender<ConnectionUpdate>,
    shutdown: &mut watch::Receiver<bool>,
) -> SocketExit {
    let connected = tokio::select! {
        _ = wait_for_shutdown(shutdown) => return SocketExit::Shutdown,
        connected = connect_async(config.ws_url.as_str()) => connected,
    };
    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(error) => {
            return SocketExit::Failed {
                was_open: false,
                reason: error.to_string(),
            }
        }
    };
    let (mut sink, mut source) = stream.split();
    tracker.opened();
    info!(url = %config.ws_url, "push connection open");
    if !publish_status(updates, tracker).await {
        let _ = sink.close().await;
        return SocketExit::SessionGone;
    }

    let mut keepalive = tokio::time::interval(config.keepalive_interval.max(Duration::from_millis(1)));
    keepalive.tick().await;

    loop {
        tokio::select! {
            _ = wait_for_shutdown(shutdown) => {
                if let Err(error) = sink.close().await {
                    debug!(%error, "failed to close push connection cleanly");
                }
                return SocketExit::Shutdown;
            }
            inbound = source.next() => {
                let Some(inbound) = inbound else {
                    return SocketExit::Closed { was_open: true };
                };
                let message = match inbound {
                    Ok(message) => message,
                    Err(error) => {
                        return SocketExit::Failed {
                            was_open: true,
                            reason: error.to_string(),
                        };
                    }
                };
                if let WsMessage::Close(_) = message {
                    return SocketExit::Closed { was_open: true };
                }
                match decode_push_message(&message) {
                    Ok(Some(event)) => {
                        if updates.send(ConnectionUpdate::Event(event)).await.is_err() {
                            let _ = sink.close().await;
                            return SocketExit::SessionGone;
                        }
                    }
                    Ok(None) => {}
                    Err(error) => log_malformed_frame(&message, &error),
                }
            }
            _ = keepalive.tick() => {
                let payload = WsMessage::Text(config.keepalive_payload.clone().into());
                if let Err(error) = sink.send(payload).await {
                    debug!(%error, "push keepalive send failed");
                }
            }
        }
    }
}

fn log_malformed_frame(message: &WsMessage, error: &PushDecodeError) {
    let frame = match message {
        WsMessage::Text(text) => truncate_frame_for_log(text.as_str(), MALFORMED_FRAME_LOG_CHARS),
        WsMessage::Binary(bytes) => truncate_frame_for_log(
            &String::from_utf8_lossy(bytes),
            MALFORMED_FRAME_LOG_CHARS,
        ),
        _ => String::new(),
    };
    warn!(
        reason_code = error.reason_code(),
        %error,
        %frame,
        "ignoring malformed push frame"
    );
}

async fn publish_status(
    updates: &mpsc::Sender<ConnectionUpdate>,
    tracker: &ConnectionTracker,
) -> bool {
    updates
        .send(ConnectionUpdate::Status(tracker.status().clone()))
        .await
        .is_ok()
}

/// Resolves once shutdown is signalled or the signalling side is dropped.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

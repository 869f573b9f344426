//! `RoomTransport` over a JSON websocket.
//!
//! One driver task per socket owns the connection: it writes outbound frames,
//! routes `ack` frames to the waiting request and forwards every other frame
//! to the event channel. When the connection drops the driver reopens it and
//! emits `RoomEvent::Reconnected`; the connection manager then rejoins.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde_json::{Value, json};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot},
    task::AbortHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use uuid::Uuid;

use crate::{
    domain::{RoomEvent, RoomEventSender, RoomSocket, RoomSocketError, RoomTransport},
    infrastructure::dto::{
        conversion::{DecodedFrame, decode_room_frame},
        room_socket::{JoinRoomPayload, JoinRoomRequest, OutboundType},
    },
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type AckResult = Result<Value, String>;
type PendingAcks = Arc<Mutex<HashMap<String, oneshot::Sender<AckResult>>>>;

/// How a dropped socket is reopened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RECONNECT_ATTEMPTS,
            interval: Duration::from_secs(RECONNECT_INTERVAL_SECS),
        }
    }
}

/// Opens websocket connections to the room service
#[derive(Debug, Clone)]
pub struct WebSocketRoomTransport {
    url: String,
    policy: ReconnectPolicy,
}

impl WebSocketRoomTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_policy(url, ReconnectPolicy::default())
    }

    pub fn with_policy(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
        }
    }
}

#[async_trait]
impl RoomTransport for WebSocketRoomTransport {
    async fn open(&self, events: RoomEventSender) -> Result<Arc<dyn RoomSocket>, RoomSocketError> {
        let (sink, source) = connect(&self.url).await?;
        tracing::info!("Connected to room socket at {}", self.url);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let pending = PendingAcks::default();
        let driver = tokio::spawn(drive_socket(
            Connection { sink, source },
            self.url.clone(),
            self.policy,
            outbound_rx,
            pending.clone(),
            events,
        ));

        Ok(Arc::new(WebSocketRoomSocket {
            outbound: outbound_tx,
            pending,
            driver: driver.abort_handle(),
        }))
    }
}

/// Handle to an open room socket
struct WebSocketRoomSocket {
    outbound: mpsc::UnboundedSender<String>,
    pending: PendingAcks,
    driver: AbortHandle,
}

/// Removes a pending request when its caller stops waiting
struct PendingGuard<'a> {
    pending: &'a PendingAcks,
    id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.id);
    }
}

#[async_trait]
impl RoomSocket for WebSocketRoomSocket {
    async fn join_room(&self, token: &str, room_uuid: &str) -> Result<Value, RoomSocketError> {
        let id = Uuid::new_v4().to_string();
        let request = JoinRoomRequest {
            r#type: OutboundType::JoinRoom,
            id: id.clone(),
            token: token.to_string(),
            payload: JoinRoomPayload {
                room_uuid: room_uuid.to_string(),
            },
        };
        let frame =
            serde_json::to_string(&request).map_err(|e| RoomSocketError::Protocol(e.to_string()))?;

        let (ack_tx, ack_rx) = oneshot::channel();
        lock(&self.pending).insert(id.clone(), ack_tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        self.outbound
            .send(frame)
            .map_err(|_| RoomSocketError::Closed)?;

        match ack_rx.await {
            Ok(Ok(state)) => Ok(state),
            Ok(Err(reason)) => Err(RoomSocketError::Rejected(reason)),
            Err(_) => Err(RoomSocketError::Closed),
        }
    }

    fn close(&self) {
        self.driver.abort();
        lock(&self.pending).clear();
    }
}

struct Connection {
    sink: WsSink,
    source: WsSource,
}

/// Why the pump loop stopped
enum PumpEnd {
    /// Every socket handle is gone
    Released,
    /// The connection dropped
    Dropped(String),
}

async fn connect(url: &str) -> Result<(WsSink, WsSource), RoomSocketError> {
    let (stream, _response) = connect_async(url)
        .await
        .map_err(|e| RoomSocketError::Connect(e.to_string()))?;
    Ok(stream.split())
}

async fn drive_socket(
    mut connection: Connection,
    url: String,
    policy: ReconnectPolicy,
    mut outbound: mpsc::UnboundedReceiver<String>,
    pending: PendingAcks,
    events: RoomEventSender,
) {
    loop {
        match pump(&mut connection, &mut outbound, &pending, &events).await {
            PumpEnd::Released => {
                let _ = connection.sink.close().await;
                tracing::debug!("Room socket released");
                return;
            }
            PumpEnd::Dropped(reason) => {
                tracing::warn!("Room socket dropped: {}", reason);
                // In-flight requests fail with `Closed`.
                lock(&pending).clear();
                if events
                    .send(RoomEvent::SocketError(json!({ "reason": reason })))
                    .is_err()
                {
                    return;
                }
            }
        }

        match reopen(&url, policy).await {
            Some((sink, source)) => {
                connection = Connection { sink, source };
                tracing::info!("Room socket reconnected");
                if events.send(RoomEvent::Reconnected).is_err() {
                    return;
                }
            }
            None => {
                tracing::error!(
                    "Failed to reopen room socket after {} attempts",
                    policy.max_attempts
                );
                let _ = events.send(RoomEvent::Closed);
                return;
            }
        }
    }
}

async fn pump(
    connection: &mut Connection,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    pending: &PendingAcks,
    events: &RoomEventSender,
) -> PumpEnd {
    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    return PumpEnd::Released;
                };
                if let Err(e) = connection.sink.send(Message::Text(frame.into())).await {
                    return PumpEnd::Dropped(e.to_string());
                }
            }
            message = connection.source.next() => match message {
                Some(Ok(Message::Text(text))) => route_frame(text.as_str(), pending, events),
                Some(Ok(Message::Close(_))) | None => {
                    return PumpEnd::Dropped("connection closed by server".to_string());
                }
                Some(Err(e)) => return PumpEnd::Dropped(e.to_string()),
                Some(Ok(_)) => {}
            },
        }
    }
}

fn route_frame(text: &str, pending: &PendingAcks, events: &RoomEventSender) {
    match decode_room_frame(text) {
        Ok(DecodedFrame::Ack { id, result }) => match lock(pending).remove(&id) {
            Some(waiter) => {
                let _ = waiter.send(result);
            }
            None => tracing::debug!("Dropping ack for unknown request '{}'", id),
        },
        Ok(DecodedFrame::Event(event)) => {
            // The receiver is gone only after disconnect.
            let _ = events.send(event);
        }
        Err(e) => tracing::warn!("Failed to decode room frame: {} ({})", e, text),
    }
}

async fn reopen(url: &str, policy: ReconnectPolicy) -> Option<(WsSink, WsSource)> {
    for attempt in 1..=policy.max_attempts {
        tracing::info!(
            "Reopening room socket in {:?}... (attempt {}/{})",
            policy.interval,
            attempt,
            policy.max_attempts
        );
        tokio::time::sleep(policy.interval).await;

        match connect(url).await {
            Ok(connection) => return Some(connection),
            Err(e) => tracing::warn!("Room socket reconnect failed: {}", e),
        }
    }
    None
}

fn lock(pending: &PendingAcks) -> MutexGuard<'_, HashMap<String, oneshot::Sender<AckResult>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

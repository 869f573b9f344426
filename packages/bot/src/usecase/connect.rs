//! UseCase: チャットとルームへの接続管理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectionManager::connect() / process_events() / disconnect() / get_connection_status()
//! - チャット参加 → ソケット作成 → ルーム参加の順序と、再接続時の再参加
//!
//! ### なぜこのテストが必要か
//! - ルーム参加のタイムアウトが通常の参加エラーと区別できることを保証
//! - 再接続時にルーム状態がマージではなく丸ごと置き換えられることを確認
//! - パッチと再接続が 1 つのイベントループで順番に処理されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：接続、イベント処理、再接続
//! - 異常系：チャット参加失敗、ルーム参加の拒否・タイムアウト、再参加の失敗
//! - エッジケース：二重の切断、未接続での状態取得

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::domain::{
    ChatService, DiagnosticSink, MessageId, RoomEvent, RoomSocket, RoomStateStore, RoomTransport,
    StatusStore, Timestamp, streams,
};

use super::{error::ConnectError, sync_state::StateSynchronizer};

pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Receiver half of the room event channel
pub type RoomEventReceiver = mpsc::UnboundedReceiver<RoomEvent>;

/// 接続のフェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    JoiningChat,
    SocketCreated,
    JoiningRoom,
    Connected,
    /// 再接続後にルームへ再参加中
    Rejoining,
    /// 再参加に失敗し、古い状態のまま接続中
    Degraded,
}

impl ConnectionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected | Self::Rejoining | Self::Degraded)
    }
}

/// 接続状態のスナップショット
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub has_state: bool,
    pub last_message_id: Option<MessageId>,
    pub last_timestamp: Option<Timestamp>,
}

/// 接続に使う識別子と資格情報
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub chat_room_id: String,
    pub room_token: String,
    pub room_uuid: String,
    pub join_timeout: Duration,
}

/// 接続管理のユースケース
pub struct ConnectionManager {
    chat: Arc<dyn ChatService>,
    transport: Arc<dyn RoomTransport>,
    room_state: Arc<RoomStateStore>,
    status: Arc<dyn StatusStore>,
    diagnostics: Arc<dyn DiagnosticSink>,
    synchronizer: StateSynchronizer,
    settings: ConnectionSettings,
    socket: Mutex<Option<Arc<dyn RoomSocket>>>,
    phase: watch::Sender<ConnectionPhase>,
}

impl ConnectionManager {
    pub fn new(
        chat: Arc<dyn ChatService>,
        transport: Arc<dyn RoomTransport>,
        room_state: Arc<RoomStateStore>,
        status: Arc<dyn StatusStore>,
        diagnostics: Arc<dyn DiagnosticSink>,
        settings: ConnectionSettings,
    ) -> Self {
        let (phase, _) = watch::channel(ConnectionPhase::Disconnected);
        Self {
            chat,
            transport,
            synchronizer: StateSynchronizer::new(room_state.clone()),
            room_state,
            status,
            diagnostics,
            settings,
            socket: Mutex::new(None),
            phase,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        *self.phase.borrow()
    }

    /// フェーズの変化を監視する
    pub fn subscribe(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase.subscribe()
    }

    /// チャット参加 → ソケット作成 → ルーム参加を順に実行する
    ///
    /// # Returns
    ///
    /// * `Ok(RoomEventReceiver)` - `process_events` に渡すイベントの受信側
    /// * `Err(ConnectError)` - いずれかの段階で失敗（接続は破棄される）
    pub async fn connect(&self) -> Result<RoomEventReceiver, ConnectError> {
        let result = self.try_connect().await;
        if let Err(e) = &result {
            tracing::error!("Connect failed: {}", e);
            self.disconnect();
        }
        result
    }

    async fn try_connect(&self) -> Result<RoomEventReceiver, ConnectError> {
        // 途中で disconnect() された場合は結果を捨てる
        let epoch = self.room_state.epoch();

        // 1. チャットルームに参加
        self.set_phase(ConnectionPhase::JoiningChat);
        let room_id = &self.settings.chat_room_id;
        self.chat
            .join(room_id)
            .await
            .map_err(|source| ConnectError::ChatJoin {
                room_id: room_id.clone(),
                source,
            })?;
        tracing::info!("Joined chat room '{}'", room_id);

        // 2. ルームのソケットを作成
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let socket = self
            .transport
            .open(events_tx)
            .await
            .map_err(ConnectError::SocketOpen)?;
        if let Some(previous) = self.swap_socket(Some(socket.clone())) {
            previous.close();
        }
        self.set_phase(ConnectionPhase::SocketCreated);

        // 3. ルームに参加して状態を取得
        self.set_phase(ConnectionPhase::JoiningRoom);
        let state = self.join_room(socket.as_ref()).await?;
        if !self.room_state.replace_if_current(epoch, state) {
            return Err(ConnectError::Interrupted);
        }
        self.set_phase(ConnectionPhase::Connected);
        tracing::info!("Joined room '{}'", self.settings.room_uuid);

        Ok(events_rx)
    }

    /// タイムアウト付きでルームに参加する
    async fn join_room(&self, socket: &dyn RoomSocket) -> Result<Value, ConnectError> {
        let timeout = self.settings.join_timeout;
        let join = socket.join_room(&self.settings.room_token, &self.settings.room_uuid);

        match tokio::time::timeout(timeout, join).await {
            Ok(Ok(state)) => Ok(state),
            Ok(Err(source)) => Err(ConnectError::RoomJoin {
                room_uuid: self.settings.room_uuid.clone(),
                source,
            }),
            Err(_) => Err(ConnectError::JoinTimeout(timeout)),
        }
    }

    /// ソケットのイベントを 1 つずつ順番に処理する
    ///
    /// ルーム状態を書き換えるのはこのループのみ。チャンネルが閉じるか
    /// `RoomEvent::Closed` を受け取ると終了する
    pub async fn process_events(&self, mut events: RoomEventReceiver) {
        while let Some(event) = events.recv().await {
            match event {
                RoomEvent::StateChanged { name, patch, raw } => {
                    self.diagnostics.record(streams::STATEFUL_EVENT, &raw).await;
                    self.synchronizer.apply(&name, patch.as_ref());
                }
                RoomEvent::Stateless { name, raw } => {
                    tracing::debug!(event = %name, "Received stateless event");
                    self.diagnostics.record(streams::STATELESS_EVENT, &raw).await;
                }
                RoomEvent::ServerMessage { name, raw } => {
                    tracing::debug!(event = %name, "Received server message");
                    self.diagnostics.record(streams::SERVER_MESSAGE, &raw).await;
                }
                RoomEvent::SocketError(error) => {
                    tracing::warn!("Room socket error: {}", error);
                    self.diagnostics.record(streams::SOCKET_ERROR, &error).await;
                }
                RoomEvent::Reconnected => self.rejoin().await,
                RoomEvent::Closed => {
                    tracing::warn!("Room socket closed for good");
                    break;
                }
            }
        }
        tracing::debug!("Room event loop finished");
    }

    /// 再接続後にルームへ再参加し、状態を丸ごと置き換える
    ///
    /// 失敗しても古い状態を保持したまま処理を続ける
    async fn rejoin(&self) {
        let Some(socket) = self.current_socket() else {
            tracing::debug!("Ignoring reconnect: not connected");
            return;
        };

        let epoch = self.room_state.epoch();
        self.set_phase(ConnectionPhase::Rejoining);
        tracing::info!("Rejoining room '{}'", self.settings.room_uuid);

        match self.join_room(socket.as_ref()).await {
            Ok(state) => {
                if self.room_state.replace_if_current(epoch, state) {
                    self.set_phase(ConnectionPhase::Connected);
                    tracing::info!("Rejoined room, state replaced");
                } else {
                    tracing::info!("Discarding rejoin result: disconnected meanwhile");
                }
            }
            Err(e) => {
                if self.room_state.epoch() == epoch {
                    self.set_phase(ConnectionPhase::Degraded);
                }
                tracing::error!("Failed to rejoin room, keeping previous state: {}", e);
            }
        }
    }

    /// ソケットとルーム状態を破棄する
    ///
    /// 何度呼んでもよく、処理中の操作を待たない
    pub fn disconnect(&self) {
        if let Some(socket) = self.swap_socket(None) {
            socket.close();
            tracing::info!("Disconnected from room");
        }
        self.room_state.clear();
        self.set_phase(ConnectionPhase::Disconnected);
    }

    /// 現在の接続状態を返す
    pub fn get_connection_status(&self) -> ConnectionStatus {
        let cursor = self.status.public_cursor();
        ConnectionStatus {
            is_connected: self.phase().is_connected() && self.current_socket().is_some(),
            has_state: self.room_state.has_state(),
            last_message_id: cursor.last_message_id,
            last_timestamp: cursor.last_timestamp,
        }
    }

    fn set_phase(&self, phase: ConnectionPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            tracing::debug!("Connection phase: {:?} -> {:?}", previous, phase);
        }
    }

    fn current_socket(&self) -> Option<Arc<dyn RoomSocket>> {
        self.socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn swap_socket(&self, socket: Option<Arc<dyn RoomSocket>>) -> Option<Arc<dyn RoomSocket>> {
        let mut slot = self.socket.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, socket)
    }
}

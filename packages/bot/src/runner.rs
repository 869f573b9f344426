//! Bot execution logic with reconnection support.

use std::{future::Future, sync::Arc, time::Duration};

use roomlink_shared::time::SystemClock;

use crate::{
    config::BotConfig,
    domain::{BotServices, ChatService, ChatServiceError, CommandParser, RoomStateStore},
    infrastructure::{
        DiagnosticLogger, HttpChatService, InMemoryStatusStore, PrefixCommandParser,
        ReconnectPolicy, WebSocketRoomTransport, builtin_registry,
    },
    usecase::{
        CommandDispatcher, ConnectError, ConnectionManager, ConnectionSettings, MessagePoller,
        RoomEventReceiver,
    },
};

/// A fully wired bot, ready to run
pub struct Bot {
    manager: Arc<ConnectionManager>,
    poller: MessagePoller,
    room_state: Arc<RoomStateStore>,
    poll_interval: Duration,
    retry: ReconnectPolicy,
}

impl Bot {
    /// Wire every component from `config`
    pub fn from_config(config: &BotConfig) -> Result<Self, ChatServiceError> {
        let chat: Arc<dyn ChatService> = Arc::new(HttpChatService::new(
            &config.chat_url,
            config.chat_token.clone(),
        )?);
        let transport = Arc::new(WebSocketRoomTransport::new(config.room_socket_url.clone()));
        let room_state = Arc::new(RoomStateStore::new());
        let status = Arc::new(InMemoryStatusStore::new());
        let diagnostics = Arc::new(DiagnosticLogger::new(
            config.log_dir.clone(),
            config.diagnostic_log,
            Arc::new(SystemClock),
        ));

        let manager = Arc::new(ConnectionManager::new(
            chat.clone(),
            transport,
            room_state.clone(),
            status.clone(),
            diagnostics,
            ConnectionSettings {
                chat_room_id: config.chat_room_id.clone(),
                room_token: config.room_token.clone(),
                room_uuid: config.room_uuid.clone(),
                join_timeout: config.join_timeout(),
            },
        ));

        let parser: Arc<dyn CommandParser> =
            Arc::new(PrefixCommandParser::new(config.command_prefix.clone()));
        let registry = Arc::new(builtin_registry(&config.command_prefix));
        let services = BotServices {
            chat: chat.clone(),
            room_state: room_state.clone(),
            chat_room_id: config.chat_room_id.clone(),
            bot_user_id: config.bot_user(),
        };
        let dispatcher = Arc::new(CommandDispatcher::new(
            Some(parser),
            Some(registry),
            services,
        ));

        let poller = MessagePoller::new(
            chat,
            dispatcher,
            status,
            config.chat_room_id.clone(),
            config.bot_user(),
            config.counterparts(),
        );

        Ok(Self {
            manager,
            poller,
            room_state,
            poll_interval: config.poll_interval(),
            retry: ReconnectPolicy::default(),
        })
    }

    /// Override how often the connect sequence is retried
    pub fn with_retry(mut self, retry: ReconnectPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn manager(&self) -> Arc<ConnectionManager> {
        self.manager.clone()
    }

    pub fn room_state(&self) -> Arc<RoomStateStore> {
        self.room_state.clone()
    }

    /// Connect, then poll and process room events until `shutdown` resolves.
    ///
    /// When the room socket closes for good, the whole connect sequence is
    /// retried. Returns an error once retries are exhausted.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ConnectError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            manager,
            poller,
            poll_interval,
            retry,
            ..
        } = self;
        tokio::pin!(shutdown);

        let mut events = tokio::select! {
            _ = &mut shutdown => return Ok(()),
            connected = connect_with_retry(&manager, retry) => connected?,
        };

        // Cursors live in the poller, so it keeps running across reconnects.
        let poll_task = tokio::spawn(poller.run(poll_interval));

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break Ok(());
                }
                _ = manager.process_events(events) => {
                    tracing::warn!("Room event stream ended, reconnecting");
                    manager.disconnect();
                    tokio::select! {
                        _ = &mut shutdown => break Ok(()),
                        connected = connect_with_retry(&manager, retry) => match connected {
                            Ok(receiver) => events = receiver,
                            Err(e) => break Err(e),
                        },
                    }
                }
            }
        };

        poll_task.abort();
        manager.disconnect();
        result
    }
}

/// Run the connect sequence, retrying it per `retry`
async fn connect_with_retry(
    manager: &ConnectionManager,
    retry: ReconnectPolicy,
) -> Result<RoomEventReceiver, ConnectError> {
    let mut attempt = 1;

    loop {
        tracing::info!(
            "Connecting to chat and room (attempt {}/{})",
            attempt,
            retry.max_attempts
        );

        match manager.connect().await {
            Ok(events) => return Ok(events),
            Err(e) => {
                if attempt >= retry.max_attempts {
                    tracing::error!(
                        "Failed to connect after {} attempts. Giving up.",
                        retry.max_attempts
                    );
                    return Err(e);
                }

                attempt += 1;
                tracing::info!(
                    "Retrying in {:?}... (attempt {}/{})",
                    retry.interval,
                    attempt,
                    retry.max_attempts
                );
                tokio::time::sleep(retry.interval).await;
            }
        }
    }
}

/// Run the bot until Ctrl+C
pub async fn run_bot(config: BotConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bot = Bot::from_config(&config)?;

    bot.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    tracing::info!("Bot stopped");
    Ok(())
}

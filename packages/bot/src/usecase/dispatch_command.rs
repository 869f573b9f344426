//! UseCase: コマンドの解析と実行
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CommandDispatcher::dispatch() メソッド
//! - パーサーによる解析、ハンドラの呼び出し、返信の送信
//!
//! ### なぜこのテストが必要か
//! - パーサーやレジストリが未設定でも処理が止まらないことを保証
//! - ハンドラのエラーが呼び出し元に伝播することを確認（tick 内の fail-fast のため）
//!
//! ### どのような状況を想定しているか
//! - 正常系：公開チャンネル・個別チャンネルへの返信
//! - 異常系：ハンドラのエラー、返信の送信失敗
//! - エッジケース：パーサー未設定、レジストリ未設定、未登録のコマンド

use std::sync::Arc;

use crate::domain::{
    BotServices, CommandContext, CommandOutcome, CommandParser, CommandRegistry, CommandRequest,
    ResponseChannel,
};

use super::error::DispatchError;

/// ディスパッチの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// パーサーが未設定のため解析しなかった
    NoParser,
    /// コマンドではない
    NotACommand,
    /// コマンドだが実行するハンドラが無い
    Unhandled { command: String },
    /// ハンドラを実行した
    Handled(CommandOutcome),
}

/// コマンドディスパッチのユースケース
pub struct CommandDispatcher {
    parser: Option<Arc<dyn CommandParser>>,
    registry: Option<Arc<CommandRegistry>>,
    services: BotServices,
}

impl CommandDispatcher {
    pub fn new(
        parser: Option<Arc<dyn CommandParser>>,
        registry: Option<Arc<CommandRegistry>>,
        services: BotServices,
    ) -> Self {
        Self {
            parser,
            registry,
            services,
        }
    }

    /// チャットのテキストを解析し、コマンドであればハンドラを実行する
    ///
    /// # Returns
    ///
    /// * `Ok(DispatchOutcome)` - 解析・実行の結果（返信の送信失敗はログのみ）
    /// * `Err(DispatchError)` - ハンドラがエラーを返した
    pub async fn dispatch(
        &self,
        context: &CommandContext,
        response_channel: &ResponseChannel,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(parser) = &self.parser else {
            tracing::warn!("No command parser configured, skipping dispatch");
            return Ok(DispatchOutcome::NoParser);
        };

        let parsed = parser.parse(&context.full_message);
        if !parsed.is_command {
            return Ok(DispatchOutcome::NotACommand);
        }

        let Some(registry) = &self.registry else {
            tracing::warn!(
                command = %parsed.command,
                "No command registry configured, skipping dispatch"
            );
            return Ok(DispatchOutcome::Unhandled {
                command: parsed.command,
            });
        };

        let Some(handler) = registry.get(&parsed.command) else {
            tracing::debug!(command = %parsed.command, "Unknown command");
            return Ok(DispatchOutcome::Unhandled {
                command: parsed.command,
            });
        };

        let request = CommandRequest {
            command: &parsed.command,
            args: &parsed.remainder,
            services: &self.services,
            context,
            response_channel,
        };
        let outcome = handler.handle(request).await.map_err(|e| {
            tracing::error!(command = %parsed.command, "Command handler failed: {}", e);
            DispatchError::from(e)
        })?;

        if !outcome.success {
            tracing::warn!(
                command = %parsed.command,
                error = outcome.error.as_deref().unwrap_or_default(),
                "Command reported failure"
            );
        }
        if outcome.should_respond && !outcome.response.is_empty() {
            self.reply(response_channel, &outcome.response).await;
        }

        Ok(DispatchOutcome::Handled(outcome))
    }

    /// 返信を送信する（失敗はログのみ）
    async fn reply(&self, channel: &ResponseChannel, text: &str) {
        let result = match channel {
            ResponseChannel::Public { room_id } => {
                self.services.chat.send_message(room_id, text).await
            }
            ResponseChannel::Private { counterpart } => {
                self.services
                    .chat
                    .send_private_message(counterpart, text)
                    .await
            }
        };

        if let Err(e) = result {
            tracing::warn!(channel = ?channel, "Failed to send reply: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ChatMessage, ChatServiceError, CommandError, CommandHandler, MessageId,
            MockChatService, RoomStateStore, Timestamp, UserId,
        },
        infrastructure::command::PrefixCommandParser,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 受け取った引数を記録し、引数をそのまま返信する
    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl CommandHandler for RecordingHandler {
        async fn handle(
            &self,
            request: CommandRequest<'_>,
        ) -> Result<CommandOutcome, CommandError> {
            self.calls.lock().unwrap().push((
                request.command.to_string(),
                request.args.to_string(),
                request.context.full_message.clone(),
            ));
            Ok(CommandOutcome::reply(request.args))
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl CommandHandler for FailingHandler {
        async fn handle(
            &self,
            request: CommandRequest<'_>,
        ) -> Result<CommandOutcome, CommandError> {
            Err(CommandError::Failed {
                command: request.command.to_string(),
                reason: "boom".to_string(),
            })
        }
    }

    fn create_services(chat: MockChatService) -> BotServices {
        BotServices {
            chat: Arc::new(chat),
            room_state: Arc::new(RoomStateStore::new()),
            chat_room_id: "room".to_string(),
            bot_user_id: UserId::new("bot"),
        }
    }

    fn create_context(text: &str) -> CommandContext {
        CommandContext {
            sender: Some(UserId::new("alice")),
            full_message: text.to_string(),
            chat_message: ChatMessage {
                id: MessageId::new("m1"),
                sent_at: Timestamp::new(1),
                sender: Some(UserId::new("alice")),
                text: Some(text.to_string()),
                is_private_message: false,
            },
        }
    }

    fn public_channel() -> ResponseChannel {
        ResponseChannel::Public {
            room_id: "room".to_string(),
        }
    }

    fn registry_with(name: &str, handler: Arc<dyn CommandHandler>) -> Arc<CommandRegistry> {
        let mut registry = CommandRegistry::new();
        registry.register(name, handler);
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_dispatch_invokes_handler_and_replies_publicly() {
        // テスト項目: コマンドのハンドラが呼ばれ、公開チャンネルに返信される
        // given (前提条件):
        let mut chat = MockChatService::new();
        chat.expect_send_message()
            .withf(|room_id, text| room_id == "room" && text == "hello there")
            .times(1)
            .returning(|_, _| Ok(()));
        let handler = Arc::new(RecordingHandler::default());
        let dispatcher = CommandDispatcher::new(
            Some(Arc::new(PrefixCommandParser::default())),
            Some(registry_with("echo", handler.clone())),
            create_services(chat),
        );

        // when (操作):
        let outcome = dispatcher
            .dispatch(&create_context("!echo hello there"), &public_channel())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            outcome,
            DispatchOutcome::Handled(CommandOutcome::reply("hello there"))
        );
        let calls = handler.calls.lock().unwrap();
        assert_eq!(
            *calls,
            [(
                "echo".to_string(),
                "hello there".to_string(),
                "!echo hello there".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_dispatch_replies_on_private_channel() {
        // テスト項目: 個別メッセージのコマンドには個別チャンネルで返信される
        // given (前提条件):
        let mut chat = MockChatService::new();
        chat.expect_send_private_message()
            .withf(|counterpart, text| counterpart.as_str() == "alice" && text == "hi")
            .times(1)
            .returning(|_, _| Ok(()));
        chat.expect_send_message().never();
        let dispatcher = CommandDispatcher::new(
            Some(Arc::new(PrefixCommandParser::default())),
            Some(registry_with("echo", Arc::new(RecordingHandler::default()))),
            create_services(chat),
        );
        let channel = ResponseChannel::Private {
            counterpart: UserId::new("alice"),
        };

        // when (操作):
        let outcome = dispatcher
            .dispatch(&create_context("!echo hi"), &channel)
            .await;

        // then (期待する結果):
        assert!(matches!(outcome, Ok(DispatchOutcome::Handled(_))));
    }

    #[tokio::test]
    async fn test_dispatch_without_parser_is_skipped() {
        // テスト項目: パーサー未設定の場合は警告のみでハンドラは呼ばれない
        // given (前提条件):
        let handler = Arc::new(RecordingHandler::default());
        let dispatcher = CommandDispatcher::new(
            None,
            Some(registry_with("echo", handler.clone())),
            create_services(MockChatService::new()),
        );

        // when (操作):
        let outcome = dispatcher
            .dispatch(&create_context("!echo hi"), &public_channel())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::NoParser);
        assert!(handler.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_without_registry_is_skipped() {
        // テスト項目: レジストリ未設定の場合、コマンドは実行されずに終わる
        // given (前提条件):
        let dispatcher = CommandDispatcher::new(
            Some(Arc::new(PrefixCommandParser::default())),
            None,
            create_services(MockChatService::new()),
        );

        // when (操作):
        let outcome = dispatcher
            .dispatch(&create_context("!ping"), &public_channel())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            outcome,
            DispatchOutcome::Unhandled {
                command: "ping".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_plain_text_is_not_dispatched() {
        // テスト項目: コマンドでないテキストではハンドラが呼ばれない
        // given (前提条件):
        let handler = Arc::new(RecordingHandler::default());
        let dispatcher = CommandDispatcher::new(
            Some(Arc::new(PrefixCommandParser::default())),
            Some(registry_with("echo", handler.clone())),
            create_services(MockChatService::new()),
        );

        // when (操作):
        let outcome = dispatcher
            .dispatch(&create_context("just chatting"), &public_channel())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(outcome, DispatchOutcome::NotACommand);
        assert!(handler.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_is_propagated() {
        // テスト項目: ハンドラのエラーは呼び出し元に伝播する
        // given (前提条件):
        let dispatcher = CommandDispatcher::new(
            Some(Arc::new(PrefixCommandParser::default())),
            Some(registry_with("explode", Arc::new(FailingHandler))),
            create_services(MockChatService::new()),
        );

        // when (操作):
        let result = dispatcher
            .dispatch(&create_context("!explode"), &public_channel())
            .await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(DispatchError::Handler(CommandError::Failed { ref reason, .. })) if reason == "boom"
        ));
    }

    #[tokio::test]
    async fn test_reply_failure_is_not_propagated() {
        // テスト項目: 返信の送信失敗はログのみでディスパッチは成功扱い
        // given (前提条件):
        let mut chat = MockChatService::new();
        chat.expect_send_message()
            .times(1)
            .returning(|_, _| Err(ChatServiceError::Transport("down".to_string())));
        let dispatcher = CommandDispatcher::new(
            Some(Arc::new(PrefixCommandParser::default())),
            Some(registry_with("echo", Arc::new(RecordingHandler::default()))),
            create_services(chat),
        );

        // when (操作):
        let result = dispatcher
            .dispatch(&create_context("!echo hi"), &public_channel())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Ok(DispatchOutcome::Handled(_))));
    }
}

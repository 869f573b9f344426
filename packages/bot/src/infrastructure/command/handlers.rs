//! Built-in command handlers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    CommandError, CommandHandler, CommandOutcome, CommandRegistry, CommandRequest,
};

pub const PING: &str = "ping";
pub const HELP: &str = "help";

/// Replies `pong`
#[derive(Debug, Clone, Copy, Default)]
pub struct PingHandler;

#[async_trait]
impl CommandHandler for PingHandler {
    async fn handle(&self, request: CommandRequest<'_>) -> Result<CommandOutcome, CommandError> {
        tracing::debug!(
            sender = ?request.context.sender,
            "Answering {}",
            request.command
        );
        Ok(CommandOutcome::reply("pong"))
    }
}

/// Lists the commands known at construction time
#[derive(Debug, Clone)]
pub struct HelpHandler {
    prefix: String,
    commands: Vec<String>,
}

impl HelpHandler {
    pub fn new(prefix: impl Into<String>, commands: Vec<String>) -> Self {
        Self {
            prefix: prefix.into(),
            commands,
        }
    }

    fn usage(&self) -> String {
        let listed: Vec<String> = self
            .commands
            .iter()
            .map(|name| format!("{}{}", self.prefix, name))
            .collect();
        format!("Available commands: {}", listed.join(", "))
    }
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, _request: CommandRequest<'_>) -> Result<CommandOutcome, CommandError> {
        Ok(CommandOutcome::reply(self.usage()))
    }
}

/// Registry holding `ping` and `help`
pub fn builtin_registry(prefix: &str) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(PING, Arc::new(PingHandler));

    let mut commands = registry.names();
    commands.push(HELP.to_string());
    commands.sort();
    registry.register(HELP, Arc::new(HelpHandler::new(prefix, commands)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BotServices, ChatMessage, CommandContext, MessageId, MockChatService, ResponseChannel,
        RoomStateStore, Timestamp, UserId,
    };

    fn create_services() -> BotServices {
        BotServices {
            chat: Arc::new(MockChatService::new()),
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

    async fn invoke(registry: &CommandRegistry, command: &str) -> CommandOutcome {
        let services = create_services();
        let context = create_context(&format!("!{command}"));
        let channel = ResponseChannel::Public {
            room_id: "room".to_string(),
        };
        let handler = registry.get(command).unwrap();
        handler
            .handle(CommandRequest {
                command,
                args: "",
                services: &services,
                context: &context,
                response_channel: &channel,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ping_replies_pong() {
        // テスト項目: ping コマンドは pong を返信する
        // given (前提条件):
        let registry = builtin_registry("!");

        // when (操作):
        let outcome = invoke(&registry, PING).await;

        // then (期待する結果):
        assert_eq!(outcome, CommandOutcome::reply("pong"));
    }

    #[tokio::test]
    async fn test_help_lists_builtin_commands() {
        // テスト項目: help コマンドは登録済みコマンドをプレフィックス付きで一覧表示する
        // given (前提条件):
        let registry = builtin_registry("!");

        // when (操作):
        let outcome = invoke(&registry, HELP).await;

        // then (期待する結果):
        assert!(outcome.should_respond);
        assert_eq!(outcome.response, "Available commands: !help, !ping");
    }

    #[test]
    fn test_builtin_registry_names() {
        // テスト項目: 組み込みレジストリには help と ping のみが登録される
        // given (前提条件) / when (操作):
        let registry = builtin_registry("!");

        // then (期待する結果):
        assert_eq!(registry.names(), ["help", "ping"]);
        assert!(registry.get("echo").is_none());
    }
}

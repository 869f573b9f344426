//! Chat/room bridge bot.
//!
//! Joins the chat room and the real-time room, mirrors the room state and
//! answers chat commands until Ctrl+C. Every option can also be given through
//! a `ROOMLINK_*` environment variable.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomlink-bot -- \
//!     --chat-url https://chat.example.com/api --chat-token TOKEN --chat-room-id general \
//!     --room-socket-url wss://room.example.com/ws --room-token TOKEN --room-uuid ROOM \
//!     --bot-user-id bot
//! ```

use clap::Parser;

use roomlink_bot::{config::BotConfig, runner::run_bot};
use roomlink_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let config = BotConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run_bot(config).await {
        tracing::error!("Bot error: {}", e);
        std::process::exit(1);
    }
}

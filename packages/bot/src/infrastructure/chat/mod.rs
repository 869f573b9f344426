//! Group-chat service clients.

pub mod http;

pub use http::HttpChatService;

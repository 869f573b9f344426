pub mod handlers;
pub mod parser;

pub use handlers::{HelpHandler, PingHandler, builtin_registry};
pub use parser::PrefixCommandParser;

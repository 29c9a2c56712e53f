// TOML-driven bot: commands declared in config answered with templates.
pub mod static_reply;

pub use static_reply::{register_commands, StaticReply};

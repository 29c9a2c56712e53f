#[macro_use]
pub mod domain;

pub mod app;
pub mod config;
pub mod core;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliCommand, CliConfig};
pub use config::BotConfig;

pub use core::{
    Client, ClientBuilder, Command, CommandArg, CommandRegistry, ComponentRegistry, DefaultThrottler,
    EventHandler, Group, HttpClient, Intents, Subgroup,
};
pub use domain::interaction::{CommandArgs, MessageContext};
pub use domain::message::{Message, Response};
pub use utils::error::{PincerError, Result};

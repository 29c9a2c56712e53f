pub mod toml_config;

pub use toml_config::{BotConfig, BotSection, CommandConfig, OptionConfig};

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Discord defaults shared by the REST client and the gateway.
pub struct GatewayConfig;

impl GatewayConfig {
    pub const API_BASE: &'static str = "https://discord.com/api";
    pub const VERSION: u8 = 10;
    pub const MAX_RETRIES: u32 = 5;
    pub const RECONNECT_DELAY_SECS: u64 = 5;
    pub const DEFAULT_HEARTBEAT_MS: u64 = 41_250;
    pub const USER_AGENT: &'static str = concat!(
        "DiscordBot (https://github.com/Pincer-org/Pincer, ",
        env!("CARGO_PKG_VERSION"),
        ")"
    );
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "pincer")]
#[command(about = "Run a Discord bot whose commands are declared in TOML")]
pub struct CliConfig {
    #[arg(long, short, default_value = "pincer.toml")]
    pub config: PathBuf,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Connect to the gateway and answer the configured commands
    Run,
    /// Push the configured commands to Discord and exit
    Sync {
        #[arg(long, value_delimiter = ',')]
        guilds: Vec<String>,
    },
    /// List the commands Discord stores for the bot
    Commands {
        #[arg(long, value_delimiter = ',')]
        guilds: Vec<String>,
    },
    /// Show a channel by id
    Channel { id: String },
    /// Look up an invite by code
    Invite {
        code: String,
        #[arg(long)]
        with_counts: bool,
    },
}

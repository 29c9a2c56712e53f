use anyhow::Context;
use clap::Parser;
use pincer::app::register_commands;
use pincer::domain::channel::Channel;
use pincer::domain::invite::Invite;
use pincer::utils::error::ErrorSeverity;
use pincer::utils::logger;
use pincer::utils::snowflake::Snowflake;
use pincer::utils::validation::Validate;
use pincer::{BotConfig, CliCommand, CliConfig, Client, CommandRegistry, PincerError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting pincer CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match BotConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    // 建立指令與客戶端
    let mut commands = CommandRegistry::new();
    if let Err(e) = register_commands(&config, &mut commands) {
        fail(&e);
    }

    let mut builder = Client::builder(config.bot.token.clone())
        .intents(config.intents())
        .api_version(config.api_version())
        .max_retries(config.max_retries())
        .commands(commands);
    if let Some(base) = &config.bot.api_base {
        builder = builder.api_base(base.clone());
    }
    if let Some(url) = &config.bot.gateway_url {
        builder = builder.gateway_url(url.clone());
    }
    let client = match builder.build() {
        Ok(client) => client,
        Err(e) => fail(&e),
    };

    let outcome = match cli.command {
        CliCommand::Run => client.run().await,
        CliCommand::Sync { guilds } => {
            let guilds = parse_guilds(&guilds)?;
            client.sync_commands(&guilds).await.map(|_| {
                println!("✅ Synced {} commands", client.commands().len());
            })
        }
        CliCommand::Commands { guilds } => {
            let guilds = parse_guilds(&guilds)?;
            client.remote_commands(&guilds).await.map(|remote| {
                for cmd in remote {
                    let scope = cmd
                        .guild_id
                        .map(|g| format!("guild {}", g))
                        .unwrap_or_else(|| "global".to_string());
                    println!("{} ({})", cmd.name, scope);
                }
            })
        }
        CliCommand::Channel { id } => {
            let id: Snowflake = id.parse().with_context(|| format!("invalid channel id `{}`", id))?;
            Channel::from_id(client.http(), id).await.map(|channel| {
                println!("{} [{:?}]", channel, channel.kind());
            })
        }
        CliCommand::Invite { code, with_counts } => {
            Invite::from_code(client.http(), &code, with_counts, false)
                .await
                .map(|invite| {
                    println!("{} -> {}", invite, invite.link());
                })
        }
    };

    if let Err(e) = outcome {
        tracing::error!("❌ pincer failed: {} (Severity: {:?})", e, e.severity());
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        fail(&e);
    }

    Ok(())
}

fn parse_guilds(raw: &[String]) -> anyhow::Result<Vec<Snowflake>> {
    raw.iter()
        .map(|g| g.parse().with_context(|| format!("invalid guild id `{}`", g)))
        .collect()
}

fn fail(e: &PincerError) -> ! {
    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

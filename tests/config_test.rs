use pincer::app::register_commands;
use pincer::utils::validation::Validate;
use pincer::{BotConfig, Client, CommandRegistry, Intents, PincerError};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_config_file_to_client() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[bot]
token = "abc"
api_base = "http://127.0.0.1:9"
intents = 1

[[commands]]
name = "ping"
reply = "pong"

[[commands]]
name = "kick"
reply = "kicked {{member}}"
group = "mod"
guild = "123"

[[commands.options]]
name = "member"
kind = "user"
"#
    )
    .unwrap();

    let config = BotConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.intents(), Intents::GUILDS);

    let mut commands = CommandRegistry::new();
    assert_eq!(register_commands(&config, &mut commands).unwrap(), 2);

    let client = Client::builder(config.bot.token.clone())
        .api_base(config.bot.api_base.clone().unwrap())
        .api_version(config.api_version())
        .commands(commands)
        .build()
        .unwrap();

    assert_eq!(client.http().url(), "http://127.0.0.1:9/v10");
    assert_eq!(client.commands().len(), 2);
}

#[test]
fn test_duplicate_command_in_config_is_rejected() {
    let config = BotConfig::from_toml_str(
        r#"
[bot]
token = "abc"

[[commands]]
name = "ping"
reply = "pong"

[[commands]]
name = "ping"
reply = "pong again"
"#,
    )
    .unwrap();

    let mut commands = CommandRegistry::new();
    assert!(matches!(
        register_commands(&config, &mut commands),
        Err(PincerError::CommandAlreadyRegistered { .. })
    ));
}

#[test]
fn test_bad_command_name_in_config_is_rejected() {
    let config = BotConfig::from_toml_str(
        r#"
[bot]
token = "abc"

[[commands]]
name = "Not Valid"
reply = "x"
"#,
    )
    .unwrap();

    let mut commands = CommandRegistry::new();
    assert!(matches!(
        register_commands(&config, &mut commands),
        Err(PincerError::InvalidCommandName { .. })
    ));
}

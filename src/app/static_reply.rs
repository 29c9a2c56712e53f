use crate::config::{BotConfig, CommandConfig};
use crate::core::commands::{Command, CommandArg, CommandRegistry, Group, Subgroup};
use crate::domain::command::{AppCommandOptionType, AppCommandType};
use crate::domain::interaction::{CommandArgs, MessageContext};
use crate::domain::message::{Message, Response};
use crate::domain::ports::CommandHandler;
use crate::utils::error::{PincerError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// Replies with a fixed template. `{option}` is replaced with the argument
/// value, `{author}` with a mention of the invoking user.
#[derive(Debug, Clone)]
pub struct StaticReply {
    template: String,
    ephemeral: bool,
    option_types: HashMap<String, AppCommandOptionType>,
    placeholder: Regex,
}

impl StaticReply {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let placeholder = Regex::new(r"\{(\w+)\}").map_err(|e| PincerError::ConfigError {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        Ok(Self {
            template: template.into(),
            ephemeral: false,
            option_types: HashMap::new(),
            placeholder,
        })
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    pub fn option_type(mut self, name: impl Into<String>, kind: AppCommandOptionType) -> Self {
        self.option_types.insert(name.into(), kind);
        self
    }

    pub fn render(&self, ctx: &MessageContext, args: &CommandArgs) -> String {
        self.placeholder
            .replace_all(&self.template, |caps: &regex::Captures| {
                let name = &caps[1];
                if name == "author" && !args.contains("author") {
                    return ctx.author.mention();
                }
                if !args.contains(name) {
                    return caps[0].to_string();
                }

                let Some(value) = args.get(name) else {
                    return String::new();
                };
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };

                match self.option_types.get(name) {
                    Some(AppCommandOptionType::User) => format!("<@{}>", text),
                    Some(AppCommandOptionType::Channel) => format!("<#{}>", text),
                    Some(AppCommandOptionType::Role) => format!("<@&{}>", text),
                    _ => text,
                }
            })
            .into_owned()
    }
}

#[async_trait]
impl CommandHandler for StaticReply {
    async fn call(&self, ctx: MessageContext, args: CommandArgs) -> Result<Response> {
        let mut message = Message::new(self.render(&ctx, &args));
        if self.ephemeral {
            message = message.ephemeral();
        }
        Ok(message.into())
    }
}

fn build_command(cfg: &CommandConfig) -> Result<Command> {
    let kind = cfg.command_type()?;
    let mut handler = StaticReply::new(cfg.reply.clone())?.ephemeral(cfg.ephemeral.unwrap_or(false));

    let mut command = match kind {
        AppCommandType::User => Command::user(cfg.name.clone()),
        AppCommandType::Message => Command::message(cfg.name.clone()),
        _ => Command::chat_input(cfg.name.clone()),
    };

    if let Some(description) = &cfg.description {
        command = command.description(description.clone());
    }
    if let Some(guild) = &cfg.guild {
        command = command.guild(guild);
    }
    if let Some(cooldown) = cfg.cooldown {
        command = command.cooldown(cooldown);
    }
    if let Some(scale) = cfg.cooldown_scale {
        command = command.cooldown_scale(scale);
    }
    command = command.cooldown_scope(cfg.throttle_scope()?);

    match (&cfg.group, &cfg.subgroup) {
        (Some(group), Some(subgroup)) => {
            command = command.parent(Subgroup::new(subgroup.clone(), Group::new(group.clone())));
        }
        (Some(group), None) => command = command.parent(Group::new(group.clone())),
        (None, Some(subgroup)) => {
            return Err(PincerError::MissingConfigError {
                field: format!("group for subgroup `{}`", subgroup),
            })
        }
        (None, None) => {}
    }

    for opt in &cfg.options {
        let kind = opt.option_type()?;
        let mut arg = CommandArg::new(opt.name.clone(), kind).required(opt.required.unwrap_or(true));
        if let Some(description) = &opt.description {
            arg = arg.description(description.clone());
        }
        for choice in &opt.choices {
            arg = arg.choice(choice.name.clone(), choice.value.clone());
        }
        if let Some(min) = opt.min_value {
            arg = arg.min_value(min);
        }
        if let Some(max) = opt.max_value {
            arg = arg.max_value(max);
        }
        handler = handler.option_type(opt.name.clone(), kind);
        command = command.arg(arg);
    }

    Ok(command.handler(handler))
}

/// Registers every `[[commands]]` entry of the config.
pub fn register_commands(config: &BotConfig, registry: &mut CommandRegistry) -> Result<usize> {
    for cfg in &config.commands {
        registry.register(build_command(cfg)?)?;
    }

    tracing::info!("📋 Loaded {} commands from config", config.commands.len());
    Ok(config.commands.len())
}

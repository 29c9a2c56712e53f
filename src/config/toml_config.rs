use crate::config::GatewayConfig;
use crate::domain::command::{AppCommandOptionType, AppCommandType, ChoiceValue, ThrottleScope};
use crate::utils::error::{PincerError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub bot: BotSection,
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSection {
    pub token: String,
    pub api_version: Option<u8>,
    pub max_retries: Option<u32>,
    pub intents: Option<u32>,
    pub api_base: Option<String>,
    pub gateway_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    pub name: String,
    pub kind: Option<String>,
    pub description: Option<String>,
    pub guild: Option<String>,
    pub cooldown: Option<u32>,
    pub cooldown_scale: Option<f64>,
    pub cooldown_scope: Option<String>,
    pub ephemeral: Option<bool>,
    pub reply: String,
    pub group: Option<String>,
    pub subgroup: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionConfig {
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
    pub required: Option<bool>,
    #[serde(default)]
    pub choices: Vec<ChoiceConfig>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceConfig {
    pub name: String,
    pub value: ChoiceValue,
}

impl BotConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| PincerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DISCORD_TOKEN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| PincerError::ConfigError {
            message: format!("invalid env pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("bot.token", &self.bot.token)?;
        if self.bot.token.starts_with("${") {
            return Err(PincerError::MissingConfigError {
                field: format!("bot.token (environment variable {} is not set)", self.bot.token),
            });
        }

        if let Some(base) = &self.bot.api_base {
            validation::validate_url("bot.api_base", base)?;
        }
        if let Some(url) = &self.bot.gateway_url {
            validation::validate_url("bot.gateway_url", url)?;
        }
        if let Some(version) = self.bot.api_version {
            validation::validate_range("bot.api_version", version, 6, 10)?;
        }
        if let Some(retries) = self.bot.max_retries {
            validation::validate_positive_number("bot.max_retries", retries as usize, 1)?;
        }

        for (i, cmd) in self.commands.iter().enumerate() {
            validation::validate_non_empty_string(&format!("commands[{}].name", i), &cmd.name)?;
            cmd.command_type()?;
            cmd.throttle_scope()?;
            if let Some(scale) = cmd.cooldown_scale {
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(PincerError::InvalidConfigValueError {
                        field: format!("commands[{}].cooldown_scale", i),
                        value: scale.to_string(),
                        reason: "Cooldown scale must be a positive, finite number of seconds".to_string(),
                    });
                }
            }
            if cmd.subgroup.is_some() && cmd.group.is_none() {
                return Err(PincerError::MissingConfigError {
                    field: format!("commands[{}].group (required by subgroup)", i),
                });
            }
            for opt in &cmd.options {
                opt.option_type()?;
            }
        }

        Ok(())
    }

    pub fn api_version(&self) -> u8 {
        self.bot.api_version.unwrap_or(GatewayConfig::VERSION)
    }

    pub fn max_retries(&self) -> u32 {
        self.bot.max_retries.unwrap_or(GatewayConfig::MAX_RETRIES)
    }

    pub fn intents(&self) -> u32 {
        self.bot.intents.unwrap_or(0)
    }
}

impl Validate for BotConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

impl CommandConfig {
    pub fn command_type(&self) -> Result<AppCommandType> {
        match self.kind.as_deref().unwrap_or("chat_input") {
            "chat_input" | "slash" => Ok(AppCommandType::ChatInput),
            "user" => Ok(AppCommandType::User),
            "message" => Ok(AppCommandType::Message),
            other => Err(PincerError::InvalidConfigValueError {
                field: format!("commands.{}.kind", self.name),
                value: other.to_string(),
                reason: "Valid kinds: chat_input, user, message".to_string(),
            }),
        }
    }

    pub fn throttle_scope(&self) -> Result<ThrottleScope> {
        match self.cooldown_scope.as_deref().unwrap_or("user") {
            "guild" => Ok(ThrottleScope::Guild),
            "channel" => Ok(ThrottleScope::Channel),
            "user" => Ok(ThrottleScope::User),
            "global" => Ok(ThrottleScope::Global),
            other => Err(PincerError::InvalidConfigValueError {
                field: format!("commands.{}.cooldown_scope", self.name),
                value: other.to_string(),
                reason: "Valid scopes: guild, channel, user, global".to_string(),
            }),
        }
    }
}

impl OptionConfig {
    pub fn option_type(&self) -> Result<AppCommandOptionType> {
        Ok(match self.kind.as_str() {
            "string" => AppCommandOptionType::String,
            "integer" => AppCommandOptionType::Integer,
            "number" => AppCommandOptionType::Number,
            "boolean" => AppCommandOptionType::Boolean,
            "user" => AppCommandOptionType::User,
            "channel" => AppCommandOptionType::Channel,
            "role" => AppCommandOptionType::Role,
            "mentionable" => AppCommandOptionType::Mentionable,
            other => {
                return Err(PincerError::InvalidConfigValueError {
                    field: format!("options.{}.kind", self.name),
                    value: other.to_string(),
                    reason: "Valid kinds: string, integer, number, boolean, user, channel, role, mentionable"
                        .to_string(),
                })
            }
        })
    }
}

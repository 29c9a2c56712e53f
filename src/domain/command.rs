use crate::domain::channel::ChannelType;
use crate::utils::snowflake::Snowflake;
use serde::{Deserialize, Serialize};

int_enum! {
    pub enum AppCommandType: u8 {
        ChatInput = 1,
        User = 2,
        Message = 3,
    }
}

int_enum! {
    pub enum AppCommandOptionType: u8 {
        SubCommand = 1,
        SubCommandGroup = 2,
        String = 3,
        Integer = 4,
        Boolean = 5,
        User = 6,
        Channel = 7,
        Role = 8,
        Mentionable = 9,
        Number = 10,
    }
}

impl AppCommandOptionType {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }

    pub fn accepts_choices(self) -> bool {
        matches!(self, Self::String | Self::Integer | Self::Number)
    }
}

int_enum! {
    /// Who shares a command cooldown.
    pub enum ThrottleScope: u8 {
        Guild = 1,
        Channel = 2,
        User = 3,
        Global = 4,
    }
}

impl Default for ThrottleScope {
    fn default() -> Self {
        Self::User
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i64),
    Number(f64),
    String(String),
}

impl ChoiceValue {
    pub fn fits(&self, option_type: AppCommandOptionType) -> bool {
        match (self, option_type) {
            (ChoiceValue::String(_), AppCommandOptionType::String) => true,
            (ChoiceValue::Integer(_), AppCommandOptionType::Integer) => true,
            // integers are valid numbers
            (ChoiceValue::Integer(_) | ChoiceValue::Number(_), AppCommandOptionType::Number) => true,
            _ => false,
        }
    }
}

impl From<&str> for ChoiceValue {
    fn from(v: &str) -> Self {
        ChoiceValue::String(v.to_string())
    }
}

impl From<String> for ChoiceValue {
    fn from(v: String) -> Self {
        ChoiceValue::String(v)
    }
}

impl From<i64> for ChoiceValue {
    fn from(v: i64) -> Self {
        ChoiceValue::Integer(v)
    }
}

impl From<f64> for ChoiceValue {
    fn from(v: f64) -> Self {
        ChoiceValue::Number(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppCommandOptionChoice {
    pub name: String,
    pub value: ChoiceValue,
}

impl AppCommandOptionChoice {
    pub fn new(name: impl Into<String>, value: impl Into<ChoiceValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppCommandOption {
    #[serde(rename = "type")]
    pub kind: AppCommandOptionType,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<AppCommandOptionChoice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<AppCommandOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_types: Option<Vec<ChannelType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

impl AppCommandOption {
    pub fn new(
        kind: AppCommandOptionType,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: None,
            choices: None,
            options: None,
            channel_types: None,
            min_value: None,
            max_value: None,
        }
    }

    /// Compares the way Discord echoes options back: an absent `required`
    /// means false and absent lists mean empty.
    pub fn matches(&self, other: &AppCommandOption) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.description == other.description
            && self.required.unwrap_or(false) == other.required.unwrap_or(false)
            && self.choices.as_deref().unwrap_or_default() == other.choices.as_deref().unwrap_or_default()
            && self.channel_types.as_deref().unwrap_or_default()
                == other.channel_types.as_deref().unwrap_or_default()
            && self.min_value == other.min_value
            && self.max_value == other.max_value
            && options_match(self.options.as_deref(), other.options.as_deref())
    }
}

fn options_match(a: Option<&[AppCommandOption]>, b: Option<&[AppCommandOption]>) -> bool {
    let a = a.unwrap_or_default();
    let b = b.unwrap_or_default();
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(rename = "type", default = "default_command_type")]
    pub kind: AppCommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<AppCommandOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_permission: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Snowflake>,
}

fn default_command_type() -> AppCommandType {
    AppCommandType::ChatInput
}

impl AppCommand {
    pub fn new(kind: AppCommandType, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            application_id: None,
            guild_id: None,
            name: name.into(),
            description: description.into(),
            options: None,
            default_permission: Some(true),
            version: None,
        }
    }

    /// True when `other` describes the same command Discord would store,
    /// ignoring server-assigned fields (id, application id, version).
    pub fn matches(&self, other: &AppCommand) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.guild_id == other.guild_id
            && self.description == other.description
            && self.default_permission.unwrap_or(true) == other.default_permission.unwrap_or(true)
            && options_match(self.options.as_deref(), other.options.as_deref())
    }

    /// Body for the create/upsert endpoints.
    pub fn to_payload(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "name": self.name,
            "type": self.kind,
            "description": self.description,
        });
        if let Some(options) = &self.options {
            value["options"] = serde_json::to_value(options).unwrap_or_default();
        }
        if let Some(default_permission) = self.default_permission {
            value["default_permission"] = default_permission.into();
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_choice_value_fits() {
        assert!(ChoiceValue::from("a").fits(AppCommandOptionType::String));
        assert!(ChoiceValue::from(1i64).fits(AppCommandOptionType::Integer));
        assert!(ChoiceValue::from(1i64).fits(AppCommandOptionType::Number));
        assert!(ChoiceValue::from(1.5f64).fits(AppCommandOptionType::Number));
        assert!(!ChoiceValue::from(1.5f64).fits(AppCommandOptionType::Integer));
        assert!(!ChoiceValue::from("a").fits(AppCommandOptionType::Boolean));
    }

    #[test]
    fn test_choice_value_untagged() {
        let choices: Vec<AppCommandOptionChoice> = serde_json::from_value(json!([
            {"name": "one", "value": 1},
            {"name": "half", "value": 0.5},
            {"name": "text", "value": "t"}
        ]))
        .unwrap();

        assert_eq!(choices[0].value, ChoiceValue::Integer(1));
        assert_eq!(choices[1].value, ChoiceValue::Number(0.5));
        assert_eq!(choices[2].value, ChoiceValue::String("t".to_string()));
    }

    #[test]
    fn test_matches_ignores_server_fields() {
        let local = AppCommand::new(AppCommandType::ChatInput, "ping", "Replies with pong");
        let remote: AppCommand = serde_json::from_value(json!({
            "id": "1",
            "application_id": "2",
            "version": "3",
            "type": 1,
            "name": "ping",
            "description": "Replies with pong",
            "default_permission": true
        }))
        .unwrap();

        assert!(local.matches(&remote));

        let mut changed = remote.clone();
        changed.description = "Something else".to_string();
        assert!(!local.matches(&changed));
    }

    #[test]
    fn test_matches_treats_missing_options_as_empty() {
        let mut local = AppCommand::new(AppCommandType::ChatInput, "ping", "d");
        local.options = Some(vec![]);
        let remote = AppCommand::new(AppCommandType::ChatInput, "ping", "d");
        assert!(local.matches(&remote));

        let mut with_option = local.clone();
        with_option.options = Some(vec![AppCommandOption::new(
            AppCommandOptionType::String,
            "who",
            "Description not set",
        )]);
        assert!(!with_option.matches(&remote));
    }

    #[test]
    fn test_payload_skips_server_fields() {
        let mut cmd = AppCommand::new(AppCommandType::User, "High Five", "");
        cmd.id = Some(Snowflake(5));
        let payload = cmd.to_payload();

        assert_eq!(payload["type"], json!(2));
        assert!(payload.get("id").is_none());
        assert!(payload.get("options").is_none());
    }
}

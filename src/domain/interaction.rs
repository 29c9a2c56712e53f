use crate::domain::command::{AppCommandOption, AppCommandOptionType, AppCommandType};
use crate::domain::component::ComponentType;
use crate::domain::message::Message;
use crate::domain::ports::RestClient;
use crate::domain::user::{GuildMember, User};
use crate::utils::error::{PincerError, Result};
use crate::utils::snowflake::Snowflake;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

int_enum! {
    pub enum InteractionType: u8 {
        Ping = 1,
        ApplicationCommand = 2,
        MessageComponent = 3,
        Autocomplete = 4,
        ModalSubmit = 5,
    }
}

int_enum! {
    pub enum CallbackType: u8 {
        Pong = 1,
        ChannelMessageWithSource = 4,
        DeferredChannelMessageWithSource = 5,
        DeferredUpdateMessage = 6,
        UpdateMessage = 7,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AppCommandOptionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<InteractionOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AppCommandType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<InteractionOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<ComponentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Snowflake,
    pub application_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<GuildMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub token: String,
    #[serde(default)]
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

/// Where an application command interaction points once sub-command
/// nesting is unwrapped.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPath {
    pub name: String,
    pub group: Option<String>,
    pub sub_group: Option<String>,
    pub options: Vec<InteractionOption>,
}

impl Interaction {
    /// The invoking user: `member.user` inside guilds, `user` in DMs.
    pub fn author(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }

    pub fn command_path(&self) -> Option<CommandPath> {
        let data = self.data.as_ref()?;
        let top = data.name.clone()?;
        let options = data.options.clone().unwrap_or_default();

        let first = options.first();
        match first.map(|o| o.kind) {
            Some(AppCommandOptionType::SubCommandGroup) => {
                let group_opt = first?;
                let sub = group_opt.options.as_ref()?.first()?;
                Some(CommandPath {
                    name: sub.name.clone(),
                    group: Some(top),
                    sub_group: Some(group_opt.name.clone()),
                    options: sub.options.clone().unwrap_or_default(),
                })
            }
            Some(AppCommandOptionType::SubCommand) => {
                let sub = first?;
                Some(CommandPath {
                    name: sub.name.clone(),
                    group: Some(top),
                    sub_group: None,
                    options: sub.options.clone().unwrap_or_default(),
                })
            }
            _ => Some(CommandPath {
                name: top,
                group: None,
                sub_group: None,
                options,
            }),
        }
    }

    pub async fn respond(
        &self,
        http: &dyn RestClient,
        callback: CallbackType,
        message: Option<&Message>,
    ) -> Result<()> {
        let mut body = json!({ "type": callback });
        if let Some(message) = message {
            body["data"] = serde_json::to_value(message)?;
        }

        http.post(&format!("interactions/{}/{}/callback", self.id, self.token), body)
            .await?;
        Ok(())
    }

    pub async fn reply(&self, http: &dyn RestClient, message: &Message) -> Result<()> {
        self.respond(http, CallbackType::ChannelMessageWithSource, Some(message))
            .await
    }

    pub async fn followup(&self, http: &dyn RestClient, message: &Message) -> Result<Option<Value>> {
        http.post(
            &format!("webhooks/{}/{}", self.application_id, self.token),
            serde_json::to_value(message)?,
        )
        .await
    }
}

/// Invocation context handed to command and component handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageContext {
    pub author: User,
    pub member: Option<GuildMember>,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub command_name: String,
    pub interaction_id: Snowflake,
}

impl MessageContext {
    pub fn from_interaction(interaction: &Interaction, command_name: impl Into<String>) -> Result<Self> {
        let author = interaction.author().cloned().ok_or_else(|| PincerError::HandlerError {
            message: format!("interaction {} has no user or member", interaction.id),
        })?;

        Ok(Self {
            author,
            member: interaction.member.clone(),
            guild_id: interaction.guild_id,
            channel_id: interaction.channel_id,
            command_name: command_name.into(),
            interaction_id: interaction.id,
        })
    }
}

/// Arguments of a command invocation. Every declared option is present as a
/// key; options the user left out map to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    values: HashMap<String, Option<Value>>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(declared: &[AppCommandOption], provided: &[InteractionOption]) -> Self {
        let mut values: HashMap<String, Option<Value>> =
            declared.iter().map(|o| (o.name.clone(), None)).collect();

        for opt in provided {
            values.insert(opt.name.clone(), opt.value.clone());
        }

        Self { values }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).and_then(Option::as_ref)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// User, channel, role and mentionable options arrive as id strings.
    pub fn snowflake(&self, name: &str) -> Option<Snowflake> {
        self.get(name)
            .and_then(|v| serde_json::from_value::<Snowflake>(v.clone()).ok())
    }

    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(PincerError::from)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<Value>)> {
        self.values.iter()
    }
}

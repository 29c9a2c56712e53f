use crate::domain::component::ActionRow;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message flag bits relevant to interaction replies.
pub struct InteractionFlags;

impl InteractionFlags {
    pub const SUPPRESS_EMBEDS: u64 = 1 << 2;
    pub const EPHEMERAL: u64 = 1 << 6;
}

/// Outgoing message body, used for interaction replies and follow-ups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<Value>,
}

impl Message {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.flags = Some(self.flags.unwrap_or(0) | InteractionFlags::EPHEMERAL);
        self
    }

    pub fn is_ephemeral(&self) -> bool {
        self.flags.unwrap_or(0) & InteractionFlags::EPHEMERAL != 0
    }

    pub fn embed(mut self, embed: Value) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn component_row(mut self, row: ActionRow) -> Self {
        self.components.push(row);
        self
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::new(s)
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::new(s)
    }
}

/// What a handler produced. The first message answers the interaction, the
/// rest are sent as follow-ups in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub messages: Vec<Message>,
}

impl Response {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn stream(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn then(mut self, message: impl Into<Message>) -> Self {
        self.messages.push(message.into());
        self
    }
}

impl From<Message> for Response {
    fn from(m: Message) -> Self {
        Self { messages: vec![m] }
    }
}

impl From<&str> for Response {
    fn from(s: &str) -> Self {
        Message::from(s).into()
    }
}

impl From<String> for Response {
    fn from(s: String) -> Self {
        Message::from(s).into()
    }
}

impl From<()> for Response {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

impl From<Option<Message>> for Response {
    fn from(m: Option<Message>) -> Self {
        m.map(Response::from).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ephemeral_flag() {
        let msg = Message::new("secret").ephemeral();
        assert!(msg.is_ephemeral());
        assert_eq!(serde_json::to_value(&msg).unwrap(), json!({"content": "secret", "flags": 64}));
    }

    #[test]
    fn test_response_conversions() {
        assert_eq!(Response::from("hi").messages.len(), 1);
        assert!(Response::from(()).is_empty());
        assert!(Response::from(None::<Message>).is_empty());

        let streamed = Response::from("first").then("second").then(Message::new("third"));
        let contents: Vec<_> = streamed
            .messages
            .iter()
            .filter_map(|m| m.content.as_deref())
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }
}

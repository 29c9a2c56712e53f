use crate::domain::channel::Channel;
use crate::domain::ports::RestClient;
use crate::domain::user::{GuildMember, PartialApplication, PartialGuild, User};
use crate::utils::error::{PincerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

int_enum! {
    pub enum InviteTargetType: u8 {
        Stream = 1,
        EmbeddedApplication = 2,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteStageInstance {
    pub members: Vec<GuildMember>,
    pub participant_count: u32,
    pub speaker_count: u32,
    pub topic: String,
}

/// Extra information returned on invite listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteMetadata {
    pub uses: u32,
    pub max_uses: u32,
    pub max_age: u32,
    pub temporary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invite {
    pub channel: Channel,
    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approximate_member_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approximate_presence_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inviter: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild: Option<PartialGuild>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_instance: Option<InviteStageInstance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<InviteTargetType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_application: Option<PartialApplication>,

    /// Present when listed from a channel or guild.
    #[serde(flatten)]
    pub metadata: Option<InviteMetadata>,
}

impl Invite {
    pub fn link(&self) -> String {
        format!("https://discord.gg/{}", self.code)
    }

    pub async fn from_code(
        http: &dyn RestClient,
        code: &str,
        with_counts: bool,
        with_expiration: bool,
    ) -> Result<Invite> {
        let params = json!({
            "with_counts": with_counts,
            "with_expiration": with_expiration,
        });

        let data = http
            .get(&format!("invites/{}", code), Some(params))
            .await?
            .ok_or_else(|| PincerError::NotFound {
                reason: format!("Empty response for invite {}", code),
            })?;

        Ok(serde_json::from_value(data)?)
    }
}

impl fmt::Display for Invite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.link())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::channel::ChannelType;

    #[test]
    fn test_invite_link_and_metadata() {
        let invite: Invite = serde_json::from_value(json!({
            "code": "0vCdhLbwjZZTWZLD",
            "channel": {"id": "165176875973476352", "name": "illuminati", "type": 0},
            "guild": {"id": "165176875973476352", "name": "CS:GO Fraggers Only"},
            "target_type": 1,
            "uses": 0,
            "max_uses": 0,
            "max_age": 0,
            "temporary": false,
            "created_at": "2016-03-31T19:15:39.954000+00:00"
        }))
        .unwrap();

        assert_eq!(invite.link(), "https://discord.gg/0vCdhLbwjZZTWZLD");
        assert_eq!(invite.to_string(), invite.link());
        assert_eq!(invite.channel.kind, ChannelType::GuildText);
        assert_eq!(invite.target_type, Some(InviteTargetType::Stream));
        assert_eq!(invite.metadata.as_ref().map(|m| m.temporary), Some(false));
    }

    #[test]
    fn test_invite_without_metadata() {
        let invite: Invite = serde_json::from_value(json!({
            "code": "abc",
            "channel": {"id": "1", "type": 0}
        }))
        .unwrap();

        assert!(invite.metadata.is_none());
        assert!(invite.guild.is_none());
    }
}

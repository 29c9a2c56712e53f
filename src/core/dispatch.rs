use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

int_enum! {
    /// Gateway opcodes handled by the client.
    pub enum OpCode: u8 {
        Dispatch = 0,
        Heartbeat = 1,
        Identify = 2,
        PresenceUpdate = 3,
        VoiceStateUpdate = 4,
        Resume = 6,
        Reconnect = 7,
        RequestGuildMembers = 8,
        InvalidSession = 9,
        Hello = 10,
        HeartbeatAck = 11,
    }
}

/// One gateway frame: `{"op": .., "d": .., "s": .., "t": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayDispatch {
    pub op: OpCode,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayDispatch {
    pub fn new(op: OpCode, d: Value) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialized frame to send; outgoing frames never carry `s`/`t`.
    pub fn to_text(&self) -> String {
        serde_json::json!({ "op": self.op, "d": self.d }).to_string()
    }

    pub fn event_name(&self) -> Option<&str> {
        self.t.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hello() {
        let dispatch =
            GatewayDispatch::from_text(r#"{"op":10,"d":{"heartbeat_interval":41250},"s":null,"t":null}"#)
                .unwrap();
        assert_eq!(dispatch.op, OpCode::Hello);
        assert_eq!(dispatch.d["heartbeat_interval"], json!(41250));
        assert_eq!(dispatch.s, None);
    }

    #[test]
    fn test_parse_event_dispatch() {
        let dispatch =
            GatewayDispatch::from_text(r#"{"op":0,"d":{"v":10},"s":3,"t":"READY"}"#).unwrap();
        assert_eq!(dispatch.op, OpCode::Dispatch);
        assert_eq!(dispatch.s, Some(3));
        assert_eq!(dispatch.event_name(), Some("READY"));
    }

    #[test]
    fn test_unknown_opcode_is_preserved() {
        let dispatch = GatewayDispatch::from_text(r#"{"op":42,"d":null}"#).unwrap();
        assert_eq!(dispatch.op, OpCode::Unknown(42));
    }

    #[test]
    fn test_outgoing_heartbeat() {
        let text = GatewayDispatch::new(OpCode::Heartbeat, json!(7)).to_text();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"op": 1, "d": 7}));
    }
}

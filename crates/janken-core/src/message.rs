//! Broadcast message payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;

/// Payload pushed to every target of one broadcast.
///
/// Serialized with an internal `type` tag:
///
/// ```json
/// {"type":"relay","data":{"x":1}}
/// {"type":"wait"}
/// {"type":"start","opponent":"Alice"}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BroadcastMessage {
    /// Opaque player action relayed unchanged to every connection.
    Relay {
        /// The inbound request's `data` field.
        data: Value,
    },
    /// Only one player is registered.
    Wait,
    /// A second player arrived; the game begins.
    Start {
        /// Display name of the opposing player.
        opponent: String,
    },
}

impl BroadcastMessage {
    /// Wrap an inbound payload for relay.
    pub fn relay(data: Value) -> Self {
        Self::Relay { data }
    }

    /// The wire tag (`"relay"`, `"wait"`, `"start"`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Relay { .. } => "relay",
            Self::Wait => "wait",
            Self::Start { .. } => "start",
        }
    }

    /// Serialize to the JSON text the push transport expects.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wait_wire_format() {
        assert_eq!(BroadcastMessage::Wait.to_wire().unwrap(), r#"{"type":"wait"}"#);
    }

    #[test]
    fn start_wire_format() {
        let msg = BroadcastMessage::Start {
            opponent: "Alice".into(),
        };
        assert_eq!(
            msg.to_wire().unwrap(),
            r#"{"type":"start","opponent":"Alice"}"#
        );
    }

    #[test]
    fn relay_carries_opaque_data() {
        let msg = BroadcastMessage::relay(json!({"hand": "rock", "x": 0.25}));
        let value: Value = serde_json::from_str(&msg.to_wire().unwrap()).unwrap();
        assert_eq!(value["type"], "relay");
        assert_eq!(value["data"]["hand"], "rock");
        assert_eq!(value["data"]["x"], 0.25);
    }

    #[test]
    fn relay_of_null_data() {
        let msg = BroadcastMessage::relay(Value::Null);
        assert_eq!(msg.to_wire().unwrap(), r#"{"type":"relay","data":null}"#);
    }

    #[test]
    fn kind_matches_tag() {
        assert_eq!(BroadcastMessage::Wait.kind(), "wait");
        assert_eq!(BroadcastMessage::relay(json!(1)).kind(), "relay");
        assert_eq!(
            BroadcastMessage::Start {
                opponent: "x".into()
            }
            .kind(),
            "start"
        );
    }

    #[test]
    fn deserialize_start() {
        let msg: BroadcastMessage =
            serde_json::from_str(r#"{"type":"start","opponent":"Bob"}"#).unwrap();
        assert_eq!(
            msg,
            BroadcastMessage::Start {
                opponent: "Bob".into()
            }
        );
    }
}

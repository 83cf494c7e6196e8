//! Push channel protocol.
//!
//! Every frame on the push connection is a JSON text message of the form
//! `{ "event": "<name>", "data": <payload> }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PushError;
use crate::models::{PushNotification, Role};

/// Outbound registration event name.
pub const EVENT_REGISTER: &str = "register";
/// Inbound new-notification event name.
pub const EVENT_NOTIFICATION_NEW: &str = "notification:new";

/// Path of the push endpoint below the configured base URL.
pub const PUSH_PATH: &str = "/ws";

/// A raw frame before its payload is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Payload of the `register` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user_id: String,
    pub mode: Role,
}

/// Commands the client sends to the push server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Register(Registration),
}

impl ClientCommand {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientCommand::Register(_) => EVENT_REGISTER,
        }
    }

    pub fn to_frame(&self) -> Result<PushFrame, PushError> {
        let data = match self {
            ClientCommand::Register(reg) => serde_json::to_value(reg)?,
        };
        Ok(PushFrame {
            event: self.event_name().to_string(),
            data,
        })
    }

    pub fn to_text(&self) -> Result<String, PushError> {
        Ok(serde_json::to_string(&self.to_frame()?)?)
    }
}

/// Events the push server delivers to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    NotificationNew(PushNotification),
}

impl ServerEvent {
    /// Interpret a raw frame. Unknown event names yield `Ok(None)`.
    pub fn from_frame(frame: PushFrame) -> Result<Option<Self>, PushError> {
        match frame.event.as_str() {
            EVENT_NOTIFICATION_NEW => {
                let payload = match frame.data {
                    Value::Null => PushNotification::default(),
                    data => serde_json::from_value(data)?,
                };
                Ok(Some(ServerEvent::NotificationNew(payload)))
            }
            _ => Ok(None),
        }
    }

    pub fn from_text(text: &str) -> Result<Option<Self>, PushError> {
        Self::from_frame(serde_json::from_str(text)?)
    }

    pub fn to_text(&self) -> Result<String, PushError> {
        let frame = match self {
            ServerEvent::NotificationNew(n) => PushFrame {
                event: EVENT_NOTIFICATION_NEW.to_string(),
                data: serde_json::to_value(n)?,
            },
        };
        Ok(serde_json::to_string(&frame)?)
    }
}

/// Check if a host is a local/development address.
pub fn is_local_address(host: &str) -> bool {
    let host_part = host.split(':').next().unwrap_or(host);
    host_part == "localhost"
        || host_part == "127.0.0.1"
        || host_part == "0.0.0.0"
        || host_part.starts_with("192.168.")
        || host_part.starts_with("10.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_frame_shape() {
        let cmd = ClientCommand::Register(Registration {
            user_id: "u1".into(),
            mode: Role::Business,
        });
        let value: Value = serde_json::from_str(&cmd.to_text().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "event": "register", "data": { "userId": "u1", "mode": "business" } })
        );
    }

    #[test]
    fn notification_frame_parses() {
        let text = r#"{"event":"notification:new","data":{"receiverType":"admin","title":"x"}}"#;
        let event = ServerEvent::from_text(text).unwrap();
        match event {
            Some(ServerEvent::NotificationNew(n)) => {
                assert_eq!(n.receiver_type.as_deref(), Some("admin"));
                assert_eq!(n.payload.get("title"), Some(&json!("x")));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_events_are_ignored() {
        let text = r#"{"event":"presence:update","data":{}}"#;
        assert_eq!(ServerEvent::from_text(text).unwrap(), None);
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(ServerEvent::from_text("not json").is_err());
    }

    #[test]
    fn local_addresses() {
        assert!(is_local_address("localhost:5000"));
        assert!(is_local_address("192.168.1.4"));
        assert!(!is_local_address("api.repack.app"));
    }
}

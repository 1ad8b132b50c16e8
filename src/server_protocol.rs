use serde_json::Value;

use crate::types::Key;

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Key { key: Key },
    Ping { t: f64 },
}

/// Parses one websocket text frame. Unknown types, unknown keys and
/// malformed payloads all yield `None`.
pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "key" => {
            let name = object.get("key")?.as_str()?;
            let key = Key::parse(&name.trim().to_ascii_lowercase())?;
            Some(ParsedClientMessage::Key { key })
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

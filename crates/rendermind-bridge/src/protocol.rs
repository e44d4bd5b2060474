//! JSON wire protocol spoken with the external UI.
//!
//! Every message carries a `type` discriminator. Each request gets exactly
//! one direct reply; chat answers arrive later as a broadcast.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rendermind_core::ConversationTurn;

/// Requests sent by a UI client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    TranscribeAudio {
        /// Base64-encoded audio.
        #[serde(default)]
        audio: String,
    },
    SendMessage {
        #[serde(default)]
        content: String,
        /// Older clients send the text under `message`.
        #[serde(default)]
        message: String,
    },
    GetMessages,
    ExecuteCode {
        #[serde(default)]
        code: String,
    },
    ClearChat,
}

const KNOWN_TYPES: &[&str] = &[
    "ping",
    "transcribe_audio",
    "send_message",
    "get_messages",
    "execute_code",
    "clear_chat",
];

impl ClientMessage {
    /// Parse one text frame. The error is the reply to send back.
    pub fn parse(text: &str) -> Result<Self, ServerMessage> {
        let value: Value =
            serde_json::from_str(text).map_err(|_| ServerMessage::error("Invalid JSON"))?;
        let kind = match value.get("type") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "None".to_string(),
        };
        if !KNOWN_TYPES.contains(&kind.as_str()) {
            return Err(ServerMessage::error(format!("Unknown message type: {kind}")));
        }
        serde_json::from_value(value)
            .map_err(|e| ServerMessage::error(format!("Malformed {kind} message: {e}")))
    }

    /// Chat text of a `send_message`, preferring `content`.
    pub fn chat_text(content: String, message: String) -> String {
        if content.trim().is_empty() {
            message
        } else {
            content
        }
    }
}

/// A conversation turn as the UI renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTurn {
    pub role: String,
    pub content: String,
    pub code: String,
    /// Local `HH:MM`.
    pub timestamp: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_msg: String,
}

impl From<&ConversationTurn> for WireTurn {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role().to_string(),
            content: turn.content().to_string(),
            code: turn.code().unwrap_or_default().to_string(),
            timestamp: turn.display_time(),
            status: turn.status().to_string(),
            error_msg: turn.error().unwrap_or_default().to_string(),
        }
    }
}

/// Replies and broadcasts sent to UI clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Pong {
        timestamp: String,
    },
    Transcription {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    MessageReceived {
        status: String,
    },
    NewMessage {
        message: WireTurn,
    },
    MessagesList {
        messages: Vec<WireTurn>,
    },
    ExecutionResult {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    ChatCleared {
        success: bool,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn pong() -> Self {
        ServerMessage::Pong {
            timestamp: chrono::Local::now().to_rfc3339(),
        }
    }

    pub fn processing() -> Self {
        ServerMessage::MessageReceived {
            status: "processing".to_string(),
        }
    }

    pub fn transcription(result: Result<String, String>) -> Self {
        match result {
            Ok(text) => ServerMessage::Transcription {
                text: Some(text),
                error: None,
            },
            Err(error) => ServerMessage::Transcription {
                text: None,
                error: Some(error),
            },
        }
    }

    pub fn execution(result: Result<(), String>) -> Self {
        ServerMessage::ExecutionResult {
            success: result.is_ok(),
            error: result.err(),
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing these plain enums cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","message":"serialization failed"}"#.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_types() {
        assert_eq!(ClientMessage::parse(r#"{"type":"ping"}"#), Ok(ClientMessage::Ping));
        assert_eq!(
            ClientMessage::parse(r#"{"type":"send_message","message":"hi"}"#),
            Ok(ClientMessage::SendMessage {
                content: String::new(),
                message: "hi".into()
            })
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"execute_code"}"#),
            Ok(ClientMessage::ExecuteCode { code: String::new() })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ClientMessage::parse("{not json"),
            Err(ServerMessage::error("Invalid JSON"))
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"dance"}"#),
            Err(ServerMessage::error("Unknown message type: dance"))
        );
        assert_eq!(
            ClientMessage::parse(r#"{"content":"x"}"#),
            Err(ServerMessage::error("Unknown message type: None"))
        );
    }

    #[test]
    fn test_chat_text_prefers_content() {
        assert_eq!(ClientMessage::chat_text("a".into(), "b".into()), "a");
        assert_eq!(ClientMessage::chat_text(" ".into(), "b".into()), "b");
    }

    #[test]
    fn test_server_message_shape() {
        let v: Value = serde_json::from_str(&ServerMessage::processing().to_json()).unwrap();
        assert_eq!(v, json!({"type": "message_received", "status": "processing"}));

        let v: Value =
            serde_json::from_str(&ServerMessage::execution(Err("boom".into())).to_json()).unwrap();
        assert_eq!(v, json!({"type": "execution_result", "success": false, "error": "boom"}));

        let v: Value =
            serde_json::from_str(&ServerMessage::transcription(Ok("hi".into())).to_json()).unwrap();
        assert_eq!(v, json!({"type": "transcription", "text": "hi"}));
    }

    #[test]
    fn test_wire_turn_from_turn() {
        let turn = ConversationTurn::assistant("ok", Some("code".into()));
        let wire = WireTurn::from(&turn);
        assert_eq!(wire.role, "assistant");
        assert_eq!(wire.status, "none");
        assert_eq!(wire.code, "code");
        assert_eq!(wire.timestamp.len(), 5);
    }
}

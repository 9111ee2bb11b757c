//! Defines the WebSocket message protocol between the browser client and the API server.

use career_tools_core::PanelView;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens a realtime session with the assistant.
    StartSession,
    /// Closes the current realtime session.
    StopSession,
    /// A text message from the user to the assistant.
    SendText { text: String },
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Whether a realtime session is currently running.
    SessionState { active: bool },
    /// A raw event received from the realtime session.
    Event { event: Value },
    /// The tool panel changed what it shows.
    Panel { view: PanelView },
    /// Reports an error to the client.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_messages_deserialize() {
        let start: ClientMessage = serde_json::from_str(r#"{"type":"start_session"}"#).unwrap();
        assert_eq!(start, ClientMessage::StartSession);

        let text: ClientMessage =
            serde_json::from_str(r#"{"type":"send_text","text":"Help me network"}"#).unwrap();
        assert_eq!(
            text,
            ClientMessage::SendText {
                text: "Help me network".to_string()
            }
        );

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn test_server_messages_serialize() {
        let state = serde_json::to_value(ServerMessage::SessionState { active: true }).unwrap();
        assert_eq!(state, json!({ "type": "session_state", "active": true }));

        let panel = serde_json::to_value(ServerMessage::Panel {
            view: PanelView::AwaitingToolCall,
        })
        .unwrap();
        assert_eq!(
            panel,
            json!({ "type": "panel", "view": { "state": "awaiting_tool_call" } })
        );
    }
}

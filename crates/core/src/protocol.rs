//! Realtime session wire types.
//!
//! Only the events the tool panel produces or inspects are modelled. Any other
//! server event deserializes to [`ServerEvent::Other`].

use crate::tools::{RegisteredTool, ToolSchema};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Events sent from the client to the realtime session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Updates the session configuration, used here to register tools.
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionUpdate },
    /// Asks the assistant to produce a response.
    #[serde(rename = "response.create")]
    ResponseCreate { response: ResponseCreate },
    /// Adds an item (e.g. a typed user message) to the conversation.
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },
}

impl ClientEvent {
    /// A `response.create` carrying the given instructions.
    pub fn response_with_instructions(instructions: impl Into<String>) -> Self {
        ClientEvent::ResponseCreate {
            response: ResponseCreate {
                instructions: Some(instructions.into()),
            },
        }
    }

    /// A user text message for the conversation.
    pub fn user_text(text: impl Into<String>) -> Self {
        ClientEvent::ConversationItemCreate {
            item: ConversationItem {
                kind: "message".to_string(),
                role: "user".to_string(),
                content: vec![ContentPart {
                    kind: "input_text".to_string(),
                    text: text.into(),
                }],
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub tools: Vec<ToolSchema>,
    pub tool_choice: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ResponseCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Events received from the realtime session.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// The first event of every session.
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: Value,
    },
    /// A response finished; its output may contain function calls.
    #[serde(rename = "response.done")]
    ResponseDone { response: ResponseResource },
    #[serde(other)]
    Other,
}

impl ServerEvent {
    pub fn is_session_created(&self) -> bool {
        matches!(self, ServerEvent::SessionCreated { .. })
    }
}

/// The `response` object of a `response.done` event.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ResponseResource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_output_items")]
    pub output: Option<Vec<OutputItem>>,
}

/// Reads each output item on its own; an item that does not fit its shape
/// becomes [`OutputItem::Other`] instead of failing the whole response.
fn deserialize_output_items<'de, D>(deserializer: D) -> Result<Option<Vec<OutputItem>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(items.map(|items| {
        items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or(OutputItem::Other))
            .collect()
    }))
}

/// One item of a response's output.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum OutputItem {
    #[serde(rename = "function_call")]
    FunctionCall(FunctionCall),
    #[serde(other)]
    Other,
}

/// A function call produced by the assistant.
///
/// `arguments` is a JSON-encoded string. Fields not modelled here are kept in
/// `extra` so the raw record can be shown unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            call_id: None,
            extra: Map::new(),
        }
    }

    /// The registered tool this call targets, if any.
    pub fn tool(&self) -> Option<RegisteredTool> {
        RegisteredTool::from_name(&self.name)
    }

    /// The record as it appeared on the wire, including its `type` tag.
    pub fn to_record(&self) -> Value {
        let mut record = Map::new();
        record.insert("type".to_string(), Value::from("function_call"));
        if let Ok(Value::Object(fields)) = serde_json::to_value(self) {
            record.extend(fields);
        }
        Value::Object(record)
    }
}

//! Message types for conversations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Parse one of the three known roles.
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }

    /// Parse a role, treating anything unknown as `user`.
    pub fn parse_lenient(role: &str) -> Self {
        Self::parse(role).unwrap_or(Role::User)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message stored in a history thread or the group history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,

    /// Participant that produced this reply (group context only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,

    /// Tool that produced this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            participant_id: None,
            participant_name: None,
            tool: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message attributed to a participant
    pub fn from_participant(id: &str, name: &str, content: impl Into<String>) -> Self {
        Self {
            participant_id: Some(id.to_string()),
            participant_name: Some(name.to_string()),
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create an assistant message produced by a tool
    pub fn from_tool(tool_id: &str, content: impl Into<String>) -> Self {
        Self {
            tool: Some(tool_id.to_string()),
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Whether this is an assistant reply by the given participant.
    pub fn is_reply_of(&self, participant_id: &str) -> bool {
        self.role == Role::Assistant && self.participant_id.as_deref() == Some(participant_id)
    }

    /// Copy with participant provenance removed, for outbound views.
    pub fn without_provenance(&self) -> Self {
        Self {
            participant_id: None,
            participant_name: None,
            ..self.clone()
        }
    }
}

/// A history entry as handed over by the session layer.
///
/// Stored histories have gone through several shapes; all of them are
/// accepted and normalized before dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryItem {
    Message(Message),
    /// Old `{user, response}` exchange pair
    Legacy { user: String, response: Option<String> },
    /// Bare text, treated as a user turn
    Text(String),
    /// Anything else read from storage
    Raw(Value),
}

impl HistoryItem {
    /// Classify a stored JSON entry.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => HistoryItem::Text(text),
            other => HistoryItem::Raw(other),
        }
    }
}

impl From<Message> for HistoryItem {
    fn from(message: Message) -> Self {
        HistoryItem::Message(message)
    }
}

impl From<&Message> for HistoryItem {
    fn from(message: &Message) -> Self {
        HistoryItem::Message(message.clone())
    }
}

impl From<&str> for HistoryItem {
    fn from(text: &str) -> Self {
        HistoryItem::Text(text.to_string())
    }
}

/// A normalized message as sent to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Render a JSON content field as text; `None` when it is empty.
pub(crate) fn content_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

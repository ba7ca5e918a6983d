//! Message and Conversation domain types.
//!
//! A conversation lives for exactly one chat request: the caller sends the
//! prior turns, the dispatch loop appends to them, and nothing is kept
//! server-side afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier used to correlate log lines and events for one chat request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The field representative
    User,
    /// The language model
    Assistant,
    /// The fixed system instruction
    System,
    /// A tool observation
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool observation, which tool call it answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a tool observation answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Whether this assistant turn asks for at least one tool.
    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON string, exactly as the model produced them
    pub arguments: String,
}

/// An ordered sequence of messages for one chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,

    /// Ordered messages. Only ever appended to, except for the single
    /// system instruction which may be prepended once.
    pub messages: Vec<Message>,

    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Rebuild a conversation from caller-supplied history.
    pub fn from_history(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::new()
        }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Prepend the system instruction unless one is already first.
    ///
    /// Returns `true` when the instruction was inserted.
    pub fn ensure_system_prompt(&mut self, prompt: &str) -> bool {
        match self.messages.first() {
            Some(first) if first.role == Role::System => false,
            _ => {
                self.messages.insert(0, Message::system(prompt));
                true
            }
        }
    }

    /// The most recent assistant-authored message, if any.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Met Dr. Chen today");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Met Dr. Chen today");
        assert!(!msg.requests_tools());
    }

    #[test]
    fn tool_result_links_call_id() {
        let msg = Message::tool_result("call_1", "Interaction logged");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn system_prompt_is_never_duplicated() {
        let mut conv = Conversation::new();
        conv.push(Message::user("hello"));

        assert!(conv.ensure_system_prompt("You are a CRM assistant."));
        assert!(!conv.ensure_system_prompt("You are a CRM assistant."));

        let systems = conv
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .count();
        assert_eq!(systems, 1);
        assert_eq!(conv.messages[0].role, Role::System);
        assert_eq!(conv.messages[1].content, "hello");
    }

    #[test]
    fn last_assistant_skips_tool_observations() {
        let mut conv = Conversation::new();
        conv.push(Message::user("q"));
        conv.push(Message::assistant("first"));
        conv.push(Message::tool_result("c", "obs"));
        assert_eq!(conv.last_assistant().map(|m| m.content.as_str()), Some("first"));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let role: Role = serde_json::from_str("\"tool\"").unwrap();
        assert_eq!(role, Role::Tool);
    }
}

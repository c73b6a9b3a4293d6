//! Conversation message types
//!
//! The engine never owns conversation history; it reads an ordered sequence
//! of role-tagged messages from a `MessageSource` and prepends its own system
//! message when building a request. Content is either plain text or a
//! sequence of typed parts, matching what multimodal backends accept.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Message content: a plain string or typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
    /// Cache-hint tag forwarded to the backend. An optimization signal, not
    /// part of the role/content contract; absent on ordinary messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Content::Text(content.into()),
            cache: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Cache-hint marker tagged with an agent id. Signals to the backend
    /// that the request prefix up to this point is stable across steps.
    pub fn cache_marker(tag: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(String::new()),
            cache: Some(tag.into()),
        }
    }

    /// Text content, when the message is plain text.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Parts(_) => None,
        }
    }
}

/// Read contract for conversation history: produces an ordered sequence of
/// role-tagged messages. How the sequence is stored or trimmed is the
/// source's concern.
pub trait MessageSource: Send + Sync {
    fn get_messages(&self) -> Vec<Message>;
}

impl MessageSource for Vec<Message> {
    fn get_messages(&self) -> Vec<Message> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_message_wire_shape() {
        let msg = Message::user("hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_content_parts_deserialize() {
        let msg: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [{"type": "text", "text": "hi"}],
        }))
        .unwrap();
        match msg.content {
            Content::Parts(ref parts) => assert_eq!(parts.len(), 1),
            Content::Text(_) => panic!("expected parts"),
        }
        assert!(msg.text().is_none());
    }

    #[test]
    fn test_cache_marker_carries_tag() {
        let msg = Message::cache_marker("core:assistant");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.cache.as_deref(), Some("core:assistant"));
        assert_eq!(msg.text(), Some(""));
    }
}

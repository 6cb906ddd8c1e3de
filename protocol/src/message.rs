use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown when a reply finished without any readable text.
pub const NO_REPLY_PLACEHOLDER: &str = "No valid reply was received.";

/// Shown when the request failed before any text arrived.
pub const APOLOGY_TEXT: &str = "Sorry, the AI assistant is unavailable right now. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in the active chat session. Messages are only ever created and
/// grown, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Empty assistant message that a reply is streamed into.
    pub fn assistant_placeholder() -> Self {
        Self::new(MessageRole::Assistant, String::new())
    }

    /// Merges one extracted text delta into the content. Returns whether the
    /// content changed.
    ///
    /// A delta the content already ends with is a re-delivery and is dropped.
    /// A delta that starts with the whole current content is a cumulative
    /// snapshot and replaces it. Anything else is appended.
    pub fn apply_delta(&mut self, delta: &str) -> bool {
        if delta.is_empty() || self.content.ends_with(delta) {
            return false;
        }
        if delta.starts_with(self.content.as_str()) {
            self.content.clear();
        }
        self.content.push_str(delta);
        true
    }

    /// Called once the reply is over: substitutes the placeholder when
    /// nothing readable arrived.
    pub fn finish_reply(&mut self) {
        if self.content.trim().is_empty() {
            self.content = NO_REPLY_PLACEHOLDER.to_string();
        }
    }

    /// Called when the request failed. Partial text is kept.
    pub fn fail_reply(&mut self) {
        if self.content.trim().is_empty() {
            self.content = APOLOGY_TEXT.to_string();
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_delta_is_not_appended_twice() {
        let mut message = ChatMessage::assistant_placeholder();
        assert!(message.apply_delta("Hello"));
        assert!(!message.apply_delta("Hello"));
        assert_eq!(message.content, "Hello");
    }

    #[test]
    fn cumulative_snapshot_replaces_content() {
        let mut message = ChatMessage::assistant_placeholder();
        message.apply_delta("Hi");
        message.apply_delta("Hi there");
        assert_eq!(message.content, "Hi there");
    }

    #[test]
    fn incremental_deltas_are_appended() {
        let mut message = ChatMessage::assistant_placeholder();
        for delta in ["The ", "library ", "opens at 8."] {
            message.apply_delta(delta);
        }
        assert_eq!(message.content, "The library opens at 8.");
    }

    #[test]
    fn empty_reply_gets_placeholder() {
        let mut message = ChatMessage::assistant_placeholder();
        message.apply_delta("");
        message.finish_reply();
        assert_eq!(message.content, NO_REPLY_PLACEHOLDER);
    }

    #[test]
    fn failure_keeps_partial_text() {
        let mut partial = ChatMessage::assistant_placeholder();
        partial.apply_delta("half an answer");
        partial.fail_reply();
        assert_eq!(partial.content, "half an answer");

        let mut empty = ChatMessage::assistant_placeholder();
        empty.fail_reply();
        assert_eq!(empty.content, APOLOGY_TEXT);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let message = ChatMessage::user("hi");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("createdAt").is_some());
        assert_ne!(ChatMessage::user("a").id, ChatMessage::user("a").id);
    }
}

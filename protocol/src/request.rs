use serde::{Deserialize, Serialize};

/// How the upstream should deliver its answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Streaming,
    Sync,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Streaming => "streaming",
            ResponseMode::Sync => "sync",
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /api/ai-chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub response_mode: ResponseMode,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            conversation_id: None,
            user_id: None,
            response_mode: ResponseMode::default(),
        }
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_response_mode(mut self, response_mode: ResponseMode) -> Self {
        self.response_mode = response_mode;
        self
    }

    /// The query with surrounding whitespace removed, or `None` when blank.
    pub fn trimmed_query(&self) -> Option<&str> {
        let trimmed = self.query.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_mode_defaults_to_streaming_when_omitted() {
        let request: ChatRequest = serde_json::from_str(r#"{"query":"hi"}"#).unwrap();
        assert_eq!(request.response_mode, ResponseMode::Streaming);
        assert_eq!(request.conversation_id, None);
    }

    #[test]
    fn serializes_camel_case_and_skips_absent_ids() {
        let request = ChatRequest::new("where is the library?")
            .with_conversation_id("c-1")
            .with_response_mode(ResponseMode::Sync);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "query": "where is the library?",
                "conversationId": "c-1",
                "responseMode": "sync"
            })
        );
    }

    #[test]
    fn blank_query_has_no_trimmed_form() {
        assert_eq!(ChatRequest::new("  \n\t").trimmed_query(), None);
        assert_eq!(ChatRequest::new("  hi ").trimmed_query(), Some("hi"));
    }
}

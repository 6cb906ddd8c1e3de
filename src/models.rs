use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

pub use ai_chat_protocol::{ChatRequest, ResponseMode};

/// Conversation and user the upstream call is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationIdentity {
    pub conversation_id: String,
    pub user_id: String,
}

/// Per-call replacements for configured upstream settings.
#[derive(Debug, Clone, Default)]
pub struct ChatOverrides {
    pub app_id: Option<i64>,
    pub referer: Option<String>,
    pub origin: Option<String>,
    pub accept_language: Option<String>,
    pub user_agent: Option<String>,
    pub extra_headers: Option<BTreeMap<String, String>>,
    pub conversation_id: Option<String>,
}

/// JSON body sent to the upstream chat API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorRequestBody {
    #[serde(rename = "appId")]
    pub app_id: i64,
    #[serde(rename = "AppConversationID")]
    pub app_conversation_id: String,
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "ResponseMode")]
    pub response_mode: ResponseMode,
    #[serde(rename = "Query")]
    pub query: String,
    #[serde(rename = "QueryExtends")]
    pub query_extends: QueryExtends,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryExtends {
    #[serde(rename = "Files")]
    pub files: Vec<Value>,
}

/// Wrapper the upstream uses for non-streamed JSON replies.
///
/// Read field by field from a JSON object so an oddly typed `msg` or a
/// float `code` never hides a failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamEnvelope {
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl UpstreamEnvelope {
    /// `None` unless the body is a JSON object.
    pub fn parse(body: &[u8]) -> Option<Self> {
        let Value::Object(mut fields) = serde_json::from_slice::<Value>(body).ok()? else {
            return None;
        };
        Some(Self {
            code: fields.get("code").and_then(numeric_code),
            msg: fields.get("msg").and_then(lenient_text),
            message: fields.get("message").and_then(lenient_text),
            data: fields.remove("data"),
        })
    }

    /// An envelope is a failure only when it carries a code other than 200.
    pub fn failure_code(&self) -> Option<i64> {
        self.code.filter(|code| *code != 200)
    }

    pub fn error_message(&self) -> Option<String> {
        self.msg.clone().or_else(|| self.message.clone())
    }
}

/// Integer codes, including whole floats such as `500.0`.
fn numeric_code(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn lenient_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vendor_body_uses_upstream_field_names() {
        let body = VendorRequestBody {
            app_id: 143,
            app_conversation_id: "conv".into(),
            user_id: "u1".into(),
            response_mode: ResponseMode::Streaming,
            query: "hello".into(),
            query_extends: QueryExtends::default(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "appId": 143,
                "AppConversationID": "conv",
                "UserID": "u1",
                "ResponseMode": "streaming",
                "Query": "hello",
                "QueryExtends": {"Files": []}
            })
        );
    }

    fn envelope(body: Value) -> UpstreamEnvelope {
        UpstreamEnvelope::parse(body.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn envelope_failure_only_for_non_200_codes() {
        assert_eq!(envelope(json!({"code": 200, "data": "hi"})).failure_code(), None);
        assert_eq!(envelope(json!({"data": "hi"})).failure_code(), None);
        assert_eq!(envelope(json!({"code": "500"})).failure_code(), None);

        let failed = envelope(json!({"code": 500, "msg": null, "message": "boom"}));
        assert_eq!(failed.failure_code(), Some(500));
        assert_eq!(failed.error_message().as_deref(), Some("boom"));
    }

    #[test]
    fn envelope_fields_are_read_leniently() {
        let failed = envelope(json!({"code": 500.0, "msg": 42}));
        assert_eq!(failed.failure_code(), Some(500));
        assert_eq!(failed.error_message().as_deref(), Some("42"));

        let failed = envelope(json!({"code": 503, "msg": {"detail": "x"}}));
        assert_eq!(failed.error_message().as_deref(), Some(r#"{"detail":"x"}"#));

        assert_eq!(envelope(json!({"code": 500.5})).failure_code(), None);
    }

    #[test]
    fn non_object_bodies_are_not_envelopes() {
        assert_eq!(UpstreamEnvelope::parse(b"[1,2,3]"), None);
        assert_eq!(UpstreamEnvelope::parse(b"not json"), None);
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable discriminant of every gateway error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidJson,
    MissingQuery,
    EmptyResponse,
    UpstreamResponseError,
    UpstreamHttpError,
    UpstreamError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidJson => "INVALID_JSON",
            ErrorKind::MissingQuery => "MISSING_QUERY",
            ErrorKind::EmptyResponse => "EMPTY_RESPONSE",
            ErrorKind::UpstreamResponseError => "UPSTREAM_RESPONSE_ERROR",
            ErrorKind::UpstreamHttpError => "UPSTREAM_HTTP_ERROR",
            ErrorKind::UpstreamError => "UPSTREAM_ERROR",
        }
    }

    /// HTTP status the gateway answers with for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidJson | ErrorKind::MissingQuery => 400,
            _ => 502,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body of every gateway error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error: ErrorKind,
    /// Human readable, safe to show directly in the UI.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl ErrorEnvelope {
    pub fn new(error: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
            details: None,
            upstream_code: None,
            upstream_message: None,
            upstream_data: None,
            upstream_status: None,
            upstream_status_text: None,
            upstream_body: None,
            attempts: None,
        }
    }

    /// One-line summary for notifications: the message followed by whatever
    /// upstream diagnostics the envelope carries.
    pub fn summary(&self) -> String {
        let mut hints = Vec::new();

        if let Some(code) = self.upstream_code {
            match self.upstream_message.as_deref() {
                Some(msg) => hints.push(format!("code={code}, msg={msg}")),
                None => hints.push(format!("code={code}")),
            }
        }

        if let Some(status) = self.upstream_status {
            match self.upstream_status_text.as_deref().filter(|t| !t.is_empty()) {
                Some(text) => hints.push(format!("status={status} {text}")),
                None => hints.push(format!("status={status}")),
            }
        }

        if let Some(attempts) = self.attempts.filter(|a| *a > 1) {
            hints.push(format!("attempts={attempts}"));
        }

        if hints.is_empty() {
            if let Some(body) = self.upstream_body.as_deref().filter(|b| !b.is_empty()) {
                hints.push(format!("body={body}"));
            }
        }

        if hints.is_empty() {
            self.message.clone()
        } else {
            format!("{} (upstream {})", self.message, hints.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_to_their_wire_names() {
        let json = serde_json::to_string(&ErrorKind::UpstreamHttpError).unwrap();
        assert_eq!(json, "\"UPSTREAM_HTTP_ERROR\"");
        assert_eq!(ErrorKind::MissingQuery.status_code(), 400);
        assert_eq!(ErrorKind::EmptyResponse.status_code(), 502);
    }

    #[test]
    fn envelope_omits_absent_fields() {
        let envelope = ErrorEnvelope::new(ErrorKind::MissingQuery, "query is required");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "MISSING_QUERY", "message": "query is required"})
        );
    }

    #[test]
    fn null_upstream_data_is_kept_on_the_wire() {
        let mut envelope = ErrorEnvelope::new(ErrorKind::UpstreamResponseError, "failed");
        envelope.upstream_data = Some(Value::Null);
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.as_object().unwrap().contains_key("upstreamData"));
    }

    #[test]
    fn summary_lists_upstream_diagnostics() {
        let mut envelope = ErrorEnvelope::new(ErrorKind::UpstreamResponseError, "AI failed");
        envelope.upstream_code = Some(500);
        envelope.upstream_message = Some("boom".into());
        envelope.attempts = Some(3);
        assert_eq!(envelope.summary(), "AI failed (upstream code=500, msg=boom; attempts=3)");
    }

    #[test]
    fn summary_uses_body_only_without_other_hints() {
        let mut envelope = ErrorEnvelope::new(ErrorKind::UpstreamError, "AI down");
        envelope.upstream_body = Some("gateway timeout".into());
        envelope.attempts = Some(1);
        assert_eq!(envelope.summary(), "AI down (upstream body=gateway timeout)");

        envelope.upstream_status = Some(504);
        assert_eq!(envelope.summary(), "AI down (upstream status=504)");
    }
}

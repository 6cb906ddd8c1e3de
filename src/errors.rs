use ai_chat_protocol::{ErrorEnvelope, ErrorKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

/// Failure of one logical upstream query, after retries.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Missing credential or identity. Needs an operator, never retried.
    #[error("Upstream configuration error: {0}")]
    Configuration(String),

    #[error("Upstream HTTP error {status} {status_text}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
        attempts: u32,
    },

    #[error("Upstream returned error code={code}{}", .message.as_deref().map(|m| format!(", msg={m}")).unwrap_or_default())]
    Logical {
        code: i64,
        message: Option<String>,
        data: Option<Value>,
        attempts: u32,
    },

    #[error("Upstream request failed after {attempts} attempt(s): {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
        attempts: u32,
    },
}

impl UpstreamError {
    /// Whether another attempt may succeed: 5xx statuses or codes, and
    /// transport failures.
    pub fn is_retriable(&self) -> bool {
        match self {
            UpstreamError::Http { status, .. } => (500..600).contains(status),
            UpstreamError::Logical { code, .. } => (500..600).contains(code),
            UpstreamError::Transport { .. } => true,
            UpstreamError::Configuration(_) => false,
        }
    }

    pub fn attempts(&self) -> Option<u32> {
        match self {
            UpstreamError::Http { attempts, .. }
            | UpstreamError::Logical { attempts, .. }
            | UpstreamError::Transport { attempts, .. } => Some(*attempts),
            UpstreamError::Configuration(_) => None,
        }
    }
}

/// Everything `POST /api/ai-chat` can answer with besides a relayed body.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request body must be valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Field 'query' cannot be empty")]
    MissingQuery,

    #[error("Upstream returned an empty body")]
    EmptyResponse { details: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

const UNKNOWN_UPSTREAM_DETAIL: &str = "The upstream service did not provide error details.";

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InvalidJson(_) => ErrorKind::InvalidJson,
            GatewayError::MissingQuery => ErrorKind::MissingQuery,
            GatewayError::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            GatewayError::Upstream(UpstreamError::Logical { .. }) => ErrorKind::UpstreamResponseError,
            GatewayError::Upstream(UpstreamError::Http { .. }) => ErrorKind::UpstreamHttpError,
            GatewayError::Upstream(_) => ErrorKind::UpstreamError,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, GatewayError::InvalidJson(_) | GatewayError::MissingQuery)
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let kind = self.kind();
        match self {
            GatewayError::InvalidJson(_) => {
                ErrorEnvelope::new(kind, "The request body must be valid JSON.")
            }
            GatewayError::MissingQuery => ErrorEnvelope::new(kind, "The field 'query' is required."),
            GatewayError::EmptyResponse { details } => {
                let mut envelope = ErrorEnvelope::new(kind, "The AI service returned no data.");
                envelope.details = Some(details.clone());
                envelope
            }
            GatewayError::Upstream(UpstreamError::Logical {
                code,
                message,
                data,
                attempts,
            }) => {
                let mut envelope = ErrorEnvelope::new(
                    kind,
                    "The AI service returned an error response. Please try again later.",
                );
                envelope.upstream_code = Some(*code);
                envelope.upstream_message = Some(
                    message
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_UPSTREAM_DETAIL.to_string()),
                );
                envelope.upstream_data = Some(data.clone().unwrap_or(Value::Null));
                envelope.attempts = Some(*attempts);
                envelope
            }
            GatewayError::Upstream(UpstreamError::Http {
                status,
                status_text,
                body,
                attempts,
            }) => {
                let mut envelope = ErrorEnvelope::new(
                    kind,
                    "The AI service is temporarily unavailable. Please try again later.",
                );
                envelope.upstream_status = Some(*status);
                envelope.upstream_status_text = Some(status_text.clone());
                envelope.upstream_body = Some(body.clone());
                envelope.attempts = Some(*attempts);
                envelope
            }
            GatewayError::Upstream(_) => ErrorEnvelope::new(
                kind,
                "The AI service is unavailable right now. Please try again later.",
            ),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if !self.is_validation() {
            error!("AI chat request failed: {self}");
        }
        let envelope = self.envelope();
        let status =
            StatusCode::from_u16(envelope.error.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_error(status: u16) -> UpstreamError {
        UpstreamError::Http {
            status,
            status_text: String::new(),
            body: String::new(),
            attempts: 1,
        }
    }

    fn logical_error(code: i64) -> UpstreamError {
        UpstreamError::Logical {
            code,
            message: None,
            data: None,
            attempts: 1,
        }
    }

    #[test]
    fn only_5xx_and_transport_are_retriable() {
        assert!(http_error(503).is_retriable());
        assert!(!http_error(404).is_retriable());
        assert!(!http_error(600).is_retriable());
        assert!(logical_error(500).is_retriable());
        assert!(!logical_error(401).is_retriable());
        assert!(!UpstreamError::Configuration("no token".into()).is_retriable());
    }

    #[test]
    fn logical_envelope_fills_defaults() {
        let envelope = GatewayError::from(UpstreamError::Logical {
            code: 500,
            message: None,
            data: None,
            attempts: 3,
        })
        .envelope();
        assert_eq!(envelope.error, ErrorKind::UpstreamResponseError);
        assert_eq!(envelope.upstream_code, Some(500));
        assert_eq!(envelope.upstream_message.as_deref(), Some(UNKNOWN_UPSTREAM_DETAIL));
        assert_eq!(envelope.upstream_data, Some(Value::Null));
        assert_eq!(envelope.attempts, Some(3));
    }

    #[test]
    fn configuration_failures_map_to_generic_upstream_error() {
        let err = GatewayError::from(UpstreamError::Configuration("missing user".into()));
        assert_eq!(err.kind(), ErrorKind::UpstreamError);
        assert!(!err.is_validation());
        assert_eq!(err.envelope().attempts, None);
    }

    #[test]
    fn logical_error_message_mentions_upstream_msg() {
        let err = UpstreamError::Logical {
            code: 500,
            message: Some("boom".into()),
            data: None,
            attempts: 1,
        };
        assert_eq!(err.to_string(), "Upstream returned error code=500, msg=boom");
    }

    #[test]
    fn validation_errors_answer_400() {
        let response = GatewayError::MissingQuery.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = GatewayError::EmptyResponse { details: String::new() }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}

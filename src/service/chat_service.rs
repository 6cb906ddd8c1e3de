use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::response::Response;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::GatewayError;
use crate::models::{ChatOverrides, ChatRequest, ResponseMode};
use crate::upstream::{UpstreamBody, UpstreamClient, UpstreamResponse};

const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Raw `POST /api/ai-chat` body, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatPayload {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    response_mode: Option<ResponseMode>,
}

/// Validates chat questions and relays the upstream reply to the caller.
#[derive(Clone)]
pub struct ChatService {
    upstream: UpstreamClient,
}

impl ChatService {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }

    /// Parses and validates a raw request body. Anything but a JSON object
    /// has no `query` field and is rejected as such.
    pub fn parse_request(body: &[u8]) -> Result<ChatRequest, GatewayError> {
        let value: Value = serde_json::from_slice(body).map_err(GatewayError::InvalidJson)?;
        if !value.is_object() {
            return Err(GatewayError::MissingQuery);
        }
        let payload: ChatPayload = serde_json::from_value(value).map_err(GatewayError::InvalidJson)?;

        let mut request = ChatRequest {
            query: payload.query.unwrap_or_default(),
            conversation_id: payload.conversation_id,
            user_id: payload.user_id,
            response_mode: payload.response_mode.unwrap_or_default(),
        };
        request.query = request
            .trimmed_query()
            .ok_or(GatewayError::MissingQuery)?
            .to_string();
        Ok(request)
    }

    /// Runs one chat turn and returns the relayed upstream response.
    pub async fn chat(&self, request: ChatRequest) -> Result<Response, GatewayError> {
        info!(
            mode = %request.response_mode,
            conversation = request.conversation_id.as_deref().unwrap_or("<new>"),
            "AI chat question received"
        );
        let upstream = self.upstream.query(&request, &ChatOverrides::default()).await?;
        relay(upstream)
    }
}

/// Turns a successful upstream reply into the gateway response. Streamed
/// bodies are piped through chunk by chunk without buffering.
pub fn relay(upstream: UpstreamResponse) -> Result<Response, GatewayError> {
    if upstream.is_empty() {
        let details = match &upstream.body {
            UpstreamBody::Buffered(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            UpstreamBody::Stream(_) => String::new(),
        };
        return Err(GatewayError::EmptyResponse { details });
    }

    let content_type = upstream
        .headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    debug!(status = %upstream.status, content_type = ?content_type, "Relaying upstream reply");

    let body = match upstream.body {
        UpstreamBody::Stream(stream) => Body::from_stream(stream),
        UpstreamBody::Buffered(bytes) => Body::from(bytes),
    };

    let mut response = Response::new(body);
    *response.status_mut() = upstream.status;
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    Ok(response)
}

pub mod headers;
pub mod identity;
pub mod retry;

use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, error, warn};

use crate::config::UpstreamConfig;
use crate::errors::UpstreamError;
use crate::models::{ChatOverrides, ChatRequest, ConversationIdentity, QueryExtends, VendorRequestBody};

use self::headers::{build_headers, redacted};
use self::identity::resolve_identity;
use self::retry::{classify, classify_transport, http_failure, is_json, RetryPolicy};

/// Body of a successful upstream reply.
pub enum UpstreamBody {
    /// Still open; read it to relay the stream.
    Stream(BoxStream<'static, Result<Bytes, reqwest::Error>>),
    /// Already read while checking a JSON envelope.
    Buffered(Bytes),
}

/// A successful upstream reply, passed through untouched.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Whether the reply carries no body at all.
    pub fn is_empty(&self) -> bool {
        match &self.body {
            UpstreamBody::Buffered(bytes) => bytes.is_empty(),
            UpstreamBody::Stream(_) => {
                matches!(self.status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT)
                    || self
                        .headers
                        .get(CONTENT_LENGTH)
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|v| v.trim() == "0")
            }
        }
    }
}

/// Performs chat queries against the upstream API, hiding header
/// construction and retries.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    config: Arc<UpstreamConfig>,
}

impl UpstreamClient {
    pub fn new(config: Arc<UpstreamConfig>) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder().build().map_err(|e| {
            UpstreamError::Configuration(format!("failed to build HTTP client: {e}"))
        })?;
        Self::with_http_client(http, config)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        config: Arc<UpstreamConfig>,
    ) -> Result<Self, UpstreamError> {
        if config.bearer_token.trim().is_empty() {
            return Err(UpstreamError::Configuration(
                "bearer token is missing".to_string(),
            ));
        }
        Ok(Self { http, config })
    }

    pub fn build_body(
        &self,
        request: &ChatRequest,
        identity: ConversationIdentity,
        overrides: &ChatOverrides,
    ) -> VendorRequestBody {
        VendorRequestBody {
            app_id: overrides.app_id.unwrap_or(self.config.app_id),
            app_conversation_id: identity.conversation_id,
            user_id: identity.user_id,
            response_mode: request.response_mode,
            query: request.query.trim().to_string(),
            query_extends: QueryExtends::default(),
        }
    }

    /// Runs one logical query, retrying transient failures. On success the
    /// response is returned with its body unread (unless it was a JSON
    /// envelope, which is buffered for inspection).
    pub async fn query(
        &self,
        request: &ChatRequest,
        overrides: &ChatOverrides,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let identity = resolve_identity(&self.config, request, overrides)?;
        let body = self.build_body(request, identity, overrides);
        let headers = build_headers(&self.config, overrides)?;
        let payload = serde_json::to_vec(&body)
            .map_err(|e| UpstreamError::Configuration(format!("failed to encode request: {e}")))?;

        debug!(
            url = %self.config.api_url,
            method = "POST",
            headers = ?redacted(&headers),
            body = %String::from_utf8_lossy(&payload),
            "Upstream request"
        );

        let policy = RetryPolicy::for_mode(request.response_mode);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.attempt(&headers, &payload, attempt).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            if let UpstreamError::Logical { code, message, data, .. } = &error {
                error!(code, ?message, ?data, attempt, "Upstream returned a logical error");
            }

            let Some(delay) = policy.next_delay(&error, attempt) else {
                return Err(error);
            };
            warn!(
                "Upstream request failed, retrying ({attempt}/{}) in {}ms: {error}",
                policy.max_attempts,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(
        &self,
        headers: &HeaderMap,
        payload: &[u8],
        attempt: u32,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let response = match self
            .http
            .post(&self.config.api_url)
            .headers(headers.clone())
            .body(payload.to_vec())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(classify_transport(e, attempt)),
        };

        let status = response.status();
        let response_headers = response.headers().clone();
        let content_type = response_headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(http_failure(status, text, attempt));
        }

        let body = if is_json(&content_type) {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| classify_transport(e, attempt))?;
            debug!(body = %String::from_utf8_lossy(&bytes), "Upstream JSON reply");
            classify(status, &content_type, Some(&bytes), attempt).into_result()?;
            UpstreamBody::Buffered(bytes)
        } else {
            classify(status, &content_type, None, attempt).into_result()?;
            UpstreamBody::Stream(response.bytes_stream().boxed())
        };

        Ok(UpstreamResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;

use crate::errors::GatewayError;
use crate::service::chat_service::ChatService;

/// POST `/api/ai-chat`: relays the upstream reply, or answers with a JSON
/// error envelope.
pub async fn ai_chat_handler(
    State(svc): State<ChatService>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request = ChatService::parse_request(&body)?;
    svc.chat(request).await
}

/// GET `/healthz`: process liveness only, never touches the upstream.
pub async fn health_handler() -> &'static str {
    "ok"
}

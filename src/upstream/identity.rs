use tracing::warn;
use uuid::Uuid;

use crate::config::UpstreamConfig;
use crate::errors::UpstreamError;
use crate::models::{ChatOverrides, ChatRequest, ConversationIdentity};

/// Resolves who the upstream call is made for.
///
/// Conversation id: explicit override, then the caller's id, then the
/// configured default, then a fresh UUID. User id: the configured default
/// wins over the caller's hint; a mismatch is only logged.
pub fn resolve_identity(
    config: &UpstreamConfig,
    request: &ChatRequest,
    overrides: &ChatOverrides,
) -> Result<ConversationIdentity, UpstreamError> {
    let conversation_id = non_blank(overrides.conversation_id.as_deref())
        .or_else(|| non_blank(request.conversation_id.as_deref()))
        .or_else(|| non_blank(config.default_conversation_id.as_deref()))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let provided = non_blank(request.user_id.as_deref());
    let configured = non_blank(config.default_user_id.as_deref());

    let user_id = match (configured, provided) {
        (Some(configured), Some(provided)) if configured != provided => {
            // TODO: confirm with product whether a mismatching caller identity should be rejected
            warn!(
                "Provided userId \"{provided}\" does not match the configured default, using the configured value"
            );
            configured
        }
        (Some(configured), _) => configured,
        (None, Some(provided)) => provided,
        (None, None) => {
            return Err(UpstreamError::Configuration(
                "no user id configured (set AI_CHAT_DEFAULT_USER_ID) and none supplied".to_string(),
            ))
        }
    };

    Ok(ConversationIdentity {
        conversation_id,
        user_id: user_id.to_string(),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

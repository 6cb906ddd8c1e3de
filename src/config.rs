use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_API_URL: &str =
    "https://ai.hust.edu.cn/proxy/chatai-session/agent/sseProxy/chat_query";
pub const DEFAULT_APP_ID: i64 = 143;
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} must be set")]
    MissingVar(&'static str),

    #[error("Invalid {key} value '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Everything the gateway needs from its environment, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Allowed browser origin; `None` allows any.
    pub cors_origin: Option<String>,
    pub upstream: UpstreamConfig,
}

/// Process-wide upstream settings. Read-only at request time.
#[derive(Clone)]
pub struct UpstreamConfig {
    pub api_url: String,
    pub bearer_token: String,
    pub cookie: Option<String>,
    pub app_id: i64,
    pub referer: Option<String>,
    pub origin: Option<String>,
    pub default_user_id: Option<String>,
    pub default_conversation_id: Option<String>,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub extra_headers: BTreeMap<String, String>,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_url", &self.api_url)
            .field("bearer_token", &"<redacted>")
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .field("app_id", &self.app_id)
            .field("referer", &self.referer)
            .field("origin", &self.origin)
            .field("default_user_id", &self.default_user_id)
            .field("default_conversation_id", &self.default_conversation_id)
            .field("user_agent", &self.user_agent)
            .field("accept_language", &self.accept_language)
            .field("extra_headers", &self.extra_headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl UpstreamConfig {
    /// Minimal configuration pointing at `api_url`, mostly useful in tests.
    pub fn new(api_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            bearer_token: bearer_token.into(),
            cookie: None,
            app_id: DEFAULT_APP_ID,
            referer: None,
            origin: None,
            default_user_id: None,
            default_conversation_id: None,
            user_agent: None,
            accept_language: None,
            extra_headers: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let api_url = var("AI_CHAT_API_URL").unwrap_or_else(|| {
            info!("AI_CHAT_API_URL not set, using default: {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });

        let bearer_token =
            var("AI_CHAT_BEARER_TOKEN").ok_or(ConfigError::MissingVar("AI_CHAT_BEARER_TOKEN"))?;

        let app_id = match var("AI_CHAT_APP_ID") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Invalid AI_CHAT_APP_ID '{raw}', using default: {DEFAULT_APP_ID}");
                DEFAULT_APP_ID
            }),
            None => DEFAULT_APP_ID,
        };

        let referer = var("AI_CHAT_REFERER");
        let origin = var("AI_CHAT_ORIGIN").or_else(|| referer.as_deref().and_then(origin_of));

        let extra_headers = var("AI_CHAT_EXTRA_HEADERS")
            .map(|raw| parse_extra_headers(&raw))
            .unwrap_or_default();

        Ok(Self {
            port,
            cors_origin: var("AI_CHAT_CORS_ORIGIN"),
            upstream: UpstreamConfig {
                api_url,
                bearer_token,
                cookie: var("AI_CHAT_COOKIE"),
                app_id,
                referer,
                origin,
                default_user_id: var("AI_CHAT_DEFAULT_USER_ID"),
                default_conversation_id: var("AI_CHAT_DEFAULT_CONVERSATION_ID"),
                user_agent: var("AI_CHAT_USER_AGENT"),
                accept_language: var("AI_CHAT_ACCEPT_LANGUAGE"),
                extra_headers,
            },
        })
    }
}

/// Keeps the string entries of a JSON object. Other entries are skipped
/// with a warning; anything but an object is ignored entirely.
fn parse_extra_headers(raw: &str) -> BTreeMap<String, String> {
    let fields = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => {
            warn!("AI_CHAT_EXTRA_HEADERS must be a JSON object, ignoring it");
            return BTreeMap::new();
        }
        Err(e) => {
            warn!("AI_CHAT_EXTRA_HEADERS is not valid JSON, ignoring it: {e}");
            return BTreeMap::new();
        }
    };

    fields
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::String(value) => Some((name, value)),
            other => {
                warn!("Skipping extra header '{name}' with non-string value {other}");
                None
            }
        })
        .collect()
}

/// Scheme, host and port of a URL, as sent in an `origin` header.
fn origin_of(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

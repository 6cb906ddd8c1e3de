use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE,
    COOKIE, ORIGIN, REFERER, USER_AGENT,
};
use tracing::warn;

use crate::config::UpstreamConfig;
use crate::errors::UpstreamError;
use crate::models::ChatOverrides;

const FETCH_METADATA: [(&str, &str); 3] = [
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
    ("sec-fetch-dest", "empty"),
];

/// Builds the upstream request headers. Overrides replace configured values;
/// extra headers never replace a header that is already set.
pub fn build_headers(
    config: &UpstreamConfig,
    overrides: &ChatOverrides,
) -> Result<HeaderMap, UpstreamError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

    let mut authorization = HeaderValue::from_str(&format!("Bearer {}", config.bearer_token))
        .map_err(|_| {
            UpstreamError::Configuration("bearer token is not a valid header value".to_string())
        })?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let user_agent = overrides.user_agent.as_ref().or(config.user_agent.as_ref());
    insert_optional(&mut headers, USER_AGENT, user_agent);
    insert_optional(&mut headers, COOKIE, config.cookie.as_ref());
    if let Some(cookie) = headers.get_mut(COOKIE) {
        cookie.set_sensitive(true);
    }

    for (name, value) in FETCH_METADATA {
        headers.insert(name, HeaderValue::from_static(value));
    }

    let accept_language = overrides
        .accept_language
        .as_ref()
        .or(config.accept_language.as_ref());
    insert_optional(&mut headers, ACCEPT_LANGUAGE, accept_language);
    insert_optional(
        &mut headers,
        REFERER,
        overrides.referer.as_ref().or(config.referer.as_ref()),
    );
    insert_optional(
        &mut headers,
        ORIGIN,
        overrides.origin.as_ref().or(config.origin.as_ref()),
    );

    let extra_headers = overrides
        .extra_headers
        .as_ref()
        .unwrap_or(&config.extra_headers);
    for (name, value) in extra_headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            warn!("Skipping invalid extra header name '{name}'");
            continue;
        };
        if headers.contains_key(&name) {
            continue;
        }
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => warn!("Skipping extra header '{name}' with an invalid value"),
        }
    }

    Ok(headers)
}

fn insert_optional(headers: &mut HeaderMap, name: HeaderName, value: Option<&String>) {
    let Some(value) = value.map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return;
    };
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!("Skipping header '{name}' with an invalid value"),
    }
}

/// Header list safe for logs: credentials keep only their last 4 characters.
pub fn redacted(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name = name.as_str().to_string();
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            let value = if is_secret(&name) { mask(&value) } else { value };
            (name, value)
        })
        .collect()
}

fn is_secret(name: &str) -> bool {
    name == "authorization" || name == "cookie" || name.contains("token") || name.contains("secret")
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "***REDACTED***".to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{visible}", "*".repeat(chars.len() - 4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config() -> UpstreamConfig {
        let mut config = UpstreamConfig::new("http://upstream.test/chat", "tok-123456789");
        config.user_agent = Some("campus-gateway/1.0".into());
        config.cookie = Some("sid=abcdef".into());
        config.referer = Some("https://ai.example.edu/chat".into());
        config.origin = Some("https://ai.example.edu".into());
        config
    }

    #[test]
    fn fixed_and_configured_headers_are_present() {
        let headers = build_headers(&config(), &ChatOverrides::default()).unwrap();
        assert_eq!(headers[ACCEPT], "*/*");
        assert_eq!(headers[AUTHORIZATION], "Bearer tok-123456789");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[USER_AGENT], "campus-gateway/1.0");
        assert_eq!(headers[COOKIE], "sid=abcdef");
        assert_eq!(headers[REFERER], "https://ai.example.edu/chat");
        assert_eq!(headers[ORIGIN], "https://ai.example.edu");
        assert_eq!(headers["sec-fetch-mode"], "cors");
        assert!(!headers.contains_key(ACCEPT_LANGUAGE));
    }

    #[test]
    fn overrides_win_over_configuration() {
        let overrides = ChatOverrides {
            user_agent: Some("override-agent".into()),
            accept_language: Some("zh-CN".into()),
            origin: Some("https://other.example.edu".into()),
            ..ChatOverrides::default()
        };
        let headers = build_headers(&config(), &overrides).unwrap();
        assert_eq!(headers[USER_AGENT], "override-agent");
        assert_eq!(headers[ACCEPT_LANGUAGE], "zh-CN");
        assert_eq!(headers[ORIGIN], "https://other.example.edu");
    }

    #[test]
    fn extra_headers_never_replace_existing_ones() {
        let mut config = config();
        config.extra_headers = BTreeMap::from([
            ("Authorization".to_string(), "Bearer stolen".to_string()),
            ("x-campus".to_string(), "main".to_string()),
            ("bad header".to_string(), "x".to_string()),
        ]);
        let headers = build_headers(&config, &ChatOverrides::default()).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer tok-123456789");
        assert_eq!(headers["x-campus"], "main");
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn invalid_token_is_a_configuration_error() {
        let config = UpstreamConfig::new("http://upstream.test", "line\nbreak");
        let err = build_headers(&config, &ChatOverrides::default()).unwrap_err();
        assert!(matches!(err, UpstreamError::Configuration(_)));
    }

    #[test]
    fn secrets_are_masked_in_logs() {
        let headers = build_headers(&config(), &ChatOverrides::default()).unwrap();
        let logged: BTreeMap<_, _> = redacted(&headers).into_iter().collect();
        assert_eq!(logged["authorization"], "****************6789");
        assert_eq!(logged["cookie"], "******cdef");
        assert_eq!(logged["user-agent"], "campus-gateway/1.0");
        assert_eq!(mask("short"), "***REDACTED***");
    }
}

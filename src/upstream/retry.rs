//! Response classification and retry policy, kept free of I/O and timers.

use std::time::Duration;

use reqwest::StatusCode;

use crate::errors::UpstreamError;
use crate::models::{ResponseMode, UpstreamEnvelope};

pub const BASE_BACKOFF: Duration = Duration::from_millis(300);

/// What one attempt amounted to.
#[derive(Debug)]
pub enum Outcome {
    Success,
    RetriableFailure(UpstreamError),
    FatalFailure(UpstreamError),
}

impl Outcome {
    fn from_error(error: UpstreamError) -> Self {
        if error.is_retriable() {
            Outcome::RetriableFailure(error)
        } else {
            Outcome::FatalFailure(error)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn into_result(self) -> Result<(), UpstreamError> {
        match self {
            Outcome::Success => Ok(()),
            Outcome::RetriableFailure(error) | Outcome::FatalFailure(error) => Err(error),
        }
    }
}

/// Classifies a received response.
///
/// `body` is the error text for non-2xx statuses and the buffered body for
/// JSON replies; streamed replies are classified without reading the body.
/// A JSON body that does not parse as an envelope counts as success.
pub fn classify(status: StatusCode, content_type: &str, body: Option<&[u8]>, attempt: u32) -> Outcome {
    if !status.is_success() {
        let body = body.map(|b| String::from_utf8_lossy(b).into_owned()).unwrap_or_default();
        return Outcome::from_error(http_failure(status, body, attempt));
    }

    if !is_json(content_type) {
        return Outcome::Success;
    }

    let Some(envelope) = body.and_then(UpstreamEnvelope::parse) else {
        return Outcome::Success;
    };

    match envelope.failure_code() {
        Some(code) => Outcome::from_error(UpstreamError::Logical {
            code,
            message: envelope.error_message(),
            data: envelope.data,
            attempts: attempt,
        }),
        None => Outcome::Success,
    }
}

pub fn http_failure(status: StatusCode, body: String, attempt: u32) -> UpstreamError {
    UpstreamError::Http {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        body,
        attempts: attempt,
    }
}

/// Transport failures never reached a response and are always retriable.
pub fn classify_transport(source: reqwest::Error, attempt: u32) -> UpstreamError {
    UpstreamError::Transport {
        source,
        attempts: attempt,
    }
}

pub fn is_json(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/json")
}

/// Attempt ceiling and exponential backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Streamed replies cannot be safely resumed, so they get fewer attempts.
    pub fn for_mode(mode: ResponseMode) -> Self {
        let max_attempts = match mode {
            ResponseMode::Streaming => 2,
            ResponseMode::Sync => 3,
        };
        Self {
            max_attempts,
            base_delay: BASE_BACKOFF,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): base, 2×base, 4×base…
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// The delay to wait before retrying after `error`, or `None` to give up.
    pub fn next_delay(&self, error: &UpstreamError, attempt: u32) -> Option<Duration> {
        (error.is_retriable() && attempt < self.max_attempts).then(|| self.backoff(attempt))
    }
}

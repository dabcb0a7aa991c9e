//! Classification of HTTP failures into retryable and final ones.

use reqwest::StatusCode;

/// Attempts made for a single request before giving up.
pub const MAX_ATTEMPTS: usize = 3;

/// A failure that will not go away by asking again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NonRetryableError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Access forbidden: {0}")]
    Forbidden(String),
    #[error("Rate limited by {0}, try again later")]
    RateLimited(String),
    #[error("HTTP {status} from {url}")]
    ClientError { status: u16, url: String },
}

/// Map a response status to a final error, or `None` when a retry may help.
pub fn classify_status(status: StatusCode, url: &str) -> Option<NonRetryableError> {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => Some(NonRetryableError::NotFound(url.into())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(NonRetryableError::Forbidden(url.into()))
        }
        StatusCode::TOO_MANY_REQUESTS => Some(NonRetryableError::RateLimited(url.into())),
        // Timeouts are worth another try
        StatusCode::REQUEST_TIMEOUT => None,
        s if s.is_client_error() => Some(NonRetryableError::ClientError {
            status: s.as_u16(),
            url: url.into(),
        }),
        _ => None,
    }
}

/// Converts an error from `error_for_status()` into an `anyhow::Error`,
/// replacing it with a [`NonRetryableError`] when retrying is pointless.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    let url = error
        .url()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "<unknown>".to_string());
    match error.status().and_then(|s| classify_status(s, &url)) {
        Some(final_error) => final_error.into(),
        None => error.into(),
    }
}

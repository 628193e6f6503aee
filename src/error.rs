//! Error types for image generation and editing.

use std::time::Duration;

/// Longest error body kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

const REDACTED: &str = "[REDACTED]";

/// Errors that can occur while talking to the image service.
#[derive(Debug, thiserror::Error)]
pub enum VisionaryError {
    /// API key missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The service answered, but without a usable image.
    #[error("{0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 or a data URI.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (reading an upload, saving a download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for image operations.
pub type Result<T> = std::result::Result<T, VisionaryError>;

/// Reduces an error response body to a short, human-readable message.
///
/// Google APIs wrap errors as `{"error": {"message": "..."}}`; when that shape
/// is present only the message is kept. Any occurrence of `api_key` is
/// replaced with `[REDACTED]`, then the result is trimmed and truncated.
pub(crate) fn sanitize_error_message(text: &str, api_key: &str) -> String {
    let extracted = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });

    let mut message = extracted.unwrap_or_else(|| text.trim().to_string());
    if !api_key.is_empty() {
        message = message.replace(api_key, REDACTED);
    }
    if message.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = message.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        message
    }
}

/// Parses a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

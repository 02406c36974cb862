//! Error types for product analysis and image generation.

use std::time::Duration;

/// Errors that can occur while analyzing a product or generating images.
#[derive(Debug, thiserror::Error)]
pub enum ProductShotError {
    /// Vendor credential is missing. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The source image could not be read or encoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The vendor returned no usable structured analysis.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// The vendor returned no image data.
    #[error("generation failed: {0}")]
    Generation(String),

    /// API key rejected by the vendor.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (e.g., reading the source or saving a result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProductShotError {
    /// Returns true if this error is likely transient and worth retrying by hand.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }

    /// Returns true for a missing credential.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, ProductShotError>;

const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Trims a vendor error body and redacts anything that looks like a key.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            let token = word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-');
            if token.starts_with("AIza") && token.len() >= 30 {
                word.replace(token, "[REDACTED]")
            } else {
                word.to_string()
            }
        })
        .collect();
    let joined = redacted.join(" ");

    if joined.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = joined.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        joined
    }
}

/// Reads a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(ProductShotError::RateLimited { retry_after: None }.is_retryable());

        assert!(!ProductShotError::Configuration("no key".into()).is_retryable());
        assert!(!ProductShotError::Auth("bad key".into()).is_retryable());
        assert!(!ProductShotError::ContentBlocked("nsfw".into()).is_retryable());
        assert!(!ProductShotError::Analysis("empty".into()).is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let rate_limited = ProductShotError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(60)));

        let rate_limited_no_hint = ProductShotError::RateLimited { retry_after: None };
        assert_eq!(rate_limited_no_hint.retry_after(), None);

        let auth = ProductShotError::Auth("bad".into());
        assert_eq!(auth.retry_after(), None);
    }

    #[test]
    fn test_configuration_is_distinct() {
        assert!(ProductShotError::Configuration("missing".into()).is_configuration());
        assert!(!ProductShotError::Auth("rejected".into()).is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = ProductShotError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = ProductShotError::ContentBlocked("Safety filter triggered".into());
        assert_eq!(err.to_string(), "content blocked: Safety filter triggered");
    }

    #[test]
    fn test_sanitize_redacts_keys() {
        let msg = "API key AIzaSyA1234567890abcdefghijklmnopqrstu is invalid";
        let clean = sanitize_error_message(msg);
        assert!(!clean.contains("AIzaSy"));
        assert!(clean.contains("[REDACTED]"));
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let long = "x".repeat(2000);
        let clean = sanitize_error_message(&long);
        assert_eq!(clean.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(clean.ends_with("..."));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));
    }
}

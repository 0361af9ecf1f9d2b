//! AI backend error types.

use std::time::Duration;

use thiserror::Error;

/// Errors from a call to the AI backend.
///
/// Every variant is an upstream failure; callers surface them as a gateway
/// error rather than a client error.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No API key was configured.
    #[error("AI service API key not configured")]
    MissingApiKey,

    /// The request did not complete within the configured timeout.
    #[error("AI request timed out after {}s", .elapsed.as_secs())]
    Timeout { elapsed: Duration },

    /// Connection, TLS, or body-read failure.
    #[error("AI request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// Non-2xx HTTP response.
    #[error("AI service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The service answered 2xx with an error object, or with a body that
    /// could not be decoded.
    #[error("AI service error: {message}")]
    Api { message: String },
}

impl BackendError {
    /// HTTP status code of the upstream response, if there was one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_reports_seconds() {
        let err = BackendError::Timeout {
            elapsed: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "AI request timed out after 30s");
    }

    #[test]
    fn upstream_status_only_for_http() {
        let err = BackendError::Http {
            status: 429,
            body: "quota".into(),
        };
        assert_eq!(err.upstream_status(), Some(429));
        assert_eq!(BackendError::MissingApiKey.upstream_status(), None);
    }
}

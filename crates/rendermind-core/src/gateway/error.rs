//! Generation backend errors.

use std::time::Duration;

/// Failure talking to a generation or transcription backend.
///
/// Always surfaced to the user; never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("{0}")]
    MissingCredential(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("backend timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("API Error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    InvalidBody(String),

    #[error("backend returned an empty response")]
    EmptyResponse,

    #[error("blocked by backend safety check: {0}")]
    SafetyBlocked(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_matches_ui_wording() {
        let err = BackendError::Status {
            status: 401,
            body: "{\"error\":\"bad key\"}".into(),
        };
        assert_eq!(err.to_string(), "API Error 401: {\"error\":\"bad key\"}");
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(
            BackendError::Timeout(Duration::from_secs(30)).to_string(),
            "backend timed out after 30s"
        );
    }
}

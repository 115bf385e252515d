//! Error taxonomy for the Tail Trading client
//!
//! Transport-level failures are distinct from application-level `error`
//! events, which arrive as well-formed terminal messages on the stream and
//! are never surfaced through this type.

use std::time::Duration;

use reqwest::StatusCode;

/// Errors surfaced by the API client and the streaming log ingestor.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network-level failure issuing a request or opening a stream.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    /// The service rejected the bearer credential (401).
    ///
    /// Callers are expected to re-authenticate rather than retry.
    #[error("authentication rejected: {0}")]
    AuthExpired(String),

    /// A chunk read failed after the stream session became active.
    #[error("stream read failed: {0}")]
    StreamRead(String),

    /// No terminal event and no end-of-stream within the configured window.
    #[error("stream timed out after {0:?}")]
    Timeout(Duration),
}

impl ClientError {
    /// Build the right error kind for a non-success HTTP status.
    pub(crate) fn from_status(status: StatusCode, detail: String) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            ClientError::AuthExpired(detail)
        } else {
            ClientError::Status { status, detail }
        }
    }
}

/// Convert a non-success response into the matching error kind, pulling
/// the server's `detail` message out of the body when it carries one.
pub(crate) async fn status_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail")?.as_str().map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.trim().to_string()
            }
        });

    ClientError::from_status(status, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_maps_to_auth_expired() {
        let err = ClientError::from_status(StatusCode::UNAUTHORIZED, "expired".to_string());
        assert!(matches!(err, ClientError::AuthExpired(_)));
    }

    #[test]
    fn test_other_statuses_keep_detail() {
        let err = ClientError::from_status(StatusCode::BAD_REQUEST, "bad cron".to_string());
        match err {
            ClientError::Status { status, detail } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(detail, "bad cron");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }
}

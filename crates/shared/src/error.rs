//! Error types shared by the client layers.

use thiserror::Error;

/// Failure of a REST call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Failure on the push channel.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("push connection closed")]
    Closed,
    #[error("invalid push frame: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_shows_status_and_body() {
        let err = ApiError::Http {
            status: 404,
            body: r#"{"message":"User not found"}"#.into(),
        };
        assert_eq!(err.to_string(), r#"HTTP 404: {"message":"User not found"}"#);
    }

    #[test]
    fn codec_errors_convert_from_serde() {
        let err: PushError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, PushError::Codec(_)));
        assert!(err.to_string().starts_with("invalid push frame"));
    }
}

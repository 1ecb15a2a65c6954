use thiserror::Error;

/// Errors surfaced by the embedding and completion clients.
#[derive(Debug, Clone, Error)]
pub enum SemanticError {
    /// Configuration is inconsistent (e.g., api mode without an API key).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// The request never produced an HTTP response (DNS, TLS, connection reset, timeout).
    #[error("request failed: {0}")]
    Transport(String),
    /// The upstream service answered with a non-success status.
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),
    /// The service returned a different number of embeddings than inputs sent.
    #[error("API returned {got} embeddings for {expected} inputs")]
    BatchMismatch { expected: usize, got: usize },
    /// The completion stream broke after it had started.
    #[error("completion stream failed: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for SemanticError {
    fn from(err: reqwest::Error) -> Self {
        SemanticError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_keeps_variant_and_fields() {
        let err = SemanticError::Http {
            status: 429,
            body: "slow down".into(),
        };
        match err.clone() {
            SemanticError::Http { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert_eq!(err.clone().to_string(), err.to_string());
    }

    #[test]
    fn error_invalid_config() {
        let err = SemanticError::InvalidConfig("missing api key".into());
        assert!(err.to_string().contains("invalid semantic config"));
        assert!(err.to_string().contains("missing api key"));
    }

    #[test]
    fn error_http_includes_status_and_body() {
        let err = SemanticError::Http {
            status: 401,
            body: "Incorrect API key provided".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Incorrect API key"));
    }

    #[test]
    fn error_batch_mismatch() {
        let err = SemanticError::BatchMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "API returned 2 embeddings for 3 inputs");
    }

    #[test]
    fn error_clone_preserves_message() {
        let variants = vec![
            SemanticError::InvalidConfig("a".into()),
            SemanticError::Transport("b".into()),
            SemanticError::Http {
                status: 500,
                body: "c".into(),
            },
            SemanticError::Decode("d".into()),
            SemanticError::BatchMismatch {
                expected: 1,
                got: 0,
            },
            SemanticError::Stream("e".into()),
        ];

        for err in variants {
            assert_eq!(err.to_string(), err.clone().to_string());
        }
    }
}

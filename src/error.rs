use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crate::runner::ExitError;

/// Custom error type for webhook_dispatch operations
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("method not allowed")]
    InvalidMethod,

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("couldn't read request body: {0}")]
    ReadFailure(String),

    #[error("no signature")]
    MissingSignature,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid form: {0}")]
    MalformedForm(String),

    #[error("invalid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("no matching repository found for '{0}'")]
    NoMatchingRepository(String),

    #[error("couldn't run command '{command}': {source}")]
    CommandExecutionFailed {
        command: String,
        #[source]
        source: ExitError,
    },

    #[error("couldn't encode push event: {0}")]
    EventEncoding(String),

    #[error("command task failed: {0}")]
    TaskFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::MissingSignature
            | DispatchError::InvalidSignature
            | DispatchError::MalformedForm(_)
            | DispatchError::MalformedJson(_)
            | DispatchError::NoMatchingRepository(_) => StatusCode::BAD_REQUEST,
            DispatchError::BodyTooLarge { .. }
            | DispatchError::ReadFailure(_)
            | DispatchError::CommandExecutionFailed { .. }
            | DispatchError::EventEncoding(_)
            | DispatchError::TaskFailed(_)
            | DispatchError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Helper type for Results that use DispatchError
pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn rejections_map_to_bad_request() {
        assert_eq!(
            DispatchError::MissingSignature.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DispatchError::NoMatchingRepository("a/b".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DispatchError::InvalidMethod.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn command_failure_is_a_server_error_with_details() {
        let err = DispatchError::CommandExecutionFailed {
            command: "make".into(),
            source: ExitError::Launch(io::Error::new(io::ErrorKind::NotFound, "not found")),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = err.to_string();
        assert!(text.starts_with("couldn't run command 'make'"));
        assert!(text.contains("not found"));
    }

    #[test]
    fn server_side_failures_are_not_blamed_on_the_client() {
        let encoding = DispatchError::EventEncoding("key must be a string".into());
        assert_eq!(encoding.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(encoding.to_string().starts_with("couldn't encode push event"));

        let task = DispatchError::TaskFailed("task panicked".into());
        assert_eq!(task.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

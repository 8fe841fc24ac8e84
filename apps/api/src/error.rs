use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// The error taxonomy of spec.md §7, surfaced over HTTP. `confab_store`,
/// `confab_external` and `confab_chat` each speak a narrower error type;
/// every route handler converts into this one at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("upstream failure ({dependency}): {message}")]
    UpstreamFailure {
        dependency: &'static str,
        message: String,
    },
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<confab_store::StoreError> for ApiError {
    fn from(e: confab_store::StoreError) -> Self {
        use confab_store::StoreError::*;
        match e {
            NotFound => ApiError::NotFound,
            Conflict(m) => ApiError::Conflict(m),
            InvalidState(m) => ApiError::InvalidState(m),
            InvalidInput(m) => ApiError::InvalidInput(m),
            Database(e) => {
                tracing::error!(error = %e, "store_database_error");
                ApiError::Internal(anyhow::anyhow!(e))
            }
            Io(e) => {
                tracing::error!(error = %e, "store_io_error");
                ApiError::Internal(anyhow::anyhow!(e))
            }
        }
    }
}

impl From<confab_external::UpstreamError> for ApiError {
    fn from(e: confab_external::UpstreamError) -> Self {
        ApiError::UpstreamFailure {
            dependency: e.dependency,
            message: e.message,
        }
    }
}

impl From<confab_chat::ChatError> for ApiError {
    fn from(e: confab_chat::ChatError) -> Self {
        match e {
            confab_chat::ChatError::Store(e) => e.into(),
            confab_chat::ChatError::Upstream(e) => e.into(),
        }
    }
}

impl From<confab_broker::BrokerError> for ApiError {
    fn from(e: confab_broker::BrokerError) -> Self {
        tracing::error!(error = %e, "broker_error");
        ApiError::Internal(anyhow::anyhow!(e))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict", self.to_string()),
            ApiError::InvalidState(_) => {
                (StatusCode::BAD_REQUEST, "invalid_state", self.to_string())
            }
            ApiError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, "invalid_input", self.to_string())
            }
            ApiError::UpstreamFailure { .. } => (
                StatusCode::BAD_GATEWAY,
                "upstream_failure",
                self.to_string(),
            ),
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "internal_error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: kind, message })).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

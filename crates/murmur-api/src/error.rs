use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use murmur_types::api::ApiResponse;

/// Everything a handler can fail with. Rendered as the standard
/// `{success: false, message}` envelope; upstream and store internals are
/// logged, never echoed to clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Username is already taken")]
    UsernameTaken,
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("Incorrect verification code")]
    WrongCode,
    #[error("Verification code has expired, please sign up again to get a new code")]
    CodeExpired,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("User is not accepting messages")]
    GateClosed,
    #[error("Upstream service failure, please try again")]
    Upstream(#[source] anyhow::Error),
    #[error("Internal server error")]
    Store(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::UsernameTaken
            | ApiError::EmailTaken
            | ApiError::WrongCode
            | ApiError::CodeExpired => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::GateClosed => StatusCode::FORBIDDEN,
            ApiError::Upstream(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Upstream(e) | ApiError::Store(e) = &self {
            error!("request failed: {e:#}");
        }

        let body = ApiResponse {
            success: false,
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Flatten the double Result of a `spawn_blocking` store call.
pub(crate) fn blocking<T>(
    joined: Result<anyhow::Result<T>, tokio::task::JoinError>,
) -> Result<T, ApiError> {
    joined
        .map_err(|e| ApiError::Store(anyhow::anyhow!("spawn_blocking join error: {e}")))?
        .map_err(ApiError::Store)
}

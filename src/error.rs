use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Failure modes exposed by the API surface.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Could not validate credentials")]
    Unauthenticated,

    /// Login failure. Deliberately does not say whether the email or the
    /// password was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    /// Wrong, expired and already-consumed codes all collapse into this one
    /// outcome so a caller cannot probe which check failed.
    #[error("Invalid or expired OTP")]
    InvalidOtp,

    #[error("{0}")]
    Validation(String),

    #[error("A code was issued recently, try again shortly")]
    Cooldown,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidOtp | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Cooldown => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref e) = self {
            error!(error = ?e, "internal error");
        }
        let status = self.status_code();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result alias used by handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("Inactive user").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::NotFound("User").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Conflict("Email already registered".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::InvalidOtp.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Cooldown.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn not_found_message_names_entity() {
        assert_eq!(ApiError::NotFound("Achievement").to_string(), "Achievement not found");
    }

    #[test]
    fn internal_error_hides_cause() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Internal server error");
    }
}

//! Centralized error types for gw2style.
//!
//! Uses `thiserror` for ergonomic error definitions and provides HTTP-friendly
//! error variants that can be directly converted to API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Core application error type used by the API and repositories.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    // === Auth errors ===
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Missing authentication token")]
    Unauthorized,

    // === Resource errors ===
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    // === Validation errors ===
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // === Permission errors ===
    #[error("Missing required permission: {permission}")]
    MissingPermission { permission: String },

    #[error("Forbidden")]
    Forbidden,

    // === Infrastructure errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body sent to clients.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    code: u16,
    error: String,
    message: String,
}

impl StyleError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::InvalidToken | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::AlreadyExists { .. } => StatusCode::CONFLICT,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::MissingPermission { .. } | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code string for programmatic handling by clients.
    pub fn error_code(&self) -> &str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::MissingPermission { .. } => "MISSING_PERMISSION",
            Self::Forbidden => "FORBIDDEN",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for StyleError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::TokenExpired,
            _ => Self::InvalidToken,
        }
    }
}

impl IntoResponse for StyleError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't leak internal details to clients
        let message = match &self {
            StyleError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "An internal error occurred".to_string()
            }
            StyleError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            code: status.as_u16(),
            error: self.error_code().to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results using StyleError.
pub type StyleResult<T> = Result<T, StyleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: StyleError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn internal_errors_are_masked() {
        let (status, body) =
            body_json(StyleError::Internal(anyhow::anyhow!("pool exhausted at 10.0.0.3"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
        assert_eq!(body["error"], "INTERNAL_ERROR");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let (status, body) = body_json(StyleError::not_found("Post")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Post not found");
        assert_eq!(body["code"], 404);
    }

    #[test]
    fn expired_jwt_maps_to_token_expired() {
        let err: StyleError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature)
                .into();
        assert!(matches!(err, StyleError::TokenExpired));

        let err: StyleError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature)
                .into();
        assert!(matches!(err, StyleError::InvalidToken));
    }

    #[test]
    fn permission_errors_are_forbidden() {
        let err = StyleError::MissingPermission {
            permission: "builds".into(),
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Missing required permission: builds");
    }
}

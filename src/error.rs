//! Application error type and its HTTP mapping.
//!
//! Every layer reports failures through [`AppError`]. Handlers return it directly
//! and the [`IntoResponse`] impl renders the JSON error envelope:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "...", "details": {} } }
//! ```

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::utils::db_error::is_unique_violation_on_token;

/// Serialized error payload shared by API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Error taxonomy of the service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or missing input. Reported before any side effect.
    #[error("{message}")]
    Validation { message: String, details: Value },

    #[error("{message}")]
    Unauthorized { message: String, details: Value },

    /// The requester does not own the record.
    #[error("{message}")]
    Forbidden { message: String, details: Value },

    /// Token or record absent, or cache entry expired.
    #[error("{message}")]
    NotFound { message: String, details: Value },

    #[error("{message}")]
    Conflict { message: String, details: Value },

    /// Client exceeded its request window.
    #[error("{message}")]
    RateLimited { message: String, details: Value },

    /// Transient infrastructure failure (timeout, lost connection).
    #[error("{message}")]
    Unavailable { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn unauthorized(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details,
        }
    }

    pub fn forbidden(message: impl Into<String>, details: Value) -> Self {
        Self::Forbidden {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }

    pub fn rate_limited(message: impl Into<String>, details: Value) -> Self {
        Self::RateLimited {
            message: message.into(),
            details,
        }
    }

    pub fn unavailable(message: impl Into<String>, details: Value) -> Self {
        Self::Unavailable {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Returns true for failures that may succeed when repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    fn parts(&self) -> (StatusCode, &'static str, &str, &Value) {
        match self {
            Self::Validation { message, details } => {
                (StatusCode::BAD_REQUEST, "validation_error", message, details)
            }
            Self::Unauthorized { message, details } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", message, details)
            }
            Self::Forbidden { message, details } => {
                (StatusCode::FORBIDDEN, "forbidden", message, details)
            }
            Self::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "not_found", message, details)
            }
            Self::Conflict { message, details } => {
                (StatusCode::CONFLICT, "conflict", message, details)
            }
            Self::RateLimited { message, details } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                message,
                details,
            ),
            Self::Unavailable { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_unavailable",
                message,
                details,
            ),
            Self::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                details,
            ),
        }
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        self.parts().0
    }

    /// Converts the error into its serializable form.
    pub fn to_error_info(&self) -> ErrorInfo {
        let (_, code, message, details) = self.parts();
        ErrorInfo {
            code,
            message: message.to_string(),
            details: details.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if is_unique_violation_on_token(&e) {
            return AppError::conflict("Token already exists", json!({}));
        }

        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => {
                tracing::error!(error = %e, "Record store unavailable");
                AppError::unavailable("Record store unavailable", json!({}))
            }
            other => {
                tracing::error!(error = %other, "Database error");
                AppError::internal("Database error", json!({}))
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors).unwrap_or_default();
        AppError::bad_request("Validation failed", details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::bad_request("x", json!({})).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::forbidden("x", json!({})).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::rate_limited("x", json!({})).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::unavailable("x", json!({})).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_uses_message() {
        let err = AppError::not_found("URL not found or expired", json!({}));
        assert_eq!(err.to_string(), "URL not found or expired");
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(AppError::unavailable("x", json!({})).is_transient());
        assert!(!AppError::internal("x", json!({})).is_transient());
        assert!(!AppError::not_found("x", json!({})).is_transient());
    }

    #[test]
    fn test_unauthorized_sets_www_authenticate() {
        let response = AppError::unauthorized("Unauthorized", json!({})).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_error_info_code() {
        let info = AppError::rate_limited("Rate limit exceeded", json!({})).to_error_info();
        assert_eq!(info.code, "rate_limited");
        assert_eq!(info.message, "Rate limit exceeded");
    }
}

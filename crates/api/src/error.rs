//! Unified error handling for the API.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as
//! `{"error": "...", "details": ...}` with a 4xx/5xx status. Server-side
//! failures are captured to Sentry and their details never reach the client.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// A third-party service (SMS, email, image host, reviews) failed.
    #[error("External service error: {0}")]
    Upstream(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but may not do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed or invalid input.
    #[error("{0}")]
    BadRequest(String),

    /// Invalid input with structured details (e.g. per-field messages).
    #[error("{message}")]
    Validation {
        message: String,
        details: serde_json::Value,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// Status code this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_))
            | Self::BadRequest(_)
            | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, details) = match self {
            Self::Database(RepositoryError::NotFound) => ("Not found".to_string(), None),
            Self::Database(RepositoryError::Conflict(msg)) => (msg.clone(), None),
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => ("Internal server error".to_string(), None),
            Self::Upstream(_) => ("External service error".to_string(), None),
            Self::Validation { message, details } => (message.clone(), Some(details.clone())),
            _ => (self.to_string(), None),
        };
        ErrorBody { error, details }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "API request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "API request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Name the missing record when a repository call reports `NotFound`.
pub trait NotFoundExt<T> {
    /// Turn `RepositoryError::NotFound` into `AppError::NotFound(entity)`.
    ///
    /// # Errors
    ///
    /// Returns the mapped error.
    fn or_not_found(self, entity: &'static str) -> Result<T>;
}

impl<T> NotFoundExt<T> for std::result::Result<T, RepositoryError> {
    fn or_not_found(self, entity: &'static str) -> Result<T> {
        self.map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(entity),
            other => AppError::Database(other),
        })
    }
}

/// Set the Sentry user context for the signed-in account.
pub fn set_sentry_user(account_id: i32, kind: stowline_core::AccountKind) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(format!("{kind}:{account_id}")),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Appointment");
        assert_eq!(err.to_string(), "Appointment not found");

        let err = AppError::BadRequest("Phone number must be 10 digits".to_string());
        assert_eq!(err.to_string(), "Phone number must be 10 digits");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("Storage unit")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("no session".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("viewer".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict(
                "taken".to_string()
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Upstream("twilio down".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_or_not_found_names_the_entity() {
        let missing: std::result::Result<(), RepositoryError> = Err(RepositoryError::NotFound);
        let err = missing.or_not_found("Appointment").unwrap_err();
        assert_eq!(err.body().error, "Appointment not found");

        let conflict: std::result::Result<(), RepositoryError> =
            Err(RepositoryError::Conflict("taken".to_string()));
        let err = conflict.or_not_found("Appointment").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let body = AppError::Database(RepositoryError::Database(sqlx::Error::ColumnDecode {
            index: "phone_number".to_string(),
            source: "phone number must be 10 digits (got 2)".into(),
        }))
        .body();
        assert_eq!(body.error, "Internal server error");
        assert!(body.details.is_none());

        let body = AppError::Upstream("twilio said 401".to_string()).body();
        assert_eq!(body.error, "External service error");
    }

    #[test]
    fn test_validation_error_carries_details() {
        let err = AppError::Validation {
            message: "Invalid appointment".to_string(),
            details: serde_json::json!({"zipcode": "must be 5 digits"}),
        };
        let json = serde_json::to_value(err.body()).unwrap();
        assert_eq!(json["error"], "Invalid appointment");
        assert_eq!(json["details"]["zipcode"], "must be 5 digits");
    }
}

//! Authentication error types.

use thiserror::Error;

use stowline_core::{AccountKind, ContactError};

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::services::messaging::MessagingError;

/// Errors that can occur while sending or checking a login code.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The contact is neither a valid phone number nor email.
    #[error("invalid contact: {0}")]
    InvalidContact(#[from] ContactError),

    /// Admins sign in by email only.
    #[error("admins must sign in with an email address")]
    AdminRequiresEmail,

    /// No account of the requested kind has this contact.
    #[error("no {0} account found for this contact")]
    AccountNotFound(AccountKind),

    /// No unused, unexpired code exists for the contact.
    #[error("verification code expired or not found")]
    CodeExpired,

    /// The code did not match.
    #[error("invalid verification code")]
    InvalidCode,

    /// Too many wrong guesses for this code.
    #[error("too many attempts, request a new code")]
    TooManyAttempts,

    /// The code could not be delivered.
    #[error("failed to deliver code: {0}")]
    Delivery(#[from] MessagingError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidContact(_) | AuthError::AdminRequiresEmail => {
                Self::BadRequest(err.to_string())
            }
            AuthError::AccountNotFound(_) => Self::NotFound("Account"),
            AuthError::CodeExpired | AuthError::InvalidCode | AuthError::TooManyAttempts => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::Delivery(e) => e.into(),
            AuthError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<MessagingError> for AppError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::NotConfigured(_) | MessagingError::Template(_) => {
                Self::Internal(err.to_string())
            }
            MessagingError::Sms(_) | MessagingError::Email(_) => Self::Upstream(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::messages::Channel;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AuthError::AdminRequiresEmail, StatusCode::BAD_REQUEST),
            (
                AuthError::AccountNotFound(AccountKind::Driver),
                StatusCode::NOT_FOUND,
            ),
            (AuthError::InvalidCode, StatusCode::UNAUTHORIZED),
            (AuthError::TooManyAttempts, StatusCode::UNAUTHORIZED),
            (
                AuthError::Delivery(MessagingError::NotConfigured(Channel::Sms)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }
}

//! Admin management commands.
//!
//! # Usage
//!
//! ```bash
//! stowline admin create -e ops@example.com -n "Ops Lead" -r super_admin
//! ```
//!
//! Admins sign in with a code sent to this email address.

use stowline_api::db::{AdminRepository, RepositoryError};
use stowline_core::{AdminRole, Email};
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Admin already exists.
    #[error("Admin already exists with email: {0}")]
    AdminExists(String),

    /// Database error.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a new admin and return its ID.
///
/// # Errors
///
/// Returns an error for an invalid role or email, an existing admin, or a
/// database failure.
pub async fn create(email: &str, name: &str, role: &str) -> Result<i32, Box<dyn std::error::Error>> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;

    let pool = super::connect().await?;

    tracing::info!("Creating admin: {} ({})", email, role);

    let admin = AdminRepository::new(&pool)
        .create(&email, name.trim(), role)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::AdminExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin created successfully! ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );

    Ok(admin.id.as_i32())
}

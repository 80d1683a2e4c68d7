//! Admin account repository.

use sqlx::PgPool;

use stowline_core::{AdminId, AdminRole, Email};

use super::RepositoryError;
use crate::models::Admin;

/// Repository for admin accounts.
pub struct AdminRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRepository<'a> {
    /// Create a new admin repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an admin by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AdminId) -> Result<Option<Admin>, RepositoryError> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT id, email, name, role, created_at FROM admins WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(admin)
    }

    /// Find an admin by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<Admin>, RepositoryError> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT id, email, name, role, created_at FROM admins WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(admin)
    }

    /// Create an admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        role: AdminRole,
    ) -> Result<Admin, RepositoryError> {
        sqlx::query_as::<_, Admin>(
            r"
            INSERT INTO admins (email, name, role)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, role, created_at
            ",
        )
        .bind(email)
        .bind(name)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "An admin with this email already exists"))
    }
}

//! Customer account repository.

use sqlx::PgPool;

use stowline_core::{Email, PhoneNumber, UserId};

use super::RepositoryError;
use crate::models::User;

const COLUMNS: &str = "id, first_name, last_name, email, phone_number, verified_phone_number, \
                       created_at, updated_at";

/// Message returned when another customer already owns a phone number.
pub const PHONE_IN_USE: &str = "Phone number is already in use";

/// Whether a phone number held by `owner` is unavailable to `user`.
#[must_use]
pub fn is_taken_by_other(owner: Option<UserId>, user: UserId) -> bool {
    owner.is_some_and(|owner| owner != user)
}

/// Repository for customer accounts.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Find the user who owns a phone number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {COLUMNS} FROM users WHERE phone_number = $1"
        ))
        .bind(phone)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Find a user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Save a new phone number. The number must be re-verified afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another user owns the number,
    /// `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_phone_number(
        &self,
        id: UserId,
        phone: &PhoneNumber,
    ) -> Result<User, RepositoryError> {
        let owner: Option<UserId> =
            sqlx::query_scalar("SELECT id FROM users WHERE phone_number = $1")
                .bind(phone)
                .fetch_optional(self.pool)
                .await?;

        if is_taken_by_other(owner, id) {
            return Err(RepositoryError::Conflict(PHONE_IN_USE.to_string()));
        }

        sqlx::query_as::<_, User>(&format!(
            r"
            UPDATE users
            SET phone_number = $2, verified_phone_number = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(phone)
        .fetch_optional(self.pool)
        .await
        // Lost a race with another user claiming the same number.
        .map_err(|e| RepositoryError::conflict_on_unique(e, PHONE_IN_USE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Mark the user's phone number verified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_phone_verified(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET verified_phone_number = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_ownership() {
        let me = UserId::new(1);
        assert!(!is_taken_by_other(None, me));
        assert!(!is_taken_by_other(Some(me), me));
        assert!(is_taken_by_other(Some(UserId::new(2)), me));
    }
}

//! One-time login codes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use stowline_core::VerificationCodeId;

use super::RepositoryError;

/// A stored code. Only the hash of the code is kept.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationCode {
    pub id: VerificationCodeId,
    /// Normalized phone digits or lowercase email.
    pub contact: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, contact, code_hash, expires_at, attempts, consumed_at, created_at";

/// Repository for verification codes.
pub struct VerificationCodeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VerificationCodeRepository<'a> {
    /// Create a new verification code repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a fresh code, retiring any earlier unused code under the same key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the writes fail.
    pub async fn create(
        &self,
        contact: &str,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationCode, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE verification_codes
            SET consumed_at = NOW()
            WHERE contact = $1 AND consumed_at IS NULL
            ",
        )
        .bind(contact)
        .execute(&mut *tx)
        .await?;

        let code = sqlx::query_as::<_, VerificationCode>(&format!(
            r"
            INSERT INTO verification_codes (contact, code_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {COLUMNS}
            "
        ))
        .bind(contact)
        .bind(code_hash)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(code)
    }

    /// The newest unused, unexpired code under `contact` (see `services::auth::code_key`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_active(&self, contact: &str) -> Result<Option<VerificationCode>, RepositoryError> {
        let code = sqlx::query_as::<_, VerificationCode>(&format!(
            r"
            SELECT {COLUMNS}
            FROM verification_codes
            WHERE contact = $1 AND consumed_at IS NULL AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            "
        ))
        .bind(contact)
        .fetch_optional(self.pool)
        .await?;
        Ok(code)
    }

    /// Count a failed attempt. Returns the new attempt count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_failed_attempt(&self, id: VerificationCodeId) -> Result<i32, RepositoryError> {
        let attempts: i32 = sqlx::query_scalar(
            "UPDATE verification_codes SET attempts = attempts + 1 WHERE id = $1 RETURNING attempts",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(attempts)
    }

    /// Mark a code used. Returns false if it was already consumed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn consume(&self, id: VerificationCodeId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE verification_codes SET consumed_at = NOW() WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

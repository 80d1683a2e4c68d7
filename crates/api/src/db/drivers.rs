//! Driver repository.

use sqlx::PgPool;

use stowline_core::{AdminId, DriverId, Email, MovingPartnerId, PhoneNumber};

use super::{RepositoryError, admin_logs};
use crate::models::admin_log::{AdminAction, AdminLogTarget, NewAdminLog};
use crate::models::Driver;

const COLUMNS: &str = "id, first_name, last_name, email, phone_number, verified_phone_number, \
                       is_approved, onfleet_worker_id, stripe_connect_account_id, \
                       stripe_onboarding_complete, stripe_payouts_enabled, created_at, updated_at";

/// Repository for drivers.
pub struct DriverRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DriverRepository<'a> {
    /// Create a new driver repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List drivers, optionally only those awaiting approval.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, approved: Option<bool>) -> Result<Vec<Driver>, RepositoryError> {
        let drivers = sqlx::query_as::<_, Driver>(&format!(
            r"
            SELECT {COLUMNS}
            FROM drivers
            WHERE ($1::BOOLEAN IS NULL OR is_approved = $1)
            ORDER BY created_at DESC
            "
        ))
        .bind(approved)
        .fetch_all(self.pool)
        .await?;
        Ok(drivers)
    }

    /// Get a driver by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: DriverId) -> Result<Option<Driver>, RepositoryError> {
        let driver = sqlx::query_as::<_, Driver>(&format!("SELECT {COLUMNS} FROM drivers WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(driver)
    }

    /// Find a driver by phone number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Driver>, RepositoryError> {
        let driver = sqlx::query_as::<_, Driver>(&format!(
            "SELECT {COLUMNS} FROM drivers WHERE phone_number = $1"
        ))
        .bind(phone)
        .fetch_optional(self.pool)
        .await?;
        Ok(driver)
    }

    /// Find a driver by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<Driver>, RepositoryError> {
        let driver = sqlx::query_as::<_, Driver>(&format!("SELECT {COLUMNS} FROM drivers WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(driver)
    }

    /// Mark the driver's phone number verified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_phone_verified(&self, id: DriverId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE drivers SET verified_phone_number = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Approve or unapprove a driver and record who did it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the driver doesn't exist.
    pub async fn set_approval(
        &self,
        id: DriverId,
        approved: bool,
        admin_id: AdminId,
    ) -> Result<Driver, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let driver = sqlx::query_as::<_, Driver>(&format!(
            r"
            UPDATE drivers
            SET is_approved = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(approved)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let action = if approved {
            AdminAction::ApproveDriver
        } else {
            AdminAction::UnapproveDriver
        };
        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(admin_id, action, AdminLogTarget::Driver, id.as_i32())
                .with_details(serde_json::json!({ "approved": approved })),
        )
        .await?;

        tx.commit().await?;
        Ok(driver)
    }

    /// Partners the driver is actively linked to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_partner_ids(
        &self,
        id: DriverId,
    ) -> Result<Vec<MovingPartnerId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, MovingPartnerId>(
            r"
            SELECT moving_partner_id
            FROM moving_partner_drivers
            WHERE driver_id = $1 AND is_active = TRUE
            ORDER BY moving_partner_id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }
}

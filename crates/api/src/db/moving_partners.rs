//! Moving partner repository: onboarding and activation.

use sqlx::PgPool;

use stowline_core::{AdminId, DriverId, Email, MovingPartnerId, MovingPartnerStatus, PhoneNumber};

use super::{RepositoryError, admin_logs};
use crate::models::admin_log::{AdminAction, AdminLogTarget, NewAdminLog};
use crate::models::onboarding::ActivationOutcome;
use crate::models::{ActivationCheck, MovingPartner};

const COLUMNS: &str = "id, name, email, phone_number, is_approved, status, onfleet_team_id, \
                       stripe_connect_account_id, stripe_onboarding_complete, \
                       stripe_payouts_enabled, created_at, updated_at";

/// Repository for moving partners.
pub struct MovingPartnerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MovingPartnerRepository<'a> {
    /// Create a new moving partner repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List partners, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<MovingPartnerStatus>,
    ) -> Result<Vec<MovingPartner>, RepositoryError> {
        let partners = sqlx::query_as::<_, MovingPartner>(&format!(
            r"
            SELECT {COLUMNS}
            FROM moving_partners
            WHERE ($1::moving_partner_status IS NULL OR status = $1)
            ORDER BY name
            "
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(partners)
    }

    /// Get a partner by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: MovingPartnerId,
    ) -> Result<Option<MovingPartner>, RepositoryError> {
        let partner = sqlx::query_as::<_, MovingPartner>(&format!(
            "SELECT {COLUMNS} FROM moving_partners WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(partner)
    }

    /// Find a partner by phone number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<MovingPartner>, RepositoryError> {
        let partner = sqlx::query_as::<_, MovingPartner>(&format!(
            "SELECT {COLUMNS} FROM moving_partners WHERE phone_number = $1"
        ))
        .bind(phone)
        .fetch_optional(self.pool)
        .await?;
        Ok(partner)
    }

    /// Find a partner by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<MovingPartner>, RepositoryError> {
        let partner = sqlx::query_as::<_, MovingPartner>(&format!(
            "SELECT {COLUMNS} FROM moving_partners WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(partner)
    }

    /// Approve or unapprove a partner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the partner doesn't exist.
    pub async fn set_approval(
        &self,
        id: MovingPartnerId,
        approved: bool,
        admin_id: AdminId,
    ) -> Result<MovingPartner, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let partner = sqlx::query_as::<_, MovingPartner>(&format!(
            r"
            UPDATE moving_partners
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
            AdminAction::ApproveMovingPartner
        } else {
            AdminAction::UnapproveMovingPartner
        };
        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(admin_id, action, AdminLogTarget::MovingPartner, id.as_i32())
                .with_details(serde_json::json!({ "approved": approved })),
        )
        .await?;

        tx.commit().await?;
        Ok(partner)
    }

    /// Set or clear the dispatch-platform team.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the partner doesn't exist.
    pub async fn set_dispatch_team(
        &self,
        id: MovingPartnerId,
        team_id: Option<&str>,
        admin_id: AdminId,
    ) -> Result<MovingPartner, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let partner = sqlx::query_as::<_, MovingPartner>(&format!(
            r"
            UPDATE moving_partners
            SET onfleet_team_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(team_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(
                admin_id,
                AdminAction::UpdateDispatchTeam,
                AdminLogTarget::MovingPartner,
                id.as_i32(),
            )
            .with_details(serde_json::json!({ "onfleetTeamId": team_id })),
        )
        .await?;

        tx.commit().await?;
        Ok(partner)
    }

    /// Linked drivers that are approved and whose link is active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_approved_drivers(&self, id: MovingPartnerId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM moving_partner_drivers mpd
            JOIN drivers d ON d.id = mpd.driver_id
            WHERE mpd.moving_partner_id = $1
              AND mpd.is_active = TRUE
              AND d.is_approved = TRUE
            ",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Activate the partner if every requirement is met.
    ///
    /// A partner that is already active, or that fails the check, is
    /// returned as stored with nothing written. `admin_id` is recorded in the
    /// audit log when an admin triggered the evaluation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the partner doesn't exist.
    pub async fn evaluate_activation(
        &self,
        id: MovingPartnerId,
        min_approved_drivers: u32,
        admin_id: Option<AdminId>,
    ) -> Result<ActivationOutcome, RepositoryError> {
        let partner = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        let approved_drivers = self.count_approved_drivers(id).await?;
        let check = ActivationCheck::for_partner(&partner, approved_drivers, min_approved_drivers);

        if partner.status == MovingPartnerStatus::Active || !check.passes() {
            return Ok(ActivationOutcome {
                unmet: check.unmet(),
                moving_partner: partner,
                activated: false,
                check,
            });
        }

        let mut tx = self.pool.begin().await?;

        // Another request may have activated the partner in the meantime.
        let activated = sqlx::query_as::<_, MovingPartner>(&format!(
            r"
            UPDATE moving_partners
            SET status = 'ACTIVE', updated_at = NOW()
            WHERE id = $1 AND status <> 'ACTIVE'
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(activated) = activated else {
            tx.rollback().await?;
            let current = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
            return Ok(ActivationOutcome {
                moving_partner: current,
                activated: false,
                check,
                unmet: Vec::new(),
            });
        };

        if let Some(admin_id) = admin_id {
            admin_logs::insert(
                &mut *tx,
                &NewAdminLog::new(
                    admin_id,
                    AdminAction::ActivateMovingPartner,
                    AdminLogTarget::MovingPartner,
                    id.as_i32(),
                )
                .with_details(serde_json::json!({ "approvedDrivers": approved_drivers })),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(moving_partner_id = %id, approved_drivers, "Moving partner activated");

        Ok(ActivationOutcome {
            moving_partner: activated,
            activated: true,
            check,
            unmet: Vec::new(),
        })
    }

    /// Link a driver to the partner, reactivating an old link if present.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the partner or driver doesn't exist.
    pub async fn link_driver(
        &self,
        id: MovingPartnerId,
        driver_id: DriverId,
        admin_id: AdminId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (SELECT 1 FROM moving_partners WHERE id = $1)
               AND EXISTS (SELECT 1 FROM drivers WHERE id = $2)
            ",
        )
        .bind(id)
        .bind(driver_id)
        .fetch_one(&mut *tx)
        .await?;

        if !exists {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO moving_partner_drivers (moving_partner_id, driver_id, is_active)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (moving_partner_id, driver_id) DO UPDATE SET is_active = TRUE
            ",
        )
        .bind(id)
        .bind(driver_id)
        .execute(&mut *tx)
        .await?;

        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(
                admin_id,
                AdminAction::LinkDriver,
                AdminLogTarget::MovingPartner,
                id.as_i32(),
            )
            .with_details(serde_json::json!({ "driverId": driver_id })),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deactivate a driver link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no active link.
    pub async fn unlink_driver(
        &self,
        id: MovingPartnerId,
        driver_id: DriverId,
        admin_id: AdminId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE moving_partner_drivers
            SET is_active = FALSE
            WHERE moving_partner_id = $1 AND driver_id = $2 AND is_active = TRUE
            ",
        )
        .bind(id)
        .bind(driver_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(
                admin_id,
                AdminAction::UnlinkDriver,
                AdminLogTarget::MovingPartner,
                id.as_i32(),
            )
            .with_details(serde_json::json!({ "driverId": driver_id })),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

//! Vehicle repository.

use sqlx::PgPool;

use stowline_core::{AdminId, VehicleId};

use super::{RepositoryError, admin_logs};
use crate::models::admin_log::{AdminAction, AdminLogTarget, NewAdminLog};
use crate::models::Vehicle;

const COLUMNS: &str =
    "id, driver_id, moving_partner_id, make, model, year, license_plate, is_approved, created_at";

/// Repository for vehicles.
pub struct VehicleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VehicleRepository<'a> {
    /// Create a new vehicle repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List vehicles, optionally filtered by approval.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, approved: Option<bool>) -> Result<Vec<Vehicle>, RepositoryError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(&format!(
            r"
            SELECT {COLUMNS}
            FROM vehicles
            WHERE ($1::BOOLEAN IS NULL OR is_approved = $1)
            ORDER BY created_at DESC
            "
        ))
        .bind(approved)
        .fetch_all(self.pool)
        .await?;
        Ok(vehicles)
    }

    /// Approve or unapprove a vehicle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the vehicle doesn't exist.
    pub async fn set_approval(
        &self,
        id: VehicleId,
        approved: bool,
        admin_id: AdminId,
    ) -> Result<Vehicle, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            "UPDATE vehicles SET is_approved = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(approved)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let action = if approved {
            AdminAction::ApproveVehicle
        } else {
            AdminAction::UnapproveVehicle
        };
        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(admin_id, action, AdminLogTarget::Vehicle, id.as_i32())
                .with_details(serde_json::json!({ "approved": approved })),
        )
        .await?;

        tx.commit().await?;
        Ok(vehicle)
    }
}

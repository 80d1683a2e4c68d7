//! Storage unit repository: inventory, occupancy and cleaning.

use sqlx::PgPool;

use stowline_core::{
    AdminId, StorageUnitId, StorageUnitStatus, StorageUnitUsageId, UserId,
};

use super::{RepositoryError, admin_logs};
use crate::models::admin_log::{AdminAction, AdminLogTarget, NewAdminLog};
use crate::models::storage_unit::{EndUsageInput, StartUsageInput};
use crate::models::{CleaningInput, StorageUnit, StorageUnitCleaning, StorageUnitUsage};

const UNIT_COLUMNS: &str = "id, unit_number, status, last_cleaned_at, created_at, updated_at";

const USAGE_COLUMNS: &str = "id, storage_unit_id, user_id, start_appointment_id, \
                             end_appointment_id, usage_start_date, usage_end_date";

/// Raw counts behind the availability figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct CapacityCounts {
    pub empty_units: i64,
    pub reserved_units: i64,
}

/// Repository for storage units.
pub struct StorageUnitRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StorageUnitRepository<'a> {
    /// Create a new storage unit repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List units, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<StorageUnitStatus>,
    ) -> Result<Vec<StorageUnit>, RepositoryError> {
        let units = sqlx::query_as::<_, StorageUnit>(&format!(
            r"
            SELECT {UNIT_COLUMNS}
            FROM storage_units
            WHERE ($1::storage_unit_status IS NULL OR status = $1)
            ORDER BY unit_number
            "
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(units)
    }

    /// Get a unit by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StorageUnitId) -> Result<Option<StorageUnit>, RepositoryError> {
        let unit = sqlx::query_as::<_, StorageUnit>(&format!(
            "SELECT {UNIT_COLUMNS} FROM storage_units WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(unit)
    }

    /// Add a unit. New units start `Empty`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the unit number is taken.
    pub async fn create(
        &self,
        unit_number: &str,
        admin_id: AdminId,
    ) -> Result<StorageUnit, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let unit = sqlx::query_as::<_, StorageUnit>(&format!(
            "INSERT INTO storage_units (unit_number) VALUES ($1) RETURNING {UNIT_COLUMNS}"
        ))
        .bind(unit_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            RepositoryError::conflict_on_unique(e, "A storage unit with this number already exists")
        })?;

        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(
                admin_id,
                AdminAction::CreateStorageUnit,
                AdminLogTarget::StorageUnit,
                unit.id.as_i32(),
            )
            .with_details(serde_json::json!({ "unitNumber": unit_number })),
        )
        .await?;

        tx.commit().await?;
        Ok(unit)
    }

    /// Empty units and units promised to upcoming pickups.
    ///
    /// Reserved units are those on future Initial Pickup and Additional
    /// Storage appointments that are still Scheduled, Pending or Confirmed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn capacity_counts(&self) -> Result<CapacityCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, CapacityCounts>(
            r"
            SELECT
                (SELECT COUNT(*) FROM storage_units WHERE status = 'Empty') AS empty_units,
                (SELECT COALESCE(SUM(number_of_units), 0)::BIGINT
                 FROM appointments
                 WHERE appointment_type IN ('Initial Pickup', 'Additional Storage')
                   AND status IN ('Scheduled', 'Pending', 'Confirmed')
                   AND date > NOW()) AS reserved_units
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }

    /// Record a cleaning: the unit becomes `Empty` with a fresh
    /// `last_cleaned_at`, and one cleaning row and one audit row are written.
    /// All or nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the unit doesn't exist.
    pub async fn record_cleaning(
        &self,
        id: StorageUnitId,
        input: &CleaningInput,
        admin_id: AdminId,
    ) -> Result<(StorageUnit, StorageUnitCleaning), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let unit = sqlx::query_as::<_, StorageUnit>(&format!(
            r"
            UPDATE storage_units
            SET status = 'Empty', last_cleaned_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {UNIT_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let cleaning = sqlx::query_as::<_, StorageUnitCleaning>(
            r"
            INSERT INTO storage_unit_cleanings (storage_unit_id, admin_id, photos, notes, cleaned_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, storage_unit_id, admin_id, photos, notes, cleaned_at
            ",
        )
        .bind(id)
        .bind(admin_id)
        .bind(&input.photos)
        .bind(input.trimmed_notes())
        .bind(unit.last_cleaned_at)
        .fetch_one(&mut *tx)
        .await?;

        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(
                admin_id,
                AdminAction::CleanStorageUnit,
                AdminLogTarget::StorageUnit,
                id.as_i32(),
            )
            .with_details(serde_json::json!({
                "cleaningId": cleaning.id,
                "photoCount": input.photos.len(),
            })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(storage_unit_id = %id, admin_id = %admin_id, "Storage unit cleaned");
        Ok((unit, cleaning))
    }

    /// Start an occupancy: the unit must be `Empty` with no open usage.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown unit and
    /// `RepositoryError::Conflict` if the unit is not available.
    pub async fn start_usage(
        &self,
        id: StorageUnitId,
        input: StartUsageInput,
        admin_id: AdminId,
    ) -> Result<StorageUnitUsage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let status: StorageUnitStatus =
            sqlx::query_scalar("SELECT status FROM storage_units WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if status != StorageUnitStatus::Empty {
            return Err(RepositoryError::Conflict(format!(
                "Storage unit is {status}, not Empty"
            )));
        }

        let open: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM storage_unit_usages
                WHERE storage_unit_id = $1 AND usage_end_date IS NULL
            )
            ",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if open {
            return Err(RepositoryError::Conflict(
                "Storage unit already has an active usage".to_string(),
            ));
        }

        let usage = sqlx::query_as::<_, StorageUnitUsage>(&format!(
            r"
            INSERT INTO storage_unit_usages (storage_unit_id, user_id, start_appointment_id)
            VALUES ($1, $2, $3)
            RETURNING {USAGE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.user_id)
        .bind(input.start_appointment_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            RepositoryError::conflict_on_unique(e, "Storage unit already has an active usage")
        })?;

        sqlx::query(
            "UPDATE storage_units SET status = 'Occupied', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(
                admin_id,
                AdminAction::StartStorageUnitUsage,
                AdminLogTarget::StorageUnit,
                id.as_i32(),
            )
            .with_details(serde_json::json!({
                "usageId": usage.id,
                "userId": input.user_id,
            })),
        )
        .await?;

        tx.commit().await?;
        Ok(usage)
    }

    /// End an occupancy; the unit then needs cleaning.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown usage and
    /// `RepositoryError::Conflict` if it already ended.
    pub async fn end_usage(
        &self,
        usage_id: StorageUnitUsageId,
        input: EndUsageInput,
        admin_id: AdminId,
    ) -> Result<StorageUnitUsage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, StorageUnitUsage>(&format!(
            "SELECT {USAGE_COLUMNS} FROM storage_unit_usages WHERE id = $1 FOR UPDATE"
        ))
        .bind(usage_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if !current.is_active() {
            return Err(RepositoryError::Conflict(
                "Storage unit usage has already ended".to_string(),
            ));
        }

        let usage = sqlx::query_as::<_, StorageUnitUsage>(&format!(
            r"
            UPDATE storage_unit_usages
            SET usage_end_date = NOW(),
                end_appointment_id = COALESCE($2, end_appointment_id)
            WHERE id = $1
            RETURNING {USAGE_COLUMNS}
            "
        ))
        .bind(usage_id)
        .bind(input.end_appointment_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE storage_units SET status = 'Pending Cleaning', updated_at = NOW() WHERE id = $1",
        )
        .bind(usage.storage_unit_id)
        .execute(&mut *tx)
        .await?;

        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(
                admin_id,
                AdminAction::EndStorageUnitUsage,
                AdminLogTarget::StorageUnitUsage,
                usage_id.as_i32(),
            )
            .with_details(serde_json::json!({ "storageUnitId": usage.storage_unit_id })),
        )
        .await?;

        tx.commit().await?;
        Ok(usage)
    }

    /// A customer's current occupancies with their units.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_units_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<StorageUnit>, RepositoryError> {
        let units = sqlx::query_as::<_, StorageUnit>(
            r"
            SELECT su.id, su.unit_number, su.status, su.last_cleaned_at,
                   su.created_at, su.updated_at
            FROM storage_unit_usages u
            JOIN storage_units su ON su.id = u.storage_unit_id
            WHERE u.user_id = $1 AND u.usage_end_date IS NULL
            ORDER BY su.unit_number
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(units)
    }
}

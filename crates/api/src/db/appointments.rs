//! Appointment repository: booking, reads and lifecycle writes.

use sqlx::PgPool;

use stowline_core::{
    AdminId, AppointmentId, AppointmentStatus, DriverId, MovingPartnerId, UserId,
};

use super::{RepositoryError, admin_logs};
use crate::models::admin_log::{AdminAction, AdminLogTarget, NewAdminLog};
use crate::models::appointment::{
    PartnerContactInput, StatusActor, check_transition,
};
use crate::models::{Appointment, AppointmentFilter, BookAppointmentInput, StorageUnit};

const COLUMNS: &str = "id, user_id, moving_partner_id, appointment_type, status, date, address, \
                       zipcode, number_of_units, plan_type, description, quoted_price, \
                       monthly_storage_rate, monthly_insurance_rate, partner_contacted, \
                       partner_reached, partner_contacted_at, created_at, updated_at";

/// Repository for appointments.
pub struct AppointmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AppointmentRepository<'a> {
    /// Create a new appointment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get an appointment by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>, RepositoryError> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {COLUMNS} FROM appointments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(appointment)
    }

    /// Get an appointment only if `user_id` booked it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: AppointmentId,
        user_id: UserId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {COLUMNS} FROM appointments WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(appointment)
    }

    /// A customer's appointments, soonest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Appointment>, RepositoryError> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {COLUMNS} FROM appointments WHERE user_id = $1 ORDER BY date"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(appointments)
    }

    /// All appointments matching `filter`, soonest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, RepositoryError> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            r"
            SELECT {COLUMNS}
            FROM appointments
            WHERE ($1::appointment_status IS NULL OR status = $1)
              AND ($2::TIMESTAMPTZ IS NULL OR date >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR date <= $3)
            ORDER BY date
            "
        ))
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(self.pool)
        .await?;
        Ok(appointments)
    }

    /// Appointments assigned to any partner the driver is actively linked to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_driver(&self, driver_id: DriverId) -> Result<Vec<Appointment>, RepositoryError> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            r"
            SELECT {COLUMNS}
            FROM appointments
            WHERE moving_partner_id IN (
                SELECT moving_partner_id
                FROM moving_partner_drivers
                WHERE driver_id = $1 AND is_active = TRUE
            )
            ORDER BY date
            "
        ))
        .bind(driver_id)
        .fetch_all(self.pool)
        .await?;
        Ok(appointments)
    }

    /// Get an appointment only if it is assigned to one of the driver's
    /// active partners.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_driver(
        &self,
        id: AppointmentId,
        driver_id: DriverId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r"
            SELECT {COLUMNS}
            FROM appointments
            WHERE id = $1
              AND moving_partner_id IN (
                SELECT moving_partner_id
                FROM moving_partner_drivers
                WHERE driver_id = $2 AND is_active = TRUE
              )
            "
        ))
        .bind(id)
        .bind(driver_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(appointment)
    }

    /// Units whose usage started with this appointment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn storage_units(&self, id: AppointmentId) -> Result<Vec<StorageUnit>, RepositoryError> {
        let units = sqlx::query_as::<_, StorageUnit>(
            r"
            SELECT su.id, su.unit_number, su.status, su.last_cleaned_at,
                   su.created_at, su.updated_at
            FROM storage_unit_usages u
            JOIN storage_units su ON su.id = u.storage_unit_id
            WHERE u.start_appointment_id = $1
            ORDER BY su.unit_number
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(units)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Book an appointment in `Scheduled` status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &BookAppointmentInput,
    ) -> Result<Appointment, RepositoryError> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r"
            INSERT INTO appointments
                (user_id, appointment_type, status, date, address, zipcode, number_of_units,
                 plan_type, description, quoted_price, monthly_storage_rate, monthly_insurance_rate)
            VALUES ($1, $2, 'Scheduled', $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(input.appointment_type)
        .bind(input.date)
        .bind(input.address.trim())
        .bind(&input.zipcode)
        .bind(input.number_of_units)
        .bind(input.plan_type.as_deref())
        .bind(input.description.as_deref())
        .bind(input.quoted_price)
        .bind(input.monthly_storage_rate)
        .bind(input.monthly_insurance_rate)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(
            appointment_id = %appointment.id,
            user_id = %user_id,
            appointment_type = %appointment.appointment_type,
            "Appointment booked"
        );
        Ok(appointment)
    }

    /// Record partner contact flags and audit them, atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the appointment doesn't exist;
    /// nothing is written in that case.
    pub async fn update_partner_contact(
        &self,
        id: AppointmentId,
        contact: PartnerContactInput,
        admin_id: AdminId,
    ) -> Result<Appointment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r"
            UPDATE appointments
            SET partner_contacted = $2,
                partner_reached = $3,
                partner_contacted_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(contact.contacted)
        .bind(contact.reached)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(
                admin_id,
                AdminAction::UpdatePartnerContact,
                AdminLogTarget::Appointment,
                id.as_i32(),
            )
            .with_details(serde_json::json!({
                "contacted": contact.contacted,
                "reached": contact.reached,
            })),
        )
        .await?;

        tx.commit().await?;
        Ok(appointment)
    }

    /// Move an appointment to `to` on behalf of `actor`.
    ///
    /// The current status is locked and checked inside the transaction.
    /// Admin changes are audited in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown appointment and
    /// `RepositoryError::Conflict` when the transition is not allowed.
    pub async fn update_status(
        &self,
        id: AppointmentId,
        to: AppointmentStatus,
        actor: StatusActor,
        admin_id: Option<AdminId>,
    ) -> Result<Appointment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let from: AppointmentStatus =
            sqlx::query_scalar("SELECT status FROM appointments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        check_transition(actor, from, to).map_err(|e| RepositoryError::Conflict(e.to_string()))?;

        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r"
            UPDATE appointments
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(admin_id) = admin_id {
            admin_logs::insert(
                &mut *tx,
                &NewAdminLog::new(
                    admin_id,
                    AdminAction::UpdateAppointmentStatus,
                    AdminLogTarget::Appointment,
                    id.as_i32(),
                )
                .with_details(serde_json::json!({ "from": from, "to": to })),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(appointment_id = %id, %from, %to, ?actor, "Appointment status changed");
        Ok(appointment)
    }

    /// Assign a moving partner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the appointment or partner
    /// doesn't exist, `RepositoryError::Conflict` if the appointment is
    /// already completed or canceled.
    pub async fn assign_partner(
        &self,
        id: AppointmentId,
        partner_id: MovingPartnerId,
        admin_id: AdminId,
    ) -> Result<Appointment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let status: AppointmentStatus =
            sqlx::query_scalar("SELECT status FROM appointments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if status.is_terminal() {
            return Err(RepositoryError::Conflict(format!(
                "Cannot assign a moving partner to a {status} appointment"
            )));
        }

        let partner_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM moving_partners WHERE id = $1)")
                .bind(partner_id)
                .fetch_one(&mut *tx)
                .await?;
        if !partner_exists {
            return Err(RepositoryError::NotFound);
        }

        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r"
            UPDATE appointments
            SET moving_partner_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(partner_id)
        .fetch_one(&mut *tx)
        .await?;

        admin_logs::insert(
            &mut *tx,
            &NewAdminLog::new(
                admin_id,
                AdminAction::AssignMovingPartner,
                AdminLogTarget::Appointment,
                id.as_i32(),
            )
            .with_details(serde_json::json!({ "movingPartnerId": partner_id })),
        )
        .await?;

        tx.commit().await?;
        Ok(appointment)
    }
}

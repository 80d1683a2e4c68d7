//! Appointment models: booked jobs, their inputs and filters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stowline_core::{AppointmentId, AppointmentStatus, AppointmentType, MovingPartnerId, UserId};

use super::storage_unit::StorageUnit;
use super::validation::FieldErrors;
use crate::error::AppError;

/// A scheduled customer job.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Unique appointment ID.
    pub id: AppointmentId,
    /// Customer who booked it.
    pub user_id: UserId,
    /// Moving partner assigned to do the work.
    pub moving_partner_id: Option<MovingPartnerId>,
    /// What kind of job this is.
    pub appointment_type: AppointmentType,
    /// Lifecycle state.
    pub status: AppointmentStatus,
    /// Scheduled start.
    pub date: DateTime<Utc>,
    /// Street address of the job.
    pub address: String,
    /// Five-digit ZIP code.
    pub zipcode: String,
    /// Storage units involved.
    pub number_of_units: i32,
    /// Storage plan chosen at booking.
    pub plan_type: Option<String>,
    /// Free-form notes from the customer.
    pub description: Option<String>,
    /// Price quoted for the job.
    pub quoted_price: Decimal,
    /// Monthly storage rate quoted at booking.
    pub monthly_storage_rate: Option<Decimal>,
    /// Monthly insurance rate quoted at booking.
    pub monthly_insurance_rate: Option<Decimal>,
    /// Whether an admin tried to contact the moving partner.
    pub partner_contacted: bool,
    /// Whether the moving partner was reached.
    pub partner_reached: bool,
    /// When the contact flags were last recorded.
    pub partner_contacted_at: Option<DateTime<Utc>>,
    /// When the appointment was booked.
    pub created_at: DateTime<Utc>,
    /// When the appointment was last updated.
    pub updated_at: DateTime<Utc>,
}

/// An appointment with the storage units whose usage it started.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetail {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub storage_units: Vec<StorageUnit>,
}

/// Input for booking an appointment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentInput {
    pub appointment_type: AppointmentType,
    pub date: DateTime<Utc>,
    pub address: String,
    pub zipcode: String,
    pub number_of_units: i32,
    #[serde(default)]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub quoted_price: Decimal,
    #[serde(default)]
    pub monthly_storage_rate: Option<Decimal>,
    #[serde(default)]
    pub monthly_insurance_rate: Option<Decimal>,
}

impl BookAppointmentInput {
    /// Check the booking against `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] listing every invalid field.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();

        errors.check(self.date <= now, "date", "must be in the future");
        errors.check(self.address.trim().is_empty(), "address", "is required");
        errors.check(
            !is_zipcode(&self.zipcode),
            "zipcode",
            "must be 5 digits",
        );
        errors.check(self.number_of_units < 1, "numberOfUnits", "must be at least 1");
        errors.check(
            self.quoted_price.is_sign_negative(),
            "quotedPrice",
            "must not be negative",
        );
        errors.check(
            self.monthly_storage_rate.is_some_and(|r| r.is_sign_negative()),
            "monthlyStorageRate",
            "must not be negative",
        );
        errors.check(
            self.monthly_insurance_rate.is_some_and(|r| r.is_sign_negative()),
            "monthlyInsuranceRate",
            "must not be negative",
        );

        errors.into_result("Invalid appointment")
    }
}

fn is_zipcode(value: &str) -> bool {
    value.len() == 5 && value.chars().all(|c| c.is_ascii_digit())
}

/// Partner contact flags recorded by an admin.
///
/// Both flags are required booleans; anything else is rejected at
/// deserialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartnerContactInput {
    pub contacted: bool,
    pub reached: bool,
}

/// Requested status change.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatusUpdateInput {
    pub status: AppointmentStatus,
}

/// Moving partner assignment.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPartnerInput {
    pub moving_partner_id: MovingPartnerId,
}

/// Admin list filters. All optional; bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Why a status change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Appointment is already {0}")]
    Unchanged(AppointmentStatus),
    #[error("Cannot change appointment status from {from} to {to}")]
    NotAllowed {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusActor {
    Admin,
    Driver,
    Customer,
}

/// Check a status change for `actor`.
///
/// Admins may make any permitted transition, drivers only start and finish
/// jobs, and customers only cancel.
///
/// # Errors
///
/// Returns [`TransitionError`] when the change is a no-op or not permitted.
pub fn check_transition(
    actor: StatusActor,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), TransitionError> {
    if from == to {
        return Err(TransitionError::Unchanged(from));
    }
    let allowed = match actor {
        StatusActor::Admin => from.can_transition_to(to),
        StatusActor::Driver => from.driver_may_transition_to(to),
        StatusActor::Customer => to == AppointmentStatus::Canceled && from.can_transition_to(to),
    };
    if allowed {
        Ok(())
    } else {
        Err(TransitionError::NotAllowed { from, to })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn booking(now: DateTime<Utc>) -> BookAppointmentInput {
        BookAppointmentInput {
            appointment_type: AppointmentType::InitialPickup,
            date: now + Duration::days(3),
            address: "500 Howard St".to_string(),
            zipcode: "94105".to_string(),
            number_of_units: 2,
            plan_type: Some("Do It For Me".to_string()),
            description: None,
            quoted_price: Decimal::new(18900, 2),
            monthly_storage_rate: Some(Decimal::new(7500, 2)),
            monthly_insurance_rate: None,
        }
    }

    #[test]
    fn test_valid_booking() {
        let now = Utc::now();
        assert!(booking(now).validate(now).is_ok());
    }

    #[test]
    fn test_booking_reports_every_bad_field() {
        let now = Utc::now();
        let mut input = booking(now);
        input.date = now - Duration::hours(1);
        input.address = "  ".to_string();
        input.zipcode = "9410".to_string();
        input.number_of_units = 0;
        input.quoted_price = Decimal::new(-1, 0);

        let Err(AppError::Validation { details, .. }) = input.validate(now) else {
            panic!("expected validation error");
        };
        for field in ["date", "address", "zipcode", "numberOfUnits", "quotedPrice"] {
            assert!(details.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_partner_contact_requires_booleans() {
        let ok: PartnerContactInput =
            serde_json::from_str(r#"{"contacted": true, "reached": false}"#).unwrap();
        assert!(ok.contacted);
        assert!(!ok.reached);

        assert!(serde_json::from_str::<PartnerContactInput>(r#"{"contacted": true}"#).is_err());
        assert!(
            serde_json::from_str::<PartnerContactInput>(r#"{"contacted": "yes", "reached": true}"#)
                .is_err()
        );
    }

    #[test]
    fn test_same_status_is_rejected() {
        assert_eq!(
            check_transition(
                StatusActor::Admin,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Confirmed
            ),
            Err(TransitionError::Unchanged(AppointmentStatus::Confirmed))
        );
    }

    #[test]
    fn test_actor_permissions() {
        use AppointmentStatus::{Canceled, Completed, Confirmed, InProgress, Scheduled};

        assert!(check_transition(StatusActor::Admin, Scheduled, Confirmed).is_ok());
        assert!(check_transition(StatusActor::Driver, Scheduled, Confirmed).is_err());
        assert!(check_transition(StatusActor::Driver, Confirmed, InProgress).is_ok());
        assert!(check_transition(StatusActor::Driver, InProgress, Completed).is_ok());
        assert!(check_transition(StatusActor::Customer, Scheduled, Canceled).is_ok());
        assert!(check_transition(StatusActor::Customer, Scheduled, Confirmed).is_err());
        assert!(check_transition(StatusActor::Customer, Completed, Canceled).is_err());
    }
}

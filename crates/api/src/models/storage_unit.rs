//! Storage unit models: units, occupancy, cleanings and availability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{
    AdminId, AppointmentId, StorageUnitCleaningId, StorageUnitId, StorageUnitStatus,
    StorageUnitUsageId, UserId,
};

use super::validation::FieldErrors;
use crate::error::AppError;

/// A physical storage unit in the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StorageUnit {
    /// Unique unit ID.
    pub id: StorageUnitId,
    /// Label painted on the unit.
    pub unit_number: String,
    /// Physical state.
    pub status: StorageUnitStatus,
    /// When the unit was last cleaned.
    pub last_cleaned_at: Option<DateTime<Utc>>,
    /// When the unit was added.
    pub created_at: DateTime<Utc>,
    /// When the unit was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A time-bounded occupancy of a unit by a customer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StorageUnitUsage {
    /// Unique usage ID.
    pub id: StorageUnitUsageId,
    /// Occupied unit.
    pub storage_unit_id: StorageUnitId,
    /// Customer whose items are in the unit.
    pub user_id: UserId,
    /// Appointment that filled the unit.
    pub start_appointment_id: Option<AppointmentId>,
    /// Appointment that emptied the unit.
    pub end_appointment_id: Option<AppointmentId>,
    /// When the occupancy began.
    pub usage_start_date: DateTime<Utc>,
    /// When the occupancy ended; `None` while the unit is occupied.
    pub usage_end_date: Option<DateTime<Utc>>,
}

impl StorageUnitUsage {
    /// Whether the unit is still occupied under this usage.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.usage_end_date.is_none()
    }
}

/// A recorded cleaning with photo evidence.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StorageUnitCleaning {
    pub id: StorageUnitCleaningId,
    pub storage_unit_id: StorageUnitId,
    /// Admin who recorded the cleaning.
    pub admin_id: AdminId,
    /// Photo URLs on the image host.
    pub photos: Vec<String>,
    pub notes: Option<String>,
    pub cleaned_at: DateTime<Utc>,
}

/// Input for recording a cleaning.
#[derive(Debug, Clone, Deserialize)]
pub struct CleaningInput {
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CleaningInput {
    /// Require at least one photo, each an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] describing the first problem.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.photos.is_empty() {
            return Err(AppError::BadRequest(
                "At least one cleaning photo is required".to_string(),
            ));
        }
        if let Some(bad) = self.photos.iter().find(|photo| !is_web_url(photo)) {
            return Err(AppError::BadRequest(format!("Invalid photo URL: {bad}")));
        }
        Ok(())
    }

    /// Notes with surrounding whitespace removed; blank notes become `None`.
    #[must_use]
    pub fn trimmed_notes(&self) -> Option<&str> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
    }
}

fn is_web_url(value: &str) -> bool {
    url::Url::parse(value)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

/// Input for adding a unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStorageUnitInput {
    pub unit_number: String,
}

/// Input for starting a usage.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartUsageInput {
    pub user_id: UserId,
    #[serde(default)]
    pub start_appointment_id: Option<AppointmentId>,
}

/// Input for ending a usage.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndUsageInput {
    #[serde(default)]
    pub end_appointment_id: Option<AppointmentId>,
}

/// Unit list filter.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StorageUnitFilter {
    pub status: Option<StorageUnitStatus>,
}

/// Bookable capacity right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Units currently empty.
    pub empty_units: i64,
    /// Units promised to upcoming pickups.
    pub reserved_units: i64,
    /// Units that can still be booked.
    pub available_units: i64,
    /// Whether `available_units` is under the threshold.
    pub low_stock: bool,
    pub low_stock_threshold: i64,
}

impl Availability {
    /// Compute availability from the raw counts.
    #[must_use]
    pub fn compute(empty_units: i64, reserved_units: i64, low_stock_threshold: i64) -> Self {
        let available_units = available_units(empty_units, reserved_units);
        Self {
            empty_units,
            reserved_units,
            available_units,
            low_stock: available_units < low_stock_threshold,
            low_stock_threshold,
        }
    }
}

/// Empty units not already promised to a booking. Never negative.
#[must_use]
pub fn available_units(empty_units: i64, reserved_units: i64) -> i64 {
    empty_units.saturating_sub(reserved_units).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaning(photos: &[&str]) -> CleaningInput {
        CleaningInput {
            photos: photos.iter().map(ToString::to_string).collect(),
            notes: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_cleaning_needs_a_photo() {
        assert!(matches!(cleaning(&[]).validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_cleaning_rejects_non_web_urls() {
        assert!(cleaning(&["not a url"]).validate().is_err());
        assert!(cleaning(&["ftp://files.example.com/a.jpg"]).validate().is_err());
        assert!(
            cleaning(&["https://res.cloudinary.com/a.jpg", "/relative.jpg"])
                .validate()
                .is_err()
        );
        assert!(cleaning(&["https://res.cloudinary.com/a.jpg"]).validate().is_ok());
    }

    #[test]
    fn test_blank_notes_are_dropped() {
        assert_eq!(cleaning(&[]).trimmed_notes(), None);
    }

    #[test]
    fn test_available_units_never_negative() {
        assert_eq!(available_units(120, 30), 90);
        assert_eq!(available_units(10, 30), 0);
        assert_eq!(available_units(0, 0), 0);
    }

    #[test]
    fn test_low_stock_threshold() {
        let availability = Availability::compute(80, 31, 50);
        assert_eq!(availability.available_units, 49);
        assert!(availability.low_stock);

        let availability = Availability::compute(80, 30, 50);
        assert_eq!(availability.available_units, 50);
        assert!(!availability.low_stock);
    }
}

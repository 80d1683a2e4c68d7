//! Status enums for appointments, storage units, partners and accounts.
//!
//! Display strings match the values stored in the Postgres enum types, so the
//! JSON API, the database and log lines all read the same ("In Progress",
//! "Pending Cleaning").

use serde::{Deserialize, Serialize};

/// Error returned when parsing one of the status enums from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Lifecycle state of an appointment.
///
/// ```text
/// Scheduled ──► Pending ──► Confirmed ──► In Progress ──► Completed
///     │  ▲         │            │  │           │
///     │  └─────────┘            │  └──► Pending│
///     └──► Confirmed / In Progress             │
///  (any non-terminal) ─────────────────────────┴──► Canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "appointment_status"))]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Pending,
    Confirmed,
    #[serde(rename = "In Progress")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "In Progress"))]
    InProgress,
    Completed,
    Canceled,
}

impl AppointmentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Scheduled,
        Self::Pending,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Canceled,
    ];

    /// Completed and canceled jobs never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Whether an appointment in this status still holds capacity
    /// (storage units, crew time) for its date.
    #[must_use]
    pub const fn is_upcoming(self) -> bool {
        matches!(self, Self::Scheduled | Self::Pending | Self::Confirmed)
    }

    /// Whether moving from `self` to `next` is a permitted transition.
    ///
    /// Re-applying the current status is not a transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Scheduled => matches!(
                next,
                Self::Pending | Self::Confirmed | Self::InProgress | Self::Canceled
            ),
            Self::Pending => matches!(next, Self::Scheduled | Self::Confirmed | Self::Canceled),
            Self::Confirmed => matches!(next, Self::Pending | Self::InProgress | Self::Canceled),
            Self::InProgress => matches!(next, Self::Completed | Self::Canceled),
            Self::Completed | Self::Canceled => false,
        }
    }

    /// The transitions a driver in the field may make.
    #[must_use]
    pub const fn driver_may_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Confirmed, Self::InProgress) | (Self::InProgress, Self::Completed)
        )
    }

    /// The display / storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError::new("appointment status", s))
    }
}

/// The kind of job an appointment represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "appointment_type"))]
pub enum AppointmentType {
    /// First pickup: empty units are delivered and loaded.
    #[serde(rename = "Initial Pickup")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Initial Pickup"))]
    InitialPickup,
    /// An existing customer adds more units.
    #[serde(rename = "Additional Storage")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Additional Storage"))]
    AdditionalStorage,
    /// Units are delivered so the customer can access their items.
    #[serde(rename = "Storage Unit Access")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Storage Unit Access"))]
    StorageUnitAccess,
    /// Final delivery; the storage term ends afterwards.
    #[serde(rename = "End Storage Term")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "End Storage Term"))]
    EndStorageTerm,
}

impl AppointmentType {
    /// Whether this job takes new empty units out of the warehouse.
    #[must_use]
    pub const fn reserves_units(self) -> bool {
        matches!(self, Self::InitialPickup | Self::AdditionalStorage)
    }

    /// The display / storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InitialPickup => "Initial Pickup",
            Self::AdditionalStorage => "Additional Storage",
            Self::StorageUnitAccess => "Storage Unit Access",
            Self::EndStorageTerm => "End Storage Term",
        }
    }
}

impl std::fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical state of a storage unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "storage_unit_status"))]
pub enum StorageUnitStatus {
    #[default]
    Empty,
    Occupied,
    #[serde(rename = "Pending Cleaning")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Pending Cleaning"))]
    PendingCleaning,
}

impl StorageUnitStatus {
    /// The display / storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Occupied => "Occupied",
            Self::PendingCleaning => "Pending Cleaning",
        }
    }
}

impl std::fmt::Display for StorageUnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StorageUnitStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Empty, Self::Occupied, Self::PendingCleaning]
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError::new("storage unit status", s))
    }
}

/// Onboarding state of a moving partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "moving_partner_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovingPartnerStatus {
    #[default]
    Pending,
    Active,
    Inactive,
}

/// The kind of account behind a session, and the audience of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Customer,
    Driver,
    MovingPartner,
    Admin,
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Customer => "customer",
            Self::Driver => "driver",
            Self::MovingPartner => "moving_partner",
            Self::Admin => "admin",
        })
    }
}

/// Admin permission level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Everything, including managing other admins.
    SuperAdmin,
    /// Day-to-day operations: jobs, units, onboarding.
    Admin,
    /// Read-only.
    Viewer,
}

impl AdminRole {
    /// Whether this role may perform writes.
    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
            Self::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "viewer" => Ok(Self::Viewer),
            _ => Err(ParseStatusError::new("admin role", s)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_have_no_transitions() {
        for from in [AppointmentStatus::Completed, AppointmentStatus::Canceled] {
            for to in AppointmentStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_same_status_is_not_a_transition() {
        for status in AppointmentStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_every_open_status_can_be_canceled() {
        for status in AppointmentStatus::ALL {
            if !status.is_terminal() {
                assert!(status.can_transition_to(AppointmentStatus::Canceled));
            }
        }
    }

    #[test]
    fn test_completion_requires_in_progress() {
        for status in AppointmentStatus::ALL {
            let allowed = status.can_transition_to(AppointmentStatus::Completed);
            assert_eq!(allowed, status == AppointmentStatus::InProgress);
        }
    }

    #[test]
    fn test_driver_transitions_are_a_subset() {
        for from in AppointmentStatus::ALL {
            for to in AppointmentStatus::ALL {
                if from.driver_may_transition_to(to) {
                    assert!(from.can_transition_to(to));
                }
            }
        }
        assert!(!AppointmentStatus::Scheduled.driver_may_transition_to(AppointmentStatus::Canceled));
    }

    #[test]
    fn test_status_serde_uses_display_strings() {
        let json = serde_json::to_string(&AppointmentStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");

        let parsed: StorageUnitStatus = serde_json::from_str("\"Pending Cleaning\"").unwrap();
        assert_eq!(parsed, StorageUnitStatus::PendingCleaning);

        let kind: AppointmentType = serde_json::from_str("\"End Storage Term\"").unwrap();
        assert_eq!(kind, AppointmentType::EndStorageTerm);
    }

    #[test]
    fn test_status_from_str_is_case_insensitive() {
        assert_eq!(
            "in progress".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::InProgress
        );
        assert!("Done".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_upcoming_statuses() {
        let upcoming: Vec<_> = AppointmentStatus::ALL
            .into_iter()
            .filter(|s| s.is_upcoming())
            .collect();
        assert_eq!(
            upcoming,
            vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Pending,
                AppointmentStatus::Confirmed
            ]
        );
    }

    #[test]
    fn test_reserving_appointment_types() {
        assert!(AppointmentType::InitialPickup.reserves_units());
        assert!(AppointmentType::AdditionalStorage.reserves_units());
        assert!(!AppointmentType::StorageUnitAccess.reserves_units());
        assert!(!AppointmentType::EndStorageTerm.reserves_units());
    }

    #[test]
    fn test_admin_role_roundtrip_and_permissions() {
        for role in [AdminRole::SuperAdmin, AdminRole::Admin, AdminRole::Viewer] {
            assert_eq!(role.to_string().parse::<AdminRole>().unwrap(), role);
        }
        assert!(!AdminRole::Viewer.can_write());
    }
}

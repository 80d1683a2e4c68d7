//! Admin audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{AdminId, AdminLogId};

/// Audited admin actions. Stored as their `SCREAMING_SNAKE_CASE` name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminAction {
    UpdatePartnerContact,
    UpdateAppointmentStatus,
    AssignMovingPartner,
    CleanStorageUnit,
    CreateStorageUnit,
    StartStorageUnitUsage,
    EndStorageUnitUsage,
    ApproveMovingPartner,
    UnapproveMovingPartner,
    UpdateDispatchTeam,
    ActivateMovingPartner,
    LinkDriver,
    UnlinkDriver,
    ApproveDriver,
    UnapproveDriver,
    ApproveVehicle,
    UnapproveVehicle,
}

impl AdminAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpdatePartnerContact => "UPDATE_PARTNER_CONTACT",
            Self::UpdateAppointmentStatus => "UPDATE_APPOINTMENT_STATUS",
            Self::AssignMovingPartner => "ASSIGN_MOVING_PARTNER",
            Self::CleanStorageUnit => "CLEAN_STORAGE_UNIT",
            Self::CreateStorageUnit => "CREATE_STORAGE_UNIT",
            Self::StartStorageUnitUsage => "START_STORAGE_UNIT_USAGE",
            Self::EndStorageUnitUsage => "END_STORAGE_UNIT_USAGE",
            Self::ApproveMovingPartner => "APPROVE_MOVING_PARTNER",
            Self::UnapproveMovingPartner => "UNAPPROVE_MOVING_PARTNER",
            Self::UpdateDispatchTeam => "UPDATE_DISPATCH_TEAM",
            Self::ActivateMovingPartner => "ACTIVATE_MOVING_PARTNER",
            Self::LinkDriver => "LINK_DRIVER",
            Self::UnlinkDriver => "UNLINK_DRIVER",
            Self::ApproveDriver => "APPROVE_DRIVER",
            Self::UnapproveDriver => "UNAPPROVE_DRIVER",
            Self::ApproveVehicle => "APPROVE_VEHICLE",
            Self::UnapproveVehicle => "UNAPPROVE_VEHICLE",
        }
    }
}

impl std::fmt::Display for AdminAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of record an action touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLogTarget {
    Appointment,
    StorageUnit,
    StorageUnitUsage,
    MovingPartner,
    Driver,
    Vehicle,
}

impl AdminLogTarget {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Appointment => "appointment",
            Self::StorageUnit => "storage_unit",
            Self::StorageUnitUsage => "storage_unit_usage",
            Self::MovingPartner => "moving_partner",
            Self::Driver => "driver",
            Self::Vehicle => "vehicle",
        }
    }
}

/// A stored audit entry. Rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminLog {
    pub id: AdminLogId,
    pub admin_id: AdminId,
    pub action: String,
    pub target_type: String,
    pub target_id: i32,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// An audit entry to append.
#[derive(Debug, Clone)]
pub struct NewAdminLog {
    pub admin_id: AdminId,
    pub action: AdminAction,
    pub target: AdminLogTarget,
    pub target_id: i32,
    pub details: serde_json::Value,
}

impl NewAdminLog {
    /// Entry with empty details.
    #[must_use]
    pub fn new(admin_id: AdminId, action: AdminAction, target: AdminLogTarget, target_id: i32) -> Self {
        Self {
            admin_id,
            action,
            target,
            target_id,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_like_stored_name() {
        let json = serde_json::to_value(AdminAction::UpdatePartnerContact).unwrap();
        assert_eq!(json, AdminAction::UpdatePartnerContact.as_str());
        let json = serde_json::to_value(AdminAction::CleanStorageUnit).unwrap();
        assert_eq!(json, "CLEAN_STORAGE_UNIT");
    }

    #[test]
    fn test_new_entry_defaults_to_empty_details() {
        let entry = NewAdminLog::new(
            AdminId::new(1),
            AdminAction::LinkDriver,
            AdminLogTarget::MovingPartner,
            4,
        );
        assert_eq!(entry.details, serde_json::json!({}));
        let entry = entry.with_details(serde_json::json!({"driverId": 9}));
        assert_eq!(entry.details["driverId"], 9);
    }
}

//! Moving partners, their drivers and vehicles, and the activation rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{DriverId, Email, MovingPartnerId, MovingPartnerStatus, PhoneNumber, VehicleId};

/// A moving company that fulfills jobs.
///
/// Payment-platform fields are linkage only; they are never written here.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MovingPartner {
    pub id: MovingPartnerId,
    pub name: String,
    pub email: Email,
    pub phone_number: Option<PhoneNumber>,
    /// Approved by operations.
    pub is_approved: bool,
    pub status: MovingPartnerStatus,
    /// Dispatch-platform team that receives this partner's tasks.
    pub onfleet_team_id: Option<String>,
    pub stripe_connect_account_id: Option<String>,
    pub stripe_onboarding_complete: bool,
    pub stripe_payouts_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A driver who works for one or more moving partners.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone_number: Option<PhoneNumber>,
    pub verified_phone_number: bool,
    pub is_approved: bool,
    /// Dispatch-platform worker ID.
    pub onfleet_worker_id: Option<String>,
    pub stripe_connect_account_id: Option<String>,
    pub stripe_onboarding_complete: bool,
    pub stripe_payouts_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A truck owned by a driver or a partner.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    pub driver_id: Option<DriverId>,
    pub moving_partner_id: Option<MovingPartnerId>,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub license_plate: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Approve or unapprove a partner, driver or vehicle.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ApprovalInput {
    pub approved: bool,
}

/// Set (or clear, with `null`) a partner's dispatch team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchTeamInput {
    pub onfleet_team_id: Option<String>,
}

impl DispatchTeamInput {
    /// The team ID with blank values treated as cleared.
    #[must_use]
    pub fn team_id(&self) -> Option<&str> {
        self.onfleet_team_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Link a driver to a partner.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDriverInput {
    pub driver_id: DriverId,
}

/// The facts the activation rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationCheck {
    pub is_approved: bool,
    pub has_dispatch_team: bool,
    /// Linked drivers that are approved and whose link is active.
    pub approved_drivers: i64,
    pub min_approved_drivers: u32,
}

impl ActivationCheck {
    /// Gather the facts for `partner`.
    #[must_use]
    pub fn for_partner(partner: &MovingPartner, approved_drivers: i64, min_approved_drivers: u32) -> Self {
        Self {
            is_approved: partner.is_approved,
            has_dispatch_team: partner.onfleet_team_id.is_some(),
            approved_drivers,
            min_approved_drivers,
        }
    }

    /// Whether every activation requirement is met.
    #[must_use]
    pub fn passes(&self) -> bool {
        self.is_approved
            && self.has_dispatch_team
            && self.approved_drivers >= i64::from(self.min_approved_drivers)
    }

    /// Human-readable reasons the partner cannot be activated yet.
    #[must_use]
    pub fn unmet(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if !self.is_approved {
            reasons.push("partner is not approved".to_string());
        }
        if !self.has_dispatch_team {
            reasons.push("no dispatch team assigned".to_string());
        }
        if self.approved_drivers < i64::from(self.min_approved_drivers) {
            reasons.push(format!(
                "needs {} approved driver(s), has {}",
                self.min_approved_drivers, self.approved_drivers
            ));
        }
        reasons
    }
}

/// Result of evaluating a partner for activation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationOutcome {
    /// The partner after evaluation (unchanged unless just activated).
    pub moving_partner: MovingPartner,
    /// Whether this evaluation changed the status to Active.
    pub activated: bool,
    pub check: ActivationCheck,
    pub unmet: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(is_approved: bool, has_dispatch_team: bool, approved_drivers: i64) -> ActivationCheck {
        ActivationCheck {
            is_approved,
            has_dispatch_team,
            approved_drivers,
            min_approved_drivers: 1,
        }
    }

    #[test]
    fn test_all_requirements_met() {
        assert!(check(true, true, 1).passes());
        assert!(check(true, true, 4).passes());
        assert!(check(true, true, 1).unmet().is_empty());
    }

    #[test]
    fn test_each_requirement_blocks_activation() {
        assert!(!check(false, true, 1).passes());
        assert!(!check(true, false, 1).passes());
        assert!(!check(true, true, 0).passes());
        assert_eq!(check(false, false, 0).unmet().len(), 3);
    }

    #[test]
    fn test_minimum_is_configurable() {
        let mut c = check(true, true, 2);
        c.min_approved_drivers = 3;
        assert!(!c.passes());
        assert_eq!(c.unmet(), vec!["needs 3 approved driver(s), has 2".to_string()]);
    }

    #[test]
    fn test_blank_dispatch_team_clears() {
        let input = DispatchTeamInput {
            onfleet_team_id: Some("   ".to_string()),
        };
        assert_eq!(input.team_id(), None);
    }
}

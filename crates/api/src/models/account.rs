//! Account models and the session-stored identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{AccountKind, AdminId, AdminRole, DriverId, Email, MovingPartnerId, PhoneNumber, UserId};

/// A customer account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Login and notification email.
    pub email: Email,
    /// Ten-digit phone number, if one has been provided.
    pub phone_number: Option<PhoneNumber>,
    /// Whether the phone number has been confirmed with a code.
    pub verified_phone_number: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// An operations staff account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    /// Unique admin ID.
    pub id: AdminId,
    /// Login email.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Permission level.
    pub role: AdminRole,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Session-stored identity.
///
/// Minimal data stored in the session to identify whoever is signed in.
/// Admin sessions are re-checked against the `admins` table on every
/// admin request, so `role` here is only a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAccount {
    /// Database ID in the table for `kind`.
    pub id: i32,
    /// Which account table `id` refers to.
    pub kind: AccountKind,
    /// Display name.
    pub name: String,
    /// Admin role at sign-in time (admins only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<AdminRole>,
}

impl CurrentAccount {
    /// The customer ID, if this is a customer session.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        (self.kind == AccountKind::Customer).then_some(UserId::new(self.id))
    }

    /// The driver ID, if this is a driver session.
    #[must_use]
    pub fn driver_id(&self) -> Option<DriverId> {
        (self.kind == AccountKind::Driver).then_some(DriverId::new(self.id))
    }

    /// The moving partner ID, if this is a partner session.
    #[must_use]
    pub fn moving_partner_id(&self) -> Option<MovingPartnerId> {
        (self.kind == AccountKind::MovingPartner).then_some(MovingPartnerId::new(self.id))
    }

    /// The admin ID, if this is an admin session.
    #[must_use]
    pub fn admin_id(&self) -> Option<AdminId> {
        (self.kind == AccountKind::Admin).then_some(AdminId::new(self.id))
    }
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current signed-in account.
    pub const CURRENT_ACCOUNT: &str = "current_account";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(kind: AccountKind) -> CurrentAccount {
        CurrentAccount {
            id: 7,
            kind,
            name: "Sam".to_string(),
            role: None,
        }
    }

    #[test]
    fn test_ids_only_resolve_for_matching_kind() {
        let customer = account(AccountKind::Customer);
        assert_eq!(customer.user_id(), Some(UserId::new(7)));
        assert_eq!(customer.driver_id(), None);
        assert_eq!(customer.admin_id(), None);

        let driver = account(AccountKind::Driver);
        assert_eq!(driver.driver_id(), Some(DriverId::new(7)));
        assert_eq!(driver.user_id(), None);

        let partner = account(AccountKind::MovingPartner);
        assert_eq!(partner.moving_partner_id(), Some(MovingPartnerId::new(7)));
    }
}

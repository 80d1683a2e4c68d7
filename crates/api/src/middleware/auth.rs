//! Authentication extractors.
//!
//! Every extractor rejects with a JSON [`AppError`]: 401 when nobody is
//! signed in (or no session layer is installed), 403 when the signed-in
//! account is of the wrong kind.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use stowline_core::{AccountKind, DriverId, UserId};

use crate::db::AdminRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::{Admin, CurrentAccount, session_keys};
use crate::state::AppState;

async fn session_account(parts: &Parts) -> Result<Option<CurrentAccount>, AppError> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    session
        .get::<CurrentAccount>(session_keys::CURRENT_ACCOUNT)
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {e}")))
}

async fn require_account(parts: &Parts) -> Result<CurrentAccount, AppError> {
    let account = session_account(parts)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))?;
    set_sentry_user(account.id, account.kind);
    Ok(account)
}

/// Extractor that requires any signed-in account.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireAccount(account): RequireAccount) -> Json<CurrentAccount> {
///     Json(account)
/// }
/// ```
pub struct RequireAccount(pub CurrentAccount);

impl<S> FromRequestParts<S> for RequireAccount
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_account(parts).await.map(Self)
    }
}

/// Extractor that requires a signed-in customer.
pub struct RequireCustomer(pub UserId, pub CurrentAccount);

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = require_account(parts).await?;
        let id = account
            .user_id()
            .ok_or_else(|| AppError::Forbidden("Customer account required".to_string()))?;
        Ok(Self(id, account))
    }
}

/// Extractor that requires a signed-in driver.
pub struct RequireDriver(pub DriverId, pub CurrentAccount);

impl<S> FromRequestParts<S> for RequireDriver
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = require_account(parts).await?;
        let id = account
            .driver_id()
            .ok_or_else(|| AppError::Forbidden("Driver account required".to_string()))?;
        Ok(Self(id, account))
    }
}

/// Extractor that requires a signed-in admin.
///
/// The session only says who signed in; the admin is re-read from the
/// `admins` table on every request so removed admins lose access at once
/// and role changes apply immediately.
pub struct RequireAdmin(pub Admin);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account = require_account(parts).await?;
        let admin_id = account
            .admin_id()
            .ok_or_else(|| AppError::Forbidden("Admin account required".to_string()))?;

        let admin = AdminRepository::new(state.pool())
            .get_by_id(admin_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(admin_id = %admin_id, "Session refers to a removed admin");
                AppError::Unauthorized("Admin account no longer exists".to_string())
            })?;

        Ok(Self(admin))
    }
}

/// Extractor that requires an admin whose role may write.
pub struct RequireAdminWrite(pub Admin);

impl FromRequestParts<AppState> for RequireAdminWrite {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAdmin(admin) = RequireAdmin::from_request_parts(parts, state).await?;
        if !admin.role.can_write() {
            return Err(AppError::Forbidden(format!(
                "The {} role is read-only",
                admin.role
            )));
        }
        Ok(Self(admin))
    }
}

/// Store the signed-in account in the session, cycling the session ID.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_account(
    session: &Session,
    account: &CurrentAccount,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ACCOUNT, account).await
}

/// Sign out: drop the whole session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_account(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

/// Whether `account` may act on customer `user_id` (the customer
/// themselves, or any admin).
#[must_use]
pub fn can_act_for_user(account: &CurrentAccount, user_id: UserId) -> bool {
    account.kind == AccountKind::Admin || account.user_id() == Some(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(kind: AccountKind, id: i32) -> CurrentAccount {
        CurrentAccount {
            id,
            kind,
            name: "Sam".to_string(),
            role: None,
        }
    }

    #[test]
    fn test_customers_act_only_for_themselves() {
        let me = account(AccountKind::Customer, 4);
        assert!(can_act_for_user(&me, UserId::new(4)));
        assert!(!can_act_for_user(&me, UserId::new(5)));
    }

    #[test]
    fn test_admins_act_for_anyone() {
        let admin = account(AccountKind::Admin, 1);
        assert!(can_act_for_user(&admin, UserId::new(99)));
    }

    #[test]
    fn test_drivers_cannot_act_for_customers() {
        // Same numeric ID, different table.
        let driver = account(AccountKind::Driver, 4);
        assert!(!can_act_for_user(&driver, UserId::new(4)));
    }
}

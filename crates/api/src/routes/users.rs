//! Customer profile handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::instrument;

use stowline_core::{PhoneNumber, UserId};

use crate::{
    db::UserRepository,
    error::{AppError, NotFoundExt, Result},
    extract::{ApiJson, ApiPath},
    middleware::{RequireAccount, RequireCustomer, auth::can_act_for_user},
    models::User,
    state::AppState,
};

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(me))
        .route("/api/users/{id}/phone-number", patch(update_phone_number))
}

/// Request for changing a phone number.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberRequest {
    #[serde(alias = "phone_number")]
    pub phone_number: String,
}

/// The signed-in customer's profile.
#[instrument(skip(state))]
pub async fn me(
    RequireCustomer(user_id, _): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Json<User>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(user))
}

/// Change a customer's phone number.
///
/// The number must have exactly ten digits once formatting is stripped and
/// must not belong to another customer. A new number starts unverified.
#[instrument(skip(state, account, body), fields(user_id = %user_id))]
pub async fn update_phone_number(
    RequireAccount(account): RequireAccount,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(body): ApiJson<PhoneNumberRequest>,
) -> Result<Json<User>> {
    if !can_act_for_user(&account, user_id) {
        return Err(AppError::Forbidden(
            "You can only change your own phone number".to_string(),
        ));
    }

    let phone = PhoneNumber::parse(&body.phone_number)
        .map_err(|e| AppError::BadRequest(format!("Invalid phone number: {e}")))?;

    let user = UserRepository::new(state.pool())
        .update_phone_number(user_id, &phone)
        .await
        .or_not_found("User")?;

    tracing::info!(user_id = %user_id, "Phone number updated");
    Ok(Json(user))
}

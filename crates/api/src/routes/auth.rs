//! Passwordless login handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    error::{AppError, Result},
    extract::ApiJson,
    middleware::{RequireAccount, clear_current_account, set_current_account},
    models::CurrentAccount,
    services::{
        AuthService,
        auth::{CodeSent, SendCodeInput, VerifyCodeInput},
    },
    state::AppState,
};

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/send-code", post(send_code))
        .route("/api/auth/verify-code", post(verify_code))
        .route("/api/auth/session", get(current_session))
        .route("/api/auth/logout", post(logout))
}

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("Session error: {e}"))
}

/// Send a login code to an existing account's phone or email.
#[instrument(skip(state, input))]
pub async fn send_code(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SendCodeInput>,
) -> Result<Json<CodeSent>> {
    let sent = AuthService::new(state.pool(), state.messenger())
        .send_code(&input)
        .await?;
    Ok(Json(sent))
}

/// Check a login code and sign the account in.
#[instrument(skip(state, session, input))]
pub async fn verify_code(
    State(state): State<AppState>,
    session: Session,
    ApiJson(input): ApiJson<VerifyCodeInput>,
) -> Result<Json<CurrentAccount>> {
    let account = AuthService::new(state.pool(), state.messenger())
        .verify_code(&input)
        .await?;

    set_current_account(&session, &account)
        .await
        .map_err(|e| session_error(&e))?;

    Ok(Json(account))
}

/// The signed-in account.
pub async fn current_session(RequireAccount(account): RequireAccount) -> Json<CurrentAccount> {
    Json(account)
}

/// End the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_account(&session)
        .await
        .map_err(|e| session_error(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

//! Notification center handlers.
//!
//! Every account kind has a notification center; rows are scoped by the
//! session's account kind and ID.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch, post},
};
use serde::Serialize;
use tracing::instrument;

use stowline_core::NotificationId;

use crate::{
    db::NotificationRepository,
    error::{NotFoundExt, Result},
    extract::{ApiPath, ApiQuery},
    middleware::RequireAccount,
    models::{Notification, notification::NotificationQuery},
    state::AppState,
};

/// Build the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/{id}/read", patch(mark_read))
        .route("/api/notifications/read-all", post(mark_all_read))
}

/// Response for the unread badge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

/// Response for marking everything read.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// Own notifications, newest first.
#[instrument(skip(state, account))]
pub async fn list(
    RequireAccount(account): RequireAccount,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> Result<Json<Vec<Notification>>> {
    let notifications = NotificationRepository::new(state.pool())
        .list(account.kind, account.id, query.unread_only, query.limit())
        .await?;
    Ok(Json(notifications))
}

/// Number of unread notifications.
#[instrument(skip(state, account))]
pub async fn unread_count(
    RequireAccount(account): RequireAccount,
    State(state): State<AppState>,
) -> Result<Json<UnreadCountResponse>> {
    let unread_count = NotificationRepository::new(state.pool())
        .unread_count(account.kind, account.id)
        .await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

/// Mark one notification read. 404 when it belongs to someone else.
#[instrument(skip(state, account))]
pub async fn mark_read(
    RequireAccount(account): RequireAccount,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<NotificationId>,
) -> Result<Json<Notification>> {
    let notification = NotificationRepository::new(state.pool())
        .mark_read(id, account.kind, account.id)
        .await
        .or_not_found("Notification")?;
    Ok(Json(notification))
}

/// Mark every notification read.
#[instrument(skip(state, account))]
pub async fn mark_all_read(
    RequireAccount(account): RequireAccount,
    State(state): State<AppState>,
) -> Result<Json<MarkAllReadResponse>> {
    let updated = NotificationRepository::new(state.pool())
        .mark_all_read(account.kind, account.id)
        .await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

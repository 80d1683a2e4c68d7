//! Admin appointment handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch},
};
use serde::Serialize;
use tracing::instrument;

use stowline_core::AppointmentId;

use crate::{
    db::{AppointmentRepository, admin_logs::AdminLogRepository},
    error::{AppError, NotFoundExt, Result},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::{RequireAdmin, RequireAdminWrite},
    models::admin_log::AdminLogTarget,
    models::appointment::{AssignPartnerInput, PartnerContactInput, StatusActor, StatusUpdateInput},
    models::{AdminLog, Appointment, AppointmentDetail, AppointmentFilter},
    services::follow_up,
    state::AppState,
};

/// Build the admin appointments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/appointments", get(list))
        .route("/api/admin/appointments/{id}", get(show))
        .route("/api/admin/appointments/{id}/status", patch(update_status))
        .route(
            "/api/admin/appointments/{id}/partner-contact",
            patch(update_partner_contact),
        )
        .route(
            "/api/admin/appointments/{id}/moving-partner",
            patch(assign_moving_partner),
        )
}

/// Appointment detail for admins.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAppointmentDetail {
    #[serde(flatten)]
    pub detail: AppointmentDetail,
    pub admin_logs: Vec<AdminLog>,
}

/// All appointments, optionally filtered by status and date range.
#[instrument(skip(state, _admin))]
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
) -> Result<Json<Vec<Appointment>>> {
    let appointments = AppointmentRepository::new(state.pool())
        .list(&filter)
        .await?;
    Ok(Json(appointments))
}

/// One appointment with its storage units and audit trail.
#[instrument(skip(state, _admin))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
) -> Result<Json<AdminAppointmentDetail>> {
    let repo = AppointmentRepository::new(state.pool());
    let appointment = repo
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Appointment"))?;
    let storage_units = repo.storage_units(id).await?;
    let admin_logs = AdminLogRepository::new(state.pool())
        .list_for_target(AdminLogTarget::Appointment, id.as_i32())
        .await?;

    Ok(Json(AdminAppointmentDetail {
        detail: AppointmentDetail {
            appointment,
            storage_units,
        },
        admin_logs,
    }))
}

/// Change an appointment's status.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update_status(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
    ApiJson(input): ApiJson<StatusUpdateInput>,
) -> Result<Json<Appointment>> {
    let appointment = AppointmentRepository::new(state.pool())
        .update_status(id, input.status, StatusActor::Admin, Some(admin.id))
        .await
        .or_not_found("Appointment")?;

    follow_up::appointment_status_changed(&state, &appointment).await;
    Ok(Json(appointment))
}

/// Record whether the assigned moving partner was contacted and reached.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update_partner_contact(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
    ApiJson(input): ApiJson<PartnerContactInput>,
) -> Result<Json<Appointment>> {
    let appointment = AppointmentRepository::new(state.pool())
        .update_partner_contact(id, input, admin.id)
        .await
        .or_not_found("Appointment")?;

    tracing::info!(
        appointment_id = %id,
        contacted = input.contacted,
        reached = input.reached,
        "Partner contact recorded"
    );
    Ok(Json(appointment))
}

/// Assign a moving partner to an appointment.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn assign_moving_partner(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
    ApiJson(input): ApiJson<AssignPartnerInput>,
) -> Result<Json<Appointment>> {
    let appointment = AppointmentRepository::new(state.pool())
        .assign_partner(id, input.moving_partner_id, admin.id)
        .await
        .or_not_found("Appointment or moving partner")?;

    follow_up::job_assigned(&state, &appointment, input.moving_partner_id).await;
    Ok(Json(appointment))
}

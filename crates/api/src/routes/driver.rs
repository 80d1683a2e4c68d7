//! Driver job handlers.
//!
//! Drivers see the jobs assigned to the moving partners they are actively
//! linked to, and may only start (Confirmed to In Progress) and finish
//! (In Progress to Completed) them.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch},
};
use tracing::instrument;

use stowline_core::AppointmentId;

use crate::{
    db::AppointmentRepository,
    error::{AppError, Result},
    extract::{ApiJson, ApiPath},
    middleware::RequireDriver,
    models::Appointment,
    models::appointment::{StatusActor, StatusUpdateInput},
    services::follow_up,
    state::AppState,
};

/// Build the driver router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/driver/appointments", get(list))
        .route("/api/driver/appointments/{id}/status", patch(update_status))
}

/// Jobs of the driver's moving partners.
#[instrument(skip(state))]
pub async fn list(
    RequireDriver(driver_id, _): RequireDriver,
    State(state): State<AppState>,
) -> Result<Json<Vec<Appointment>>> {
    let appointments = AppointmentRepository::new(state.pool())
        .list_for_driver(driver_id)
        .await?;
    Ok(Json(appointments))
}

/// Start or finish a job.
#[instrument(skip(state, input))]
pub async fn update_status(
    RequireDriver(driver_id, _): RequireDriver,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
    ApiJson(input): ApiJson<StatusUpdateInput>,
) -> Result<Json<Appointment>> {
    let repo = AppointmentRepository::new(state.pool());
    repo.get_for_driver(id, driver_id)
        .await?
        .ok_or(AppError::NotFound("Appointment"))?;

    let appointment = repo
        .update_status(id, input.status, StatusActor::Driver, None)
        .await?;

    follow_up::appointment_status_changed(&state, &appointment).await;
    Ok(Json(appointment))
}

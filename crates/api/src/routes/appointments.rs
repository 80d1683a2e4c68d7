//! Customer appointment handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};
use chrono::Utc;
use tracing::instrument;

use stowline_core::{AppointmentId, AppointmentStatus};

use crate::{
    db::{AppointmentRepository, UserRepository},
    error::{AppError, Result},
    extract::{ApiJson, ApiPath},
    middleware::RequireCustomer,
    models::appointment::StatusActor,
    models::{Appointment, AppointmentDetail, BookAppointmentInput},
    services::follow_up,
    state::AppState,
};

/// Build the customer appointments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/appointments", get(list).post(book))
        .route("/api/appointments/{id}", get(show))
        .route("/api/appointments/{id}/cancel", patch(cancel))
}

/// The signed-in customer's appointments, soonest first.
#[instrument(skip(state))]
pub async fn list(
    RequireCustomer(user_id, _): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Json<Vec<Appointment>>> {
    let appointments = AppointmentRepository::new(state.pool())
        .list_for_user(user_id)
        .await?;
    Ok(Json(appointments))
}

/// One of the customer's appointments with the storage units it started.
#[instrument(skip(state))]
pub async fn show(
    RequireCustomer(user_id, _): RequireCustomer,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
) -> Result<Json<AppointmentDetail>> {
    let repo = AppointmentRepository::new(state.pool());
    let appointment = repo
        .get_for_user(id, user_id)
        .await?
        .ok_or(AppError::NotFound("Appointment"))?;
    let storage_units = repo.storage_units(id).await?;
    Ok(Json(AppointmentDetail {
        appointment,
        storage_units,
    }))
}

/// Book an appointment.
#[instrument(skip(state, input))]
pub async fn book(
    RequireCustomer(user_id, _): RequireCustomer,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<BookAppointmentInput>,
) -> Result<(StatusCode, Json<Appointment>)> {
    input.validate(Utc::now())?;

    let user = UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let appointment = AppointmentRepository::new(state.pool())
        .create(user_id, &input)
        .await?;

    follow_up::appointment_booked(&state, &user, &appointment).await;

    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Cancel one of the customer's appointments.
#[instrument(skip(state))]
pub async fn cancel(
    RequireCustomer(user_id, _): RequireCustomer,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
) -> Result<Json<Appointment>> {
    let repo = AppointmentRepository::new(state.pool());
    repo.get_for_user(id, user_id)
        .await?
        .ok_or(AppError::NotFound("Appointment"))?;

    let appointment = repo
        .update_status(id, AppointmentStatus::Canceled, StatusActor::Customer, None)
        .await?;

    follow_up::appointment_status_changed(&state, &appointment).await;
    Ok(Json(appointment))
}

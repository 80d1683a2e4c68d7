//! Customer-facing storage unit handlers.

use axum::{Json, Router, extract::State, routing::get};
use tracing::instrument;

use crate::{
    db::StorageUnitRepository,
    error::Result,
    middleware::RequireCustomer,
    models::{Availability, StorageUnit},
    state::AppState,
};

/// Build the storage router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/storage-units/availability", get(availability))
        .route("/api/storage-units/mine", get(mine))
}

/// How many units can still be booked.
///
/// Empty units minus units reserved by upcoming pickups, never below zero.
#[instrument(skip(state))]
pub async fn availability(State(state): State<AppState>) -> Result<Json<Availability>> {
    let counts = StorageUnitRepository::new(state.pool())
        .capacity_counts()
        .await?;
    Ok(Json(Availability::compute(
        counts.empty_units,
        counts.reserved_units,
        state.config().policy.low_stock_threshold,
    )))
}

/// Units currently holding the customer's items.
#[instrument(skip(state))]
pub async fn mine(
    RequireCustomer(user_id, _): RequireCustomer,
    State(state): State<AppState>,
) -> Result<Json<Vec<StorageUnit>>> {
    let units = StorageUnitRepository::new(state.pool())
        .active_units_for_user(user_id)
        .await?;
    Ok(Json(units))
}

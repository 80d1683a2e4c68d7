//! Admin storage unit handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Serialize;
use tracing::instrument;

use stowline_core::{StorageUnitId, StorageUnitUsageId};

use crate::{
    db::StorageUnitRepository,
    error::{AppError, NotFoundExt, Result},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::{RequireAdmin, RequireAdminWrite},
    models::storage_unit::{
        CreateStorageUnitInput, EndUsageInput, StartUsageInput, StorageUnitFilter,
    },
    models::{CleaningInput, StorageUnit, StorageUnitCleaning, StorageUnitUsage},
    services::follow_up,
    state::AppState,
};

/// Build the admin storage units router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/storage-units", get(list).post(create))
        .route("/api/admin/storage-units/{id}/cleaning", post(record_cleaning))
        .route("/api/admin/storage-units/{id}/usages", post(start_usage))
        .route("/api/admin/storage-unit-usages/{id}/end", patch(end_usage))
}

/// Response for a recorded cleaning.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningResponse {
    pub storage_unit: StorageUnit,
    pub cleaning: StorageUnitCleaning,
}

/// Units, optionally by status.
#[instrument(skip(state, _admin))]
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<StorageUnitFilter>,
) -> Result<Json<Vec<StorageUnit>>> {
    let units = StorageUnitRepository::new(state.pool())
        .list(filter.status)
        .await?;
    Ok(Json(units))
}

/// Add a unit.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateStorageUnitInput>,
) -> Result<(StatusCode, Json<StorageUnit>)> {
    let unit_number = input.unit_number.trim();
    if unit_number.is_empty() {
        return Err(AppError::BadRequest("Unit number is required".to_string()));
    }

    let unit = StorageUnitRepository::new(state.pool())
        .create(unit_number, admin.id)
        .await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Record a cleaning: the unit becomes Empty, with photos as evidence.
///
/// Photo references are checked before the database is touched.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, photos = input.photos.len()))]
pub async fn record_cleaning(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<StorageUnitId>,
    ApiJson(input): ApiJson<CleaningInput>,
) -> Result<(StatusCode, Json<CleaningResponse>)> {
    input.validate()?;

    let (storage_unit, cleaning) = StorageUnitRepository::new(state.pool())
        .record_cleaning(id, &input, admin.id)
        .await
        .or_not_found("Storage unit")?;

    tracing::info!(storage_unit_id = %id, cleaning_id = %cleaning.id, "Storage unit cleaned");
    Ok((
        StatusCode::CREATED,
        Json(CleaningResponse {
            storage_unit,
            cleaning,
        }),
    ))
}

/// Put a customer's items into an empty unit.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn start_usage(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<StorageUnitId>,
    ApiJson(input): ApiJson<StartUsageInput>,
) -> Result<(StatusCode, Json<StorageUnitUsage>)> {
    let usage = StorageUnitRepository::new(state.pool())
        .start_usage(id, input, admin.id)
        .await
        .or_not_found("Storage unit")?;

    follow_up::usage_started(&state, &usage).await;
    Ok((StatusCode::CREATED, Json(usage)))
}

/// End a usage; the unit then needs cleaning.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn end_usage(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<StorageUnitUsageId>,
    ApiJson(input): ApiJson<EndUsageInput>,
) -> Result<Json<StorageUnitUsage>> {
    let usage = StorageUnitRepository::new(state.pool())
        .end_usage(id, input, admin.id)
        .await
        .or_not_found("Storage unit usage")?;

    follow_up::usage_ended(&state, &usage).await;
    Ok(Json(usage))
}

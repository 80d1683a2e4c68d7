//! Moving partner, driver and vehicle onboarding.
//!
//! A partner becomes Active once it is approved, has a dispatch team and
//! has enough approved drivers. Every change to one of those inputs
//! re-runs the activation check, so handlers that touch them return the
//! resulting [`ActivationOutcome`].

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stowline_core::{DriverId, MovingPartnerId, MovingPartnerStatus, VehicleId};

use crate::{
    db::{DriverRepository, MovingPartnerRepository, VehicleRepository},
    error::{AppError, NotFoundExt, Result},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::{RequireAdmin, RequireAdminWrite},
    models::onboarding::{ActivationOutcome, ApprovalInput, DispatchTeamInput, LinkDriverInput},
    models::{ActivationCheck, Driver, MovingPartner, Vehicle},
    services::follow_up,
    state::AppState,
};

/// Build the onboarding router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/moving-partners", get(list_partners))
        .route("/api/admin/moving-partners/{id}", get(show_partner))
        .route(
            "/api/admin/moving-partners/{id}/approval",
            patch(set_partner_approval),
        )
        .route(
            "/api/admin/moving-partners/{id}/dispatch-team",
            patch(set_dispatch_team),
        )
        .route(
            "/api/admin/moving-partners/{id}/activation",
            post(evaluate_activation),
        )
        .route("/api/admin/moving-partners/{id}/drivers", post(link_driver))
        .route(
            "/api/admin/moving-partners/{id}/drivers/{driver_id}",
            delete(unlink_driver),
        )
        .route("/api/admin/drivers", get(list_drivers))
        .route("/api/admin/drivers/{id}/approval", patch(set_driver_approval))
        .route("/api/admin/vehicles", get(list_vehicles))
        .route(
            "/api/admin/vehicles/{id}/approval",
            patch(set_vehicle_approval),
        )
}

/// Partner list filter.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PartnerFilter {
    pub status: Option<MovingPartnerStatus>,
}

/// Driver and vehicle list filter.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApprovedFilter {
    pub approved: Option<bool>,
}

/// A partner with where it stands on activation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerDetail {
    pub moving_partner: MovingPartner,
    pub check: ActivationCheck,
    pub unmet: Vec<String>,
}

/// A driver approval and the partner activations it triggered.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverApproval {
    pub driver: Driver,
    pub activations: Vec<ActivationOutcome>,
}

// =============================================================================
// Moving partners
// =============================================================================

#[instrument(skip(state, _admin))]
async fn list_partners(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<PartnerFilter>,
) -> Result<Json<Vec<MovingPartner>>> {
    let partners = MovingPartnerRepository::new(state.pool())
        .list(filter.status)
        .await?;
    Ok(Json(partners))
}

#[instrument(skip(state, _admin))]
async fn show_partner(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MovingPartnerId>,
) -> Result<Json<PartnerDetail>> {
    let repo = MovingPartnerRepository::new(state.pool());
    let moving_partner = repo
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Moving partner"))?;
    let approved_drivers = repo.count_approved_drivers(id).await?;
    let check = ActivationCheck::for_partner(
        &moving_partner,
        approved_drivers,
        state.config().policy.min_approved_drivers,
    );

    Ok(Json(PartnerDetail {
        moving_partner,
        unmet: check.unmet(),
        check,
    }))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
async fn set_partner_approval(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MovingPartnerId>,
    ApiJson(input): ApiJson<ApprovalInput>,
) -> Result<Json<ActivationOutcome>> {
    let partner = MovingPartnerRepository::new(state.pool())
        .set_approval(id, input.approved, admin.id)
        .await
        .or_not_found("Moving partner")?;

    if partner.is_approved {
        follow_up::partner_approved(&state, &partner).await;
    }

    let outcome = follow_up::reevaluate_partner(&state, id, admin.id).await?;
    Ok(Json(outcome))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
async fn set_dispatch_team(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MovingPartnerId>,
    ApiJson(input): ApiJson<DispatchTeamInput>,
) -> Result<Json<ActivationOutcome>> {
    MovingPartnerRepository::new(state.pool())
        .set_dispatch_team(id, input.team_id(), admin.id)
        .await
        .or_not_found("Moving partner")?;

    let outcome = follow_up::reevaluate_partner(&state, id, admin.id).await?;
    Ok(Json(outcome))
}

/// Run the activation check on demand. A partner that passes is promoted;
/// one that doesn't is left alone and the unmet requirements are returned.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn evaluate_activation(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MovingPartnerId>,
) -> Result<Json<ActivationOutcome>> {
    let outcome = follow_up::reevaluate_partner(&state, id, admin.id)
        .await
        .or_not_found("Moving partner")?;
    Ok(Json(outcome))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
async fn link_driver(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MovingPartnerId>,
    ApiJson(input): ApiJson<LinkDriverInput>,
) -> Result<(StatusCode, Json<ActivationOutcome>)> {
    MovingPartnerRepository::new(state.pool())
        .link_driver(id, input.driver_id, admin.id)
        .await
        .or_not_found("Moving partner or driver")?;

    match DriverRepository::new(state.pool())
        .get_by_id(input.driver_id)
        .await
    {
        Ok(Some(driver)) => follow_up::driver_linked(&state, id, &driver).await,
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load driver for notification"),
    }

    let outcome = follow_up::reevaluate_partner(&state, id, admin.id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Deactivate a driver link. An Active partner stays Active.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn unlink_driver(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath((id, driver_id)): ApiPath<(MovingPartnerId, DriverId)>,
) -> Result<StatusCode> {
    MovingPartnerRepository::new(state.pool())
        .unlink_driver(id, driver_id, admin.id)
        .await
        .or_not_found("Driver link")?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Drivers
// =============================================================================

#[instrument(skip(state, _admin))]
async fn list_drivers(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ApprovedFilter>,
) -> Result<Json<Vec<Driver>>> {
    let drivers = DriverRepository::new(state.pool())
        .list(filter.approved)
        .await?;
    Ok(Json(drivers))
}

/// Approving a driver can complete activation for any partner it is
/// linked to.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
async fn set_driver_approval(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DriverId>,
    ApiJson(input): ApiJson<ApprovalInput>,
) -> Result<Json<DriverApproval>> {
    let driver = DriverRepository::new(state.pool())
        .set_approval(id, input.approved, admin.id)
        .await
        .or_not_found("Driver")?;

    let activations = if driver.is_approved {
        follow_up::driver_approved(&state, &driver).await;
        follow_up::reevaluate_driver_partners(&state, id, admin.id).await?
    } else {
        Vec::new()
    };

    Ok(Json(DriverApproval {
        driver,
        activations,
    }))
}

// =============================================================================
// Vehicles
// =============================================================================

#[instrument(skip(state, _admin))]
async fn list_vehicles(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ApprovedFilter>,
) -> Result<Json<Vec<Vehicle>>> {
    let vehicles = VehicleRepository::new(state.pool())
        .list(filter.approved)
        .await?;
    Ok(Json(vehicles))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
async fn set_vehicle_approval(
    RequireAdminWrite(admin): RequireAdminWrite,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VehicleId>,
    ApiJson(input): ApiJson<ApprovalInput>,
) -> Result<Json<Vehicle>> {
    let vehicle = VehicleRepository::new(state.pool())
        .set_approval(id, input.approved, admin.id)
        .await
        .or_not_found("Vehicle")?;
    Ok(Json(vehicle))
}

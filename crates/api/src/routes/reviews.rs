//! Public reviews handler.

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::instrument;

use crate::{models::ReviewsResponse, state::AppState};

/// Build the reviews router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/reviews", get(reviews))
}

/// Reviews from the first tier that has any, with a matching
/// `Cache-Control` max-age.
///
/// Never fails: the static list is the last resort.
#[instrument(skip(state))]
pub async fn reviews(State(state): State<AppState>) -> Response {
    let response = state.reviews().reviews(state.pool()).await;
    let cache_control = response.source.cache_control();
    let body: ReviewsResponse = (*response).clone();

    ([(header::CACHE_CONTROL, cache_control)], Json(body)).into_response()
}

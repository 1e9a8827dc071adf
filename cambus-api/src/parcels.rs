use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use cambus_catalog::Parcel;
use cambus_core::session::SessionClaims;

use crate::error::AppError;
use crate::middleware::customer_auth_middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/parcels", get(list_mine))
        .route("/parcels/{tracking_id}", get(track))
        .route_layer(axum::middleware::from_fn_with_state(state, customer_auth_middleware))
}

/// Parcels registered under the signed-in customer's email.
async fn list_mine(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    Ok(Json(state.repos.packages.list_for_email(&claims.email).await?))
}

/// Anyone holding a tracking id may follow the parcel.
async fn track(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> Result<Json<Parcel>, AppError> {
    state
        .repos
        .packages
        .get_by_tracking_id(&tracking_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError(format!("No package found with tracking ID {}", tracking_id)))
}

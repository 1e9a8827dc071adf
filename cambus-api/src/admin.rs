use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use cambus_catalog::{
    schedule, Bus, BusDraft, Parcel, ParcelDraft, ParcelStatus, Route, RouteDraft, RouteStatus, Schedule,
    ScheduleDraft, ScheduleStatus,
};
use cambus_core::credentials::hash_password;
use cambus_core::identity::{is_valid_email, normalize_email, Admin, MIN_PASSWORD_LEN};
use cambus_core::session::{AdminAuth, SessionClaims};
use cambus_order::{approval, BookingStatus, BookingView, Decision};
use cambus_shared::models::events::BookingReviewedEvent;
use cambus_shared::pii::Masked;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{AdminSummary, SignInRequest};
use crate::bookings::{find_booking, store_transition, TransitionResponse};
use crate::buses::find_bus;
use crate::error::AppError;
use crate::middleware::admin_auth_middleware;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub status: Option<ScheduleStatus>,
}

#[derive(Debug, Deserialize)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleStatusRequest {
    pub status: ScheduleStatus,
}

#[derive(Debug, Deserialize)]
pub struct ParcelUpdateRequest {
    pub status: ParcelStatus,
    pub location: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub total_buses: usize,
    pub active_routes: usize,
    pub total_packages: usize,
    pub pending_bookings: usize,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/session", get(session))
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/register", post(register_admin))
        // Buses
        .route("/admin/buses", get(list_buses).post(create_bus))
        .route("/admin/buses/{id}", put(update_bus).delete(delete_bus))
        // Routes
        .route("/admin/routes", get(list_routes).post(create_route))
        .route("/admin/routes/{id}", put(update_route).delete(delete_route))
        // Schedules
        .route("/admin/schedules", get(list_schedules).post(create_schedule))
        .route("/admin/schedules/{id}", axum::routing::delete(delete_schedule))
        .route("/admin/schedules/{id}/status", put(update_schedule_status))
        // Packages
        .route("/admin/packages", get(list_packages).post(create_package))
        .route("/admin/packages/{id}/status", put(update_package_status))
        // Booking approval
        .route("/admin/bookings", get(list_bookings))
        .route("/admin/bookings/pending", get(pending_bookings))
        .route("/admin/bookings/{id}/confirm", post(confirm_booking))
        .route("/admin/bookings/{id}/reject", post(reject_booking))
        .route_layer(axum::middleware::from_fn_with_state(state, admin_auth_middleware))
}

fn search_term(query: &SearchQuery) -> Option<&str> {
    query.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ============================================================================
// Dashboard & accounts
// ============================================================================

/// GET /v1/admin/session
async fn session(Extension(claims): Extension<SessionClaims>) -> Json<AdminAuth> {
    Json(AdminAuth::from(&claims))
}

/// GET /v1/admin/dashboard
async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let repos = &state.repos;
    let buses = repos.buses.list_buses(false).await?;
    let routes = repos.routes.list_routes().await?;
    let packages = repos.packages.list_packages().await?;
    let pending = repos.bookings.list_bookings(Some(BookingStatus::Pending)).await?;

    Ok(Json(DashboardStats {
        total_buses: buses.len(),
        active_routes: routes.iter().filter(|r| r.status == RouteStatus::Active).count(),
        total_packages: packages.len(),
        pending_bookings: pending.len(),
    }))
}

/// POST /v1/admin/register
async fn register_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<SignInRequest>,
) -> Result<(StatusCode, Json<AdminSummary>), AppError> {
    if !is_valid_email(&req.email) {
        return Err(AppError::ValidationError("Please enter a valid email address".to_string()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let admin = Admin {
        id: Uuid::new_v4(),
        email: normalize_email(&req.email),
        password_hash: hash_password(&req.password)?,
        created_at: Utc::now(),
    };
    state.repos.accounts.create_admin(&admin).await?;

    info!("Admin {} registered by {}", Masked(&admin.email), Masked(&claims.email));
    Ok((
        StatusCode::CREATED,
        Json(AdminSummary {
            id: admin.id,
            email: admin.email,
        }),
    ))
}

// ============================================================================
// Buses
// ============================================================================

async fn list_buses(State(state): State<AppState>) -> Result<Json<Vec<Bus>>, AppError> {
    Ok(Json(state.repos.buses.list_buses(false).await?))
}

async fn create_bus(
    State(state): State<AppState>,
    Json(draft): Json<BusDraft>,
) -> Result<(StatusCode, Json<Bus>), AppError> {
    let bus = draft.into_bus()?;
    state.repos.buses.create_bus(&bus).await?;
    info!("Bus {} created: {} → {}", bus.id, bus.from, bus.to);
    Ok((StatusCode::CREATED, Json(bus)))
}

async fn update_bus(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<BusDraft>,
) -> Result<Json<Bus>, AppError> {
    let mut bus = find_bus(&state, id).await?;
    bus.apply(draft)?;
    state.repos.buses.update_bus(&bus).await?;
    Ok(Json(bus))
}

async fn delete_bus(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.repos.buses.delete_bus(id).await?;
    info!("Bus {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Routes
// ============================================================================

async fn list_routes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Route>>, AppError> {
    let mut routes = state.repos.routes.list_routes().await?;
    if let Some(term) = search_term(&query) {
        routes.retain(|r| r.matches(term));
    }
    Ok(Json(routes))
}

async fn create_route(
    State(state): State<AppState>,
    Json(draft): Json<RouteDraft>,
) -> Result<(StatusCode, Json<Route>), AppError> {
    let route = draft.into_route()?;
    state.repos.routes.save_route(&route).await?;
    Ok((StatusCode::CREATED, Json(route)))
}

async fn update_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<RouteDraft>,
) -> Result<Json<Route>, AppError> {
    let mut route = state
        .repos
        .routes
        .get_route(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Route {} not found", id)))?;
    route.apply(draft)?;
    state.repos.routes.save_route(&route).await?;
    Ok(Json(route))
}

async fn delete_route(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.repos.routes.delete_route(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Schedules
// ============================================================================

async fn list_schedules(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    let schedules = state.repos.schedules.list_schedules().await?;
    Ok(Json(schedule::filter_by_status(schedules, query.status)))
}

async fn create_schedule(
    State(state): State<AppState>,
    Json(draft): Json<ScheduleDraft>,
) -> Result<(StatusCode, Json<Schedule>), AppError> {
    let schedule = draft.into_schedule()?;
    state.repos.schedules.save_schedule(&schedule).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

async fn update_schedule_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ScheduleStatusRequest>,
) -> Result<Json<Schedule>, AppError> {
    let mut schedule = state
        .repos
        .schedules
        .get_schedule(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Schedule {} not found", id)))?;
    schedule.status = req.status;
    state.repos.schedules.save_schedule(&schedule).await?;
    Ok(Json(schedule))
}

async fn delete_schedule(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.repos.schedules.delete_schedule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Packages
// ============================================================================

async fn list_packages(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    let mut packages = state.repos.packages.list_packages().await?;
    if let Some(term) = search_term(&query) {
        packages.retain(|p| p.matches(term));
    }
    Ok(Json(packages))
}

async fn create_package(
    State(state): State<AppState>,
    Json(draft): Json<ParcelDraft>,
) -> Result<(StatusCode, Json<Parcel>), AppError> {
    draft.validate()?;
    let parcel = state.repos.packages.create_package(draft).await?;
    info!("Package {} registered at {}", parcel.tracking_id, parcel.origin);
    Ok((StatusCode::CREATED, Json(parcel)))
}

async fn update_package_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ParcelUpdateRequest>,
) -> Result<Json<Parcel>, AppError> {
    let mut parcel = state
        .repos
        .packages
        .get_package(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Package {} not found", id)))?;

    parcel.advance(req.status, req.location.trim().to_string(), Utc::now())?;
    state.repos.packages.update_package(&parcel).await?;
    Ok(Json(parcel))
}

// ============================================================================
// Booking approval
// ============================================================================

async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let bookings = state.repos.bookings.list_bookings(query.status).await?;
    Ok(Json(bookings.into_iter().map(BookingView::from).collect()))
}

/// Oldest pending booking first.
async fn pending_bookings(State(state): State<AppState>) -> Result<Json<Vec<BookingView>>, AppError> {
    let bookings = state.repos.bookings.list_bookings(Some(BookingStatus::Pending)).await?;
    Ok(Json(
        approval::pending_queue(bookings)
            .into_iter()
            .map(BookingView::from)
            .collect(),
    ))
}

async fn review(
    state: &AppState,
    id: &str,
    decision: Decision,
    claims: &SessionClaims,
) -> Result<TransitionResponse, AppError> {
    let mut booking = find_booking(state, id).await?;
    let from = booking.status;

    let outcome = booking.review(decision, Utc::now())?;
    let changed = store_transition(state, &booking, from, outcome).await?;

    if changed {
        let event = BookingReviewedEvent {
            booking_id: booking.id.clone(),
            status: booking.status.to_string(),
            reviewed_by: claims.email.clone(),
            timestamp: booking.updated_at.timestamp(),
        };
        info!(
            booking_id = %event.booking_id,
            status = %event.status,
            reviewed_by = %Masked(&event.reviewed_by),
            timestamp = event.timestamp,
            "Booking reviewed"
        );
    }

    Ok(TransitionResponse {
        booking: booking.into(),
        changed,
    })
}

/// POST /v1/admin/bookings/{id}/confirm
async fn confirm_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, AppError> {
    Ok(Json(review(&state, &id, Decision::Confirm, &claims).await?))
}

/// POST /v1/admin/bookings/{id}/reject
async fn reject_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, AppError> {
    Ok(Json(review(&state, &id, Decision::Reject, &claims).await?))
}

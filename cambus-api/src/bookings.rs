use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use cambus_core::session::SessionClaims;
use cambus_order::{ticket, Booking, BookingStatus, BookingView, ReviewOutcome};
use cambus_shared::models::events::SeatsChangedEvent;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::middleware::customer_auth_middleware;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub booking: BookingView,
    /// False when the booking already carried the requested status.
    pub changed: bool,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_mine))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .route("/bookings/{id}/ticket", get(download_ticket))
        .route_layer(axum::middleware::from_fn_with_state(state, customer_auth_middleware))
}

pub(crate) async fn find_booking(state: &AppState, id: &str) -> Result<Booking, AppError> {
    state
        .repos
        .bookings
        .get_booking(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Booking {} not found", id)))
}

async fn own_booking(state: &AppState, id: &str, claims: &SessionClaims) -> Result<Booking, AppError> {
    let booking = find_booking(state, id).await?;
    if booking.user_id != claims.sub {
        return Err(AppError::AuthorizationError("This booking does not belong to you".to_string()));
    }
    Ok(booking)
}

/// Persist a status change made on `booking`, which was `from` before, and
/// announce released seats.
pub(crate) async fn store_transition(
    state: &AppState,
    booking: &Booking,
    from: BookingStatus,
    outcome: ReviewOutcome,
) -> Result<bool, AppError> {
    let ReviewOutcome::Changed { .. } = outcome else {
        return Ok(false);
    };

    let release = outcome.releases_seats();
    state
        .repos
        .bookings
        .update_booking_status(booking, from, release)
        .await?;

    if release {
        state.publish_seats(SeatsChangedEvent {
            bus_id: booking.bus.id,
            seat_numbers: booking.seat_ids.clone(),
            booked: false,
            at: Utc::now().timestamp(),
        });
    }
    Ok(true)
}

async fn list_mine(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let bookings = state.repos.bookings.list_for_user(claims.sub).await?;
    Ok(Json(bookings.into_iter().map(BookingView::from).collect()))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    let booking = own_booking(&state, &id, &claims).await?;
    Ok(Json(booking.into()))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, AppError> {
    let mut booking = own_booking(&state, &id, &claims).await?;
    let from = booking.status;

    let outcome = booking.cancel(Utc::now())?;
    let changed = store_transition(&state, &booking, from, outcome).await?;
    if changed {
        info!("Booking {} cancelled by customer", booking.id);
    }

    Ok(Json(TransitionResponse {
        booking: booking.into(),
        changed,
    }))
}

async fn download_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = own_booking(&state, &id, &claims).await?;
    let text = ticket::render_ticket(&booking)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", ticket::ticket_filename(&booking)),
            ),
        ],
        text,
    ))
}

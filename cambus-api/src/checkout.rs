use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use cambus_catalog::{inventory, Bus, Seat, SeatMap, ToggleOutcome};
use cambus_core::session::SessionClaims;
use cambus_order::{Booking, BookingView, CheckoutSession, NewBooking, PaymentDetails, PaymentMethod, Step};
use cambus_shared::models::events::{BookingSubmittedEvent, SeatsChangedEvent};
use cambus_shared::pii::Masked;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::buses::find_bus;
use crate::error::AppError;
use crate::middleware::customer_auth_middleware;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SelectBusRequest {
    bus_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct PayRequest {
    payment_method: PaymentMethod,
    payment_reference: Option<String>,
}

/// Snapshot of a checkout as the client renders it.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub id: Uuid,
    pub step: Step,
    pub title: &'static str,
    pub description: &'static str,
    pub progress: u8,
    pub bus: Option<Bus>,
    pub seats: Vec<Seat>,
    pub selected_seats: Vec<String>,
    pub selected_label: String,
    pub total_amount: i64,
    pub currency: String,
    pub booking_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToggleResponse {
    outcome: ToggleOutcome,
    checkout: CheckoutView,
}

#[derive(Debug, Serialize)]
struct PayResponse {
    booking: BookingView,
    checkout: CheckoutView,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/checkout", post(start))
        .route("/checkout/{id}", get(show).delete(abandon))
        .route("/checkout/{id}/bus", post(select_bus))
        .route("/checkout/{id}/seats/{number}/toggle", post(toggle_seat))
        .route("/checkout/{id}/seats/confirm", post(confirm_seats))
        .route("/checkout/{id}/pay", post(pay))
        .route("/checkout/{id}/back", post(back))
        .route("/checkout/{id}/restart", post(restart))
        .route_layer(axum::middleware::from_fn_with_state(state, customer_auth_middleware))
}

fn ttl(state: &AppState) -> Duration {
    Duration::from_secs(state.business_rules.checkout_ttl_seconds)
}

async fn load(state: &AppState, id: Uuid, claims: &SessionClaims) -> Result<CheckoutSession, AppError> {
    let session = state
        .repos
        .sessions
        .load_checkout(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Checkout expired or not found".to_string()))?;

    if !session.is_owned_by(claims.sub) {
        return Err(AppError::AuthorizationError("This checkout does not belong to you".to_string()));
    }
    Ok(session)
}

async fn save(state: &AppState, session: &CheckoutSession) -> Result<(), AppError> {
    state.repos.sessions.save_checkout(session, ttl(state)).await?;
    Ok(())
}

/// Bus of the checkout and, while seats are still being chosen, its seat map with
/// the session's selection laid over it.
///
/// Seats booked by someone else since the last request drop out of the selection.
async fn selection(
    state: &AppState,
    session: &mut CheckoutSession,
) -> Result<(Option<Bus>, Option<SeatMap>), AppError> {
    let Some(bus_id) = session.flow.bus_id else {
        return Ok((None, None));
    };
    let bus = find_bus(state, bus_id).await?;
    if session.flow.step == Step::Confirmation {
        return Ok((Some(bus), None));
    }

    let mut map = state.repos.buses.seat_map(&bus).await?;
    session.flow.selected_seats.retain(|n| map.get(n).is_some());
    map.restore_selection(&session.flow.selected_seats)?;
    session.flow.selected_seats = map.selected_numbers();

    Ok((Some(bus), Some(map)))
}

fn render(state: &AppState, session: &CheckoutSession, bus: Option<Bus>, map: Option<SeatMap>) -> CheckoutView {
    let step = session.flow.step;
    let selected = &session.flow.selected_seats;

    let (total_amount, selected_label) = match (&bus, &map) {
        (Some(bus), Some(map)) => (map.total_price(bus.price), map.format_selected()),
        (Some(bus), None) if !selected.is_empty() => {
            (inventory::total_price(selected.len(), bus.price), selected.join(", "))
        }
        _ => (0, "None".to_string()),
    };

    CheckoutView {
        id: session.id,
        step,
        title: step.title(),
        description: step.description(),
        progress: step.progress(),
        bus,
        seats: map.map(|m| m.seats).unwrap_or_default(),
        selected_seats: selected.clone(),
        selected_label,
        total_amount,
        currency: state.business_rules.currency.clone(),
        booking_id: session.flow.booking_id.clone(),
    }
}

async fn view(state: &AppState, mut session: CheckoutSession) -> Result<CheckoutView, AppError> {
    let (bus, map) = selection(state, &mut session).await?;
    Ok(render(state, &session, bus, map))
}

async fn start(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<(StatusCode, Json<CheckoutView>), AppError> {
    let session = CheckoutSession::start(claims.sub, Utc::now());
    save(&state, &session).await?;
    Ok((StatusCode::CREATED, Json(view(&state, session).await?)))
}

async fn show(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutView>, AppError> {
    let session = load(&state, id, &claims).await?;
    Ok(Json(view(&state, session).await?))
}

/// Drop the checkout. Seats are never held by a checkout, so nothing is released.
async fn abandon(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load(&state, id, &claims).await?;
    state.repos.sessions.delete_checkout(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn select_bus(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectBusRequest>,
) -> Result<Json<CheckoutView>, AppError> {
    let mut session = load(&state, id, &claims).await?;

    let bus = find_bus(&state, req.bus_id).await?;
    if !bus.is_bookable() {
        return Err(AppError::ValidationError(format!("{} is not open for booking", bus.name)));
    }

    session.flow.select_bus(bus.id)?;
    save(&state, &session).await?;
    Ok(Json(view(&state, session).await?))
}

async fn toggle_seat(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path((id, number)): Path<(Uuid, String)>,
) -> Result<Json<ToggleResponse>, AppError> {
    let mut session = load(&state, id, &claims).await?;
    session.flow.require(Step::Seats, "select seats")?;

    let (bus, map) = selection(&state, &mut session).await?;
    let mut map = map.ok_or_else(|| AppError::ConflictError("Select a bus first".to_string()))?;

    let outcome = map.toggle(&number)?;
    session.flow.selected_seats = map.selected_numbers();
    save(&state, &session).await?;

    Ok(Json(ToggleResponse {
        outcome,
        checkout: render(&state, &session, bus, Some(map)),
    }))
}

async fn confirm_seats(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutView>, AppError> {
    let mut session = load(&state, id, &claims).await?;
    session.flow.require(Step::Seats, "book seats")?;

    let (bus, map) = selection(&state, &mut session).await?;
    session.flow.book_seats()?;
    save(&state, &session).await?;

    Ok(Json(render(&state, &session, bus, map)))
}

async fn pay(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<Uuid>,
    Json(req): Json<PayRequest>,
) -> Result<(StatusCode, Json<PayResponse>), AppError> {
    let mut session = load(&state, id, &claims).await?;
    session.flow.require(Step::Payment, "pay")?;

    let bus_id = session
        .flow
        .bus_id
        .ok_or_else(|| AppError::ConflictError("Select a bus first".to_string()))?;
    let bus = find_bus(&state, bus_id).await?;

    let booking = Booking::submit(
        NewBooking {
            user_id: claims.sub,
            user_name: claims.name.clone(),
            user_email: claims.email.clone(),
            bus,
            seat_ids: session.flow.selected_seats.clone(),
            payment: PaymentDetails {
                method: req.payment_method,
                reference: req.payment_reference.filter(|r| !r.trim().is_empty()),
            },
        },
        Utc::now(),
    )?;

    // Fails with a conflict if any seat was taken in the meantime.
    state.repos.bookings.create_booking(&booking).await?;

    session.flow.paid(booking.id.clone())?;
    save(&state, &session).await?;

    let now = Utc::now().timestamp();
    state.publish_seats(SeatsChangedEvent {
        bus_id: booking.bus.id,
        seat_numbers: booking.seat_ids.clone(),
        booked: true,
        at: now,
    });

    let event = BookingSubmittedEvent {
        booking_id: booking.id.clone(),
        bus_id: booking.bus.id,
        user_id: booking.user_id,
        total_amount: booking.total_amount,
        timestamp: now,
    };
    info!(?event, email = %Masked(&booking.user_email), "Booking submitted, awaiting payment confirmation");

    let checkout = view(&state, session).await?;
    Ok((
        StatusCode::CREATED,
        Json(PayResponse {
            booking: booking.into(),
            checkout,
        }),
    ))
}

async fn back(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutView>, AppError> {
    let mut session = load(&state, id, &claims).await?;
    session.flow.back()?;
    save(&state, &session).await?;
    Ok(Json(view(&state, session).await?))
}

async fn restart(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutView>, AppError> {
    let mut session = load(&state, id, &claims).await?;
    session.flow.new_booking()?;
    save(&state, &session).await?;
    Ok(Json(view(&state, session).await?))
}

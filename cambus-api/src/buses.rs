use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use cambus_catalog::{Bus, Seat};
use futures_util::{future, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::customer_auth_middleware;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BusFilter {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeatMapResponse {
    pub bus_id: Uuid,
    pub price: i64,
    pub available: usize,
    pub seats: Vec<Seat>,
    /// Same seats grouped by row number for the seat grid.
    pub rows: BTreeMap<u32, Vec<Seat>>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let stream = Router::new()
        .route("/buses/{id}/stream", get(seat_stream))
        .route_layer(axum::middleware::from_fn_with_state(state, customer_auth_middleware));

    Router::new()
        .route("/buses", get(list_buses))
        .route("/buses/{id}", get(get_bus))
        .route("/buses/{id}/seats", get(get_seats))
        .merge(stream)
}

/// Load a bus or answer 404.
pub(crate) async fn find_bus(state: &AppState, id: Uuid) -> Result<Bus, AppError> {
    state
        .repos
        .buses
        .get_bus(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Bus {} not found", id)))
}

async fn list_buses(
    State(state): State<AppState>,
    Query(filter): Query<BusFilter>,
) -> Result<Json<Vec<Bus>>, AppError> {
    let buses = state.repos.buses.list_buses(true).await?;
    Ok(Json(
        buses
            .into_iter()
            .filter(|b| b.serves(filter.from.as_deref(), filter.to.as_deref()))
            .collect(),
    ))
}

async fn get_bus(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Bus>, AppError> {
    let bus = find_bus(&state, id).await?;
    if !bus.is_bookable() {
        return Err(AppError::NotFoundError(format!("Bus {} not found", id)));
    }
    Ok(Json(bus))
}

async fn get_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SeatMapResponse>, AppError> {
    let bus = find_bus(&state, id).await?;
    if !bus.is_bookable() {
        return Err(AppError::NotFoundError(format!("Bus {} not found", id)));
    }
    let map = state.repos.buses.seat_map(&bus).await?;

    let rows = map
        .rows()
        .into_iter()
        .map(|(row, seats)| (row, seats.into_iter().cloned().collect()))
        .collect();

    Ok(Json(SeatMapResponse {
        bus_id: bus.id,
        price: bus.price,
        available: map.available_count(),
        rows,
        seats: map.seats,
    }))
}

/// Server-sent seat changes for one bus.
async fn seat_stream(
    State(state): State<AppState>,
    Path(bus_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    find_bus(&state, bus_id).await?;
    let rx = state.sse_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let event = match result {
            Ok(event) if event.bus_id == bus_id => Event::default()
                .event("seats_changed")
                .json_data(&event)
                .ok()
                .map(Ok),
            // Lagged receivers just miss events; the next seat fetch catches up.
            _ => None,
        };
        future::ready(event)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod buses;
pub mod checkout;
pub mod error;
pub mod middleware;
pub mod parcels;
pub mod state;

pub use state::{AppState, AuthConfig};

const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::USER_AGENT]);

    let api = Router::new()
        .merge(auth::routes())
        .merge(buses::routes(state.clone()))
        .merge(checkout::routes(state.clone()))
        .merge(bookings::routes(state.clone()))
        .merge(parcels::routes(state.clone()))
        .merge(admin::routes(state.clone()));

    Router::new()
        .nest("/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .with_state(state)
}

/// Per-IP request budget. Requests without a peer address (in-process calls) pass.
async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(addr) = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0) else {
        return next.run(req).await;
    };

    let key = format!("ratelimit:{}", addr.ip());
    let limit = state.business_rules.rate_limit_per_minute;

    match state.repos.sessions.check_rate_limit(&key, limit, RATE_LIMIT_WINDOW).await {
        Ok(true) => next.run(req).await,
        Ok(false) => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response(),
        Err(e) => {
            // Fail open
            tracing::warn!("Rate limiter unavailable: {}", e);
            next.run(req).await
        }
    }
}

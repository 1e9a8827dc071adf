use anyhow::Context;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use cambus_core::session::{Role, SessionClaims};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::error::AppError;
use crate::state::AppState;

pub fn issue_token(state: &AppState, claims: &SessionClaims) -> Result<String, AppError> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .context("Token encoding failed")?;
    Ok(token)
}

fn authenticate(state: &AppState, req: &Request, role: Role) -> Result<SessionClaims, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Please sign in to continue".to_string()))?;

    let token_data = decode::<SessionClaims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("Invalid or expired session".to_string()))?;

    let claims = token_data.claims;

    // Older than a day counts as signed out, whatever `exp` says.
    if !claims.is_valid_at(Utc::now()) {
        return Err(AppError::AuthenticationError("Session expired, please sign in again".to_string()));
    }

    if claims.role != role {
        return Err(AppError::AuthorizationError("Access denied".to_string()));
    }

    Ok(claims)
}

pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &req, Role::Customer)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &req, Role::Admin)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

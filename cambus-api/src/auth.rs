use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use cambus_core::credentials::{hash_password, verify_password};
use cambus_core::identity::{display_name, is_valid_email, normalize_email, Admin, Customer, SignUpRequest};
use cambus_core::session::{Role, SessionClaims};
use cambus_shared::pii::Masked;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::issue_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct AdminSummary {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub success: bool,
    pub admin: AdminSummary,
    pub token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/admin/login", post(admin_login))
}

fn customer_session(state: &AppState, customer: &Customer) -> Result<AuthResponse, AppError> {
    let name = display_name(Some(&customer.name), &customer.email);
    let claims = SessionClaims::issue(
        customer.id,
        customer.email.clone(),
        name.clone(),
        Role::Customer,
        Utc::now(),
        state.auth.session_lifetime,
    );

    Ok(AuthResponse {
        token: issue_token(state, &claims)?,
        user: UserSummary {
            id: customer.id,
            name,
            email: customer.email.clone(),
        },
    })
}

async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    req.validate()?;

    let customer = Customer {
        id: Uuid::new_v4(),
        name: req.full_name.trim().to_string(),
        email: normalize_email(&req.email),
        phone: Some(req.phone.trim().to_string()),
        password_hash: hash_password(&req.password)?,
        created_at: Utc::now(),
    };
    state.repos.accounts.create_customer(&customer).await?;

    info!("Sign-up completed for {}", Masked(&customer.email));
    Ok((StatusCode::CREATED, Json(customer_session(&state, &customer)?)))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError("Please enter your email and password".to_string()));
    }

    let invalid = || AppError::AuthenticationError("Invalid email or password".to_string());

    let customer = state
        .repos
        .accounts
        .find_customer_by_email(&req.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &customer.password_hash) {
        info!("Failed sign-in for {}", Masked(&customer.email));
        return Err(invalid());
    }

    Ok(Json(customer_session(&state, &customer)?))
}

/// Always accepted; the request is only logged.
async fn forgot_password(Json(req): Json<ForgotPasswordRequest>) -> Result<StatusCode, AppError> {
    if !is_valid_email(&req.email) {
        return Err(AppError::ValidationError("Please enter a valid email address".to_string()));
    }
    info!("Password reset requested for {}", Masked(normalize_email(&req.email)));
    Ok(StatusCode::ACCEPTED)
}

fn admin_session(state: &AppState, admin: &Admin) -> Result<AdminLoginResponse, AppError> {
    let claims = SessionClaims::issue(
        admin.id,
        admin.email.clone(),
        display_name(None, &admin.email),
        Role::Admin,
        Utc::now(),
        state.auth.session_lifetime,
    );

    Ok(AdminLoginResponse {
        success: true,
        admin: AdminSummary {
            id: admin.id,
            email: admin.email.clone(),
        },
        token: issue_token(state, &claims)?,
    })
}

async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<AdminLoginResponse>, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError("Email and password are required".to_string()));
    }

    let invalid = || AppError::AuthenticationError("Invalid credentials".to_string());

    let admin = state
        .repos
        .accounts
        .find_admin_by_email(&req.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &admin.password_hash) {
        tracing::warn!("Failed admin login for {}", Masked(&admin.email));
        return Err(invalid());
    }

    info!("Admin signed in: {}", Masked(&admin.email));
    Ok(Json(admin_session(&state, &admin)?))
}

/// Create the configured admin account when no admin exists yet.
pub async fn bootstrap_admin(state: &AppState, email: &str, password: &str) -> Result<(), AppError> {
    if state.repos.accounts.count_admins().await? > 0 {
        return Ok(());
    }

    let admin = Admin {
        id: Uuid::new_v4(),
        email: normalize_email(email),
        password_hash: hash_password(password)?,
        created_at: Utc::now(),
    };
    state.repos.accounts.create_admin(&admin).await?;
    info!("Bootstrap admin created: {}", Masked(&admin.email));
    Ok(())
}

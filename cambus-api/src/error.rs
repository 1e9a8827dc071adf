use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cambus_core::identity::FieldErrors;
use cambus_core::CoreError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    /// Sign-up style validation with one message per form field.
    #[error("{0}")]
    FieldErrors(FieldErrors),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("{0}")]
    InternalServerError(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, fields) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::FieldErrors(errors) => (StatusCode::BAD_REQUEST, errors.to_string(), Some(errors)),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
        };

        let body = match fields {
            Some(fields) => Json(json!({ "error": error_message, "fields": fields })),
            None => Json(json!({ "error": error_message })),
        };

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::ValidationError(msg),
            CoreError::NotFound(msg) => AppError::NotFoundError(msg),
            CoreError::Conflict(msg) => AppError::ConflictError(msg),
            CoreError::AuthenticationError(msg) => AppError::AuthenticationError(msg),
            CoreError::InternalError(msg) => AppError::InternalServerError(msg),
        }
    }
}

/// Domain errors (catalogue, inventory, booking, flow) go through the core taxonomy.
macro_rules! via_core {
    ($($err:ty),*) => {
        $(impl From<$err> for AppError {
            fn from(err: $err) -> Self {
                CoreError::from(err).into()
            }
        })*
    };
}

via_core!(
    cambus_catalog::CatalogError,
    cambus_catalog::InventoryError,
    cambus_order::BookingError,
    cambus_order::FlowError
);

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::FieldErrors(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::from(CoreError::ValidationError("x".into())), StatusCode::BAD_REQUEST),
            (AppError::from(CoreError::NotFound("x".into())), StatusCode::NOT_FOUND),
            (AppError::from(CoreError::Conflict("x".into())), StatusCode::CONFLICT),
            (AppError::from(CoreError::AuthenticationError("x".into())), StatusCode::UNAUTHORIZED),
            (AppError::AuthorizationError("x".into()), StatusCode::FORBIDDEN),
            (AppError::from(CoreError::InternalError("db down".into())), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_invalid_transition_is_a_conflict() {
        let err = AppError::from(cambus_order::BookingError::InvalidTransition {
            from: "confirmed",
            to: "rejected",
        });
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}

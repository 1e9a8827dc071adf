pub mod credentials;
pub mod identity;
pub mod repository;
pub mod session;

use cambus_catalog::{CatalogError, InventoryError};
use cambus_order::{BookingError, FlowError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<CatalogError> for CoreError {
    fn from(err: CatalogError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

impl From<InventoryError> for CoreError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::SeatNotFound(_) => CoreError::ValidationError(err.to_string()),
            InventoryError::AlreadyBooked(_) => CoreError::Conflict(err.to_string()),
        }
    }
}

impl From<BookingError> for CoreError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NoSeatsSelected | BookingError::BusNotBookable(_) => {
                CoreError::ValidationError(err.to_string())
            }
            BookingError::InvalidTransition { .. } | BookingError::AwaitingConfirmation => {
                CoreError::Conflict(err.to_string())
            }
        }
    }
}

impl From<FlowError> for CoreError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::NoSeatsSelected => CoreError::ValidationError(err.to_string()),
            FlowError::InvalidTransition { .. } => CoreError::Conflict(err.to_string()),
        }
    }
}

pub mod bus;
pub mod inventory;
pub mod parcel;
pub mod route;
pub mod schedule;

pub use bus::{Bus, BusDraft, BusStatus};
pub use inventory::{Seat, SeatMap, ToggleOutcome, InventoryError};
pub use parcel::{Parcel, ParcelDraft, ParcelLocation, ParcelStatus};
pub use route::{Route, RouteDraft, RouteStatus};
pub use schedule::{Schedule, ScheduleDraft, ScheduleStatus};

/// Errors raised when admin input for a catalogue entry is incomplete or inconsistent.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Missing information: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    #[error("Unknown status: {0}")]
    UnknownStatus(String),
}

/// Case-insensitive substring match used by the admin search boxes.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub(crate) fn require(value: &str, field: &'static str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::MissingField(field));
    }
    Ok(())
}

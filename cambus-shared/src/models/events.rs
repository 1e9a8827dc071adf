use uuid::Uuid;

/// Broadcast whenever seats on a bus flip between free and booked.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct SeatsChangedEvent {
    pub bus_id: Uuid,
    pub seat_numbers: Vec<String>,
    pub booked: bool,
    pub at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingSubmittedEvent {
    pub booking_id: String,
    pub bus_id: Uuid,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingReviewedEvent {
    pub booking_id: String,
    pub status: String,
    pub reviewed_by: String,
    pub timestamp: i64,
}

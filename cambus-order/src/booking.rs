use cambus_catalog::{inventory, Bus};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::BookingError;

/// Booking lifecycle. Records are never deleted; only the status moves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a booking in this status still holds its seats.
    pub fn holds_seats(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "rejected" => Ok(BookingStatus::Rejected),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    MtnMobileMoney,
    OrangeMoney,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::MtnMobileMoney => "mtn-mobile-money",
            PaymentMethod::OrangeMoney => "orange-money",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mtn-mobile-money" => Ok(PaymentMethod::MtnMobileMoney),
            "orange-money" => Ok(PaymentMethod::OrangeMoney),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// What the customer reports having paid with; an admin verifies it later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    /// Bus as it was when the booking was made.
    pub bus: Bus,
    pub seat_ids: Vec<String>,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub payment: PaymentDetails,
    pub booking_date: DateTime<Utc>,
    pub departure_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to submit a booking at the payment step.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub bus: Bus,
    pub seat_ids: Vec<String>,
    pub payment: PaymentDetails,
}

/// Short human-readable booking reference, `BK-` followed by five digits.
pub fn generate_booking_code<R: Rng>(rng: &mut R) -> String {
    format!("BK-{}", rng.gen_range(10000..=99999))
}

impl Booking {
    /// Create a pending booking from a payment submission.
    pub fn submit(new: NewBooking, now: DateTime<Utc>) -> Result<Self, BookingError> {
        if new.seat_ids.is_empty() {
            return Err(BookingError::NoSeatsSelected);
        }
        if !new.bus.is_bookable() {
            return Err(BookingError::BusNotBookable(new.bus.name.clone()));
        }

        let total_amount = inventory::total_price(new.seat_ids.len(), new.bus.price);

        Ok(Self {
            id: generate_booking_code(&mut rand::thread_rng()),
            user_id: new.user_id,
            user_name: new.user_name,
            user_email: new.user_email,
            departure_date: new.bus.departure_time,
            bus: new.bus,
            seat_ids: new.seat_ids,
            total_amount,
            status: BookingStatus::Pending,
            payment: new.payment,
            booking_date: now,
            updated_at: now,
        })
    }

    pub fn payment_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    pub fn route_label(&self) -> String {
        format!("{} → {}", self.bus.from, self.bus.to)
    }
}

/// Wire shape of a booking, with the derived `payment_confirmed` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub payment_confirmed: bool,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        Self {
            payment_confirmed: booking.payment_confirmed(),
            booking,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cambus_catalog::BusStatus;
    use chrono::Duration;
    use rand::{rngs::StdRng, SeedableRng};

    pub(crate) fn garanti_express() -> Bus {
        let departure = Utc::now() + Duration::days(2);
        Bus {
            id: Uuid::new_v4(),
            name: "Garanti Express".to_string(),
            plate_number: Some("LT-456-YB".to_string()),
            from: "Douala".to_string(),
            to: "Yaoundé".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(4),
            price: 5000,
            available_seats: 50,
            total_seats: 50,
            status: BusStatus::Active,
        }
    }

    pub(crate) fn new_booking(seats: &[&str]) -> NewBooking {
        NewBooking {
            user_id: Uuid::new_v4(),
            user_name: "Amina".to_string(),
            user_email: "amina@example.cm".to_string(),
            bus: garanti_express(),
            seat_ids: seats.iter().map(|s| s.to_string()).collect(),
            payment: PaymentDetails {
                method: PaymentMethod::MtnMobileMoney,
                reference: Some("MP250515.1234.A00001".to_string()),
            },
        }
    }

    #[test]
    fn test_submit_creates_pending_booking() {
        let now = Utc::now();
        let booking = Booking::submit(new_booking(&["1A", "1B"]), now).unwrap();

        assert_eq!(booking.seat_ids, vec!["1A", "1B"]);
        assert_eq!(booking.total_amount, 10000);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(!booking.payment_confirmed());
        assert_eq!(booking.booking_date, now);
        assert_eq!(booking.departure_date, booking.bus.departure_time);
        assert!(booking.id.starts_with("BK-"));
    }

    #[test]
    fn test_submit_without_seats_is_rejected() {
        let err = Booking::submit(new_booking(&[]), Utc::now()).unwrap_err();
        assert_eq!(err, BookingError::NoSeatsSelected);
    }

    #[test]
    fn test_inactive_bus_cannot_be_booked() {
        let mut new = new_booking(&["1A"]);
        new.bus.status = BusStatus::Maintenance;
        assert!(matches!(
            Booking::submit(new, Utc::now()),
            Err(BookingError::BusNotBookable(_))
        ));
    }

    #[test]
    fn test_booking_code_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = generate_booking_code(&mut rng);
            let digits = code.strip_prefix("BK-").unwrap();
            assert_eq!(digits.len(), 5);
            assert!(digits.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_view_exposes_payment_confirmed() {
        let mut booking = Booking::submit(new_booking(&["2C"]), Utc::now()).unwrap();
        booking.status = BookingStatus::Confirmed;

        let json = serde_json::to_value(BookingView::from(booking)).unwrap();
        assert_eq!(json["payment_confirmed"], true);
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["seat_ids"][0], "2C");
    }
}

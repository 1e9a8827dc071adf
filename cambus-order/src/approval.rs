use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Booking, BookingError, BookingStatus};

/// Admin verdict on a pending booking's payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Confirm,
    Reject,
}

impl Decision {
    fn target(&self) -> BookingStatus {
        match self {
            Decision::Confirm => BookingStatus::Confirmed,
            Decision::Reject => BookingStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Changed {
        from: BookingStatus,
        to: BookingStatus,
    },
    /// The booking was already in the requested status.
    Unchanged,
}

impl ReviewOutcome {
    /// True when this transition gives the booking's seats back to the bus.
    pub fn releases_seats(&self) -> bool {
        match self {
            ReviewOutcome::Changed { from, to } => from.holds_seats() && !to.holds_seats(),
            ReviewOutcome::Unchanged => false,
        }
    }
}

impl Booking {
    /// Apply an admin decision.
    ///
    /// Repeating the decision a booking already carries is a no-op. Only pending
    /// bookings can move.
    pub fn review(&mut self, decision: Decision, now: DateTime<Utc>) -> Result<ReviewOutcome, BookingError> {
        self.transition(decision.target(), now)
    }

    /// Customer cancellation. Only pending bookings can be cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<ReviewOutcome, BookingError> {
        self.transition(BookingStatus::Cancelled, now)
    }

    fn transition(&mut self, to: BookingStatus, now: DateTime<Utc>) -> Result<ReviewOutcome, BookingError> {
        let from = self.status;
        if from == to {
            return Ok(ReviewOutcome::Unchanged);
        }
        if from != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: from.as_str(),
                to: to.as_str(),
            });
        }

        self.status = to;
        self.updated_at = now;
        Ok(ReviewOutcome::Changed { from, to })
    }
}

/// Bookings waiting for an admin decision, oldest first.
pub fn pending_queue(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.retain(|b| b.status == BookingStatus::Pending);
    bookings.sort_by_key(|b| b.booking_date);
    bookings
}

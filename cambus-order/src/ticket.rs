use cambus_shared::CURRENCY;

use crate::{Booking, BookingError};

/// Group thousands with commas: 10000 -> "10,000".
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn ticket_filename(booking: &Booking) -> String {
    format!("CamBus-Ticket-{}.txt", booking.id)
}

/// Plain-text ticket. Only available once an admin has confirmed the payment.
pub fn render_ticket(booking: &Booking) -> Result<String, BookingError> {
    if !booking.payment_confirmed() {
        return Err(BookingError::AwaitingConfirmation);
    }

    let rule = "-".repeat(32);
    let lines = [
        "CamBus Ticket".to_string(),
        rule.clone(),
        format!("Booking Reference: {}", booking.id),
        format!("Passenger: {}", booking.user_name),
        format!("Route: {}", booking.route_label()),
        format!("Bus: {}", booking.bus.name),
        format!("Departure: {}", booking.bus.departure_time.format("%Y-%m-%d %H:%M")),
        format!("Arrival: {}", booking.bus.arrival_time.format("%Y-%m-%d %H:%M")),
        format!("Seats: {}", booking.seat_ids.join(", ")),
        format!("Total Amount: {} {}", format_amount(booking.total_amount), CURRENCY),
        rule,
        "Valid ticket - Payment Confirmed".to_string(),
    ];

    Ok(lines.join("\n") + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::tests::new_booking;
    use crate::Decision;
    use chrono::Utc;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(10000), "10,000");
        assert_eq!(format_amount(1234567), "1,234,567");
        assert_eq!(format_amount(-5000), "-5,000");
    }

    #[test]
    fn test_pending_booking_has_no_ticket() {
        let booking = Booking::submit(new_booking(&["1A"]), Utc::now()).unwrap();
        assert_eq!(render_ticket(&booking).unwrap_err(), BookingError::AwaitingConfirmation);
    }

    #[test]
    fn test_confirmed_ticket_contents() {
        let mut booking = Booking::submit(new_booking(&["1A", "1B"]), Utc::now()).unwrap();
        booking.review(Decision::Confirm, Utc::now()).unwrap();

        let ticket = render_ticket(&booking).unwrap();
        assert!(ticket.starts_with("CamBus Ticket\n"));
        assert!(ticket.contains(&format!("Booking Reference: {}", booking.id)));
        assert!(ticket.contains("Route: Douala → Yaoundé"));
        assert!(ticket.contains("Seats: 1A, 1B"));
        assert!(ticket.contains("Total Amount: 10,000 XAF"));
        assert!(ticket.trim_end().ends_with("Valid ticket - Payment Confirmed"));
        assert_eq!(ticket_filename(&booking), format!("CamBus-Ticket-{}.txt", booking.id));
    }
}

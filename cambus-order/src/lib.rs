pub mod approval;
pub mod booking;
pub mod flow;
pub mod ticket;

pub use approval::{Decision, ReviewOutcome};
pub use booking::{Booking, BookingStatus, BookingView, NewBooking, PaymentDetails, PaymentMethod};
pub use flow::{BookingFlow, CheckoutSession, FlowError, Step};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("Please select at least one seat")]
    NoSeatsSelected,

    #[error("Bus {0} is not open for booking")]
    BusNotBookable(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Your payment is still awaiting confirmation by the admin")]
    AwaitingConfirmation,
}

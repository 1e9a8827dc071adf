use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Steps of the customer booking flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Auth,
    Signup,
    ForgotPassword,
    Buses,
    Seats,
    Payment,
    Confirmation,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Auth => "auth",
            Step::Signup => "signup",
            Step::ForgotPassword => "forgot-password",
            Step::Buses => "buses",
            Step::Seats => "seats",
            Step::Payment => "payment",
            Step::Confirmation => "confirmation",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::Auth => "CamBus Ticketing System",
            Step::Signup => "Create Account",
            Step::ForgotPassword => "Reset Password",
            Step::Buses => "Select Your Route",
            Step::Seats => "Choose Your Seats",
            Step::Payment => "Payment Details",
            Step::Confirmation => "Booking Confirmed",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Step::Auth => "Sign in to book your bus tickets easily",
            Step::Signup => "Register to access our bus ticketing services",
            Step::ForgotPassword => "Recover access to your account",
            Step::Buses => "Browse available buses and routes",
            Step::Seats => "Select your preferred seats",
            Step::Payment => "Complete your payment to confirm booking",
            Step::Confirmation => "Your ticket has been booked successfully",
        }
    }

    pub fn progress(&self) -> u8 {
        match self {
            Step::Auth | Step::Signup | Step::ForgotPassword => 25,
            Step::Buses => 50,
            Step::Seats => 75,
            Step::Payment | Step::Confirmation => 100,
        }
    }

    pub fn is_auth_step(&self) -> bool {
        matches!(self, Step::Auth | Step::Signup | Step::ForgotPassword)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Cannot {action} from the {from} step")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    #[error("Please select at least one seat")]
    NoSeatsSelected,
}

/// State of one customer's way through auth → buses → seats → payment → confirmation.
///
/// Transitions only happen on explicit user actions. Going back keeps whatever
/// was chosen further down the flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingFlow {
    pub step: Step,
    pub bus_id: Option<Uuid>,
    pub selected_seats: Vec<String>,
    pub booking_id: Option<String>,
}

impl Default for BookingFlow {
    fn default() -> Self {
        Self {
            step: Step::Auth,
            bus_id: None,
            selected_seats: Vec::new(),
            booking_id: None,
        }
    }
}

impl BookingFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flow for a customer who is already signed in.
    pub fn signed_in() -> Self {
        Self {
            step: Step::Buses,
            ..Self::default()
        }
    }

    fn expect(&self, allowed: &[Step], action: &'static str) -> Result<(), FlowError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                from: self.step.as_str(),
                action,
            })
        }
    }

    /// Guard for actions that only make sense on one step, such as toggling seats.
    pub fn require(&self, step: Step, action: &'static str) -> Result<(), FlowError> {
        self.expect(&[step], action)
    }

    /// Client-side auth screens. The server only ever holds signed-in flows.
    pub fn open_signup(&mut self) -> Result<(), FlowError> {
        self.expect(&[Step::Auth], "open sign-up")?;
        self.step = Step::Signup;
        Ok(())
    }

    pub fn open_forgot_password(&mut self) -> Result<(), FlowError> {
        self.expect(&[Step::Auth], "reset password")?;
        self.step = Step::ForgotPassword;
        Ok(())
    }

    pub fn authenticated(&mut self) -> Result<(), FlowError> {
        self.expect(&[Step::Auth, Step::Signup], "sign in")?;
        self.step = Step::Buses;
        Ok(())
    }

    pub fn select_bus(&mut self, bus_id: Uuid) -> Result<(), FlowError> {
        self.expect(&[Step::Buses], "select a bus")?;
        if self.bus_id != Some(bus_id) {
            self.selected_seats.clear();
        }
        self.bus_id = Some(bus_id);
        self.step = Step::Seats;
        Ok(())
    }

    /// Seats → payment. Refuses to move without a selection.
    pub fn book_seats(&mut self) -> Result<(), FlowError> {
        self.expect(&[Step::Seats], "book seats")?;
        if self.selected_seats.is_empty() {
            return Err(FlowError::NoSeatsSelected);
        }
        self.step = Step::Payment;
        Ok(())
    }

    pub fn paid(&mut self, booking_id: String) -> Result<(), FlowError> {
        self.expect(&[Step::Payment], "pay")?;
        self.booking_id = Some(booking_id);
        self.step = Step::Confirmation;
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), FlowError> {
        self.step = match self.step {
            Step::Signup | Step::ForgotPassword => Step::Auth,
            Step::Seats => Step::Buses,
            Step::Payment => Step::Seats,
            Step::Auth | Step::Buses | Step::Confirmation => {
                return Err(FlowError::InvalidTransition {
                    from: self.step.as_str(),
                    action: "go back",
                })
            }
        };
        Ok(())
    }

    /// Start over after a confirmation (or abandon the current selection).
    pub fn new_booking(&mut self) -> Result<(), FlowError> {
        if self.step.is_auth_step() {
            return Err(FlowError::InvalidTransition {
                from: self.step.as_str(),
                action: "start a new booking",
            });
        }
        *self = Self::signed_in();
        Ok(())
    }

    pub fn sign_out(&mut self) {
        *self = Self::new();
    }
}

/// A booking flow held server-side on behalf of a signed-in customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: Uuid,
    pub owner: Uuid,
    pub flow: BookingFlow,
    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn start(owner: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            flow: BookingFlow::signed_in(),
            created_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_seats() -> (BookingFlow, Uuid) {
        let mut flow = BookingFlow::signed_in();
        let bus = Uuid::new_v4();
        flow.select_bus(bus).unwrap();
        (flow, bus)
    }

    #[test]
    fn test_happy_path() {
        let mut flow = BookingFlow::new();
        assert_eq!(flow.step, Step::Auth);
        assert_eq!(flow.step.progress(), 25);

        flow.authenticated().unwrap();
        assert_eq!(flow.step, Step::Buses);
        assert_eq!(flow.step.progress(), 50);

        let bus = Uuid::new_v4();
        flow.select_bus(bus).unwrap();
        assert_eq!(flow.step, Step::Seats);
        assert_eq!(flow.bus_id, Some(bus));
        assert_eq!(flow.step.progress(), 75);

        flow.selected_seats = vec!["1A".to_string(), "1B".to_string()];
        flow.book_seats().unwrap();
        assert_eq!(flow.step, Step::Payment);

        flow.paid("BK-12345".to_string()).unwrap();
        assert_eq!(flow.step, Step::Confirmation);
        assert_eq!(flow.step.progress(), 100);
        assert_eq!(flow.step.title(), "Booking Confirmed");
    }

    #[test]
    fn test_booking_zero_seats_stays_put() {
        let (mut flow, _) = at_seats();
        assert_eq!(flow.book_seats().unwrap_err(), FlowError::NoSeatsSelected);
        assert_eq!(flow.step, Step::Seats);
    }

    #[test]
    fn test_back_keeps_downstream_selection() {
        let (mut flow, bus) = at_seats();
        flow.selected_seats = vec!["3B".to_string()];
        flow.book_seats().unwrap();

        flow.back().unwrap();
        assert_eq!(flow.step, Step::Seats);
        assert_eq!(flow.selected_seats, vec!["3B".to_string()]);

        flow.back().unwrap();
        assert_eq!(flow.step, Step::Buses);
        assert_eq!(flow.bus_id, Some(bus));
        assert_eq!(flow.selected_seats, vec!["3B".to_string()]);

        // Picking the same bus again resumes the selection.
        flow.select_bus(bus).unwrap();
        assert_eq!(flow.selected_seats, vec!["3B".to_string()]);
    }

    #[test]
    fn test_switching_bus_drops_selection() {
        let (mut flow, _) = at_seats();
        flow.selected_seats = vec!["1A".to_string()];
        flow.back().unwrap();

        flow.select_bus(Uuid::new_v4()).unwrap();
        assert!(flow.selected_seats.is_empty());
    }

    #[test]
    fn test_auth_side_steps() {
        let mut flow = BookingFlow::new();
        flow.open_signup().unwrap();
        assert_eq!(flow.step.title(), "Create Account");
        flow.back().unwrap();
        flow.open_forgot_password().unwrap();
        assert_eq!(flow.step.progress(), 25);
        flow.back().unwrap();
        assert_eq!(flow.step, Step::Auth);
        assert!(flow.back().is_err());
    }

    #[test]
    fn test_cannot_skip_steps() {
        let mut flow = BookingFlow::signed_in();
        assert!(flow.paid("BK-00000".to_string()).is_err());
        assert!(flow.book_seats().is_err());
        assert_eq!(flow.step, Step::Buses);

        let mut anonymous = BookingFlow::new();
        assert_eq!(
            anonymous.select_bus(Uuid::new_v4()).unwrap_err(),
            FlowError::InvalidTransition {
                from: "auth",
                action: "select a bus"
            }
        );
    }

    #[test]
    fn test_new_booking_and_sign_out_reset() {
        let (mut flow, _) = at_seats();
        flow.selected_seats = vec!["1A".to_string()];
        flow.book_seats().unwrap();
        flow.paid("BK-55555".to_string()).unwrap();

        flow.new_booking().unwrap();
        assert_eq!(flow, BookingFlow::signed_in());

        flow.sign_out();
        assert_eq!(flow, BookingFlow::new());
    }

    #[test]
    fn test_checkout_session_ownership() {
        let owner = Uuid::new_v4();
        let session = CheckoutSession::start(owner, Utc::now());
        assert!(session.is_owned_by(owner));
        assert!(!session.is_owned_by(Uuid::new_v4()));
        assert_eq!(session.flow.step, Step::Buses);
    }
}

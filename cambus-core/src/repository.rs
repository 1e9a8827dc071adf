use async_trait::async_trait;
use cambus_catalog::{Bus, Parcel, ParcelDraft, Route, Schedule, SeatMap};
use cambus_order::{Booking, BookingStatus, CheckoutSession};
use std::time::Duration;
use uuid::Uuid;

use crate::identity::{Admin, Customer};
use crate::CoreResult;

/// Buses and their seat inventory.
#[async_trait]
pub trait BusRepository: Send + Sync {
    /// All buses, or only those customers may book.
    async fn list_buses(&self, active_only: bool) -> CoreResult<Vec<Bus>>;

    async fn get_bus(&self, id: Uuid) -> CoreResult<Option<Bus>>;

    /// Store a new bus and generate its seats.
    async fn create_bus(&self, bus: &Bus) -> CoreResult<()>;

    /// Persist an edited bus. Seats beyond a reduced capacity that were never
    /// booked are dropped; new ones are generated for an increased capacity.
    async fn update_bus(&self, bus: &Bus) -> CoreResult<()>;

    async fn delete_bus(&self, id: Uuid) -> CoreResult<()>;

    /// Seat map of a bus. Seats are generated on first request.
    async fn seat_map(&self, bus: &Bus) -> CoreResult<SeatMap>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Store a pending booking and reserve its seats in one step.
    ///
    /// Fails with `Conflict` when any of the seats is already booked; in that
    /// case nothing is written.
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()>;

    async fn get_booking(&self, id: &str) -> CoreResult<Option<Booking>>;

    /// A customer's bookings, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>>;

    async fn list_bookings(&self, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>>;

    /// Move a booking from `from` to the status it now carries.
    ///
    /// Fails with `Conflict` if the stored status is no longer `from`. When
    /// `release_seats` is set the booking's seats become free again.
    async fn update_booking_status(
        &self,
        booking: &Booking,
        from: BookingStatus,
        release_seats: bool,
    ) -> CoreResult<()>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn list_routes(&self) -> CoreResult<Vec<Route>>;
    async fn get_route(&self, id: Uuid) -> CoreResult<Option<Route>>;
    async fn save_route(&self, route: &Route) -> CoreResult<()>;
    async fn delete_route(&self, id: Uuid) -> CoreResult<()>;
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn list_schedules(&self) -> CoreResult<Vec<Schedule>>;
    async fn get_schedule(&self, id: Uuid) -> CoreResult<Option<Schedule>>;
    async fn save_schedule(&self, schedule: &Schedule) -> CoreResult<()>;
    async fn delete_schedule(&self, id: Uuid) -> CoreResult<()>;
}

#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn list_packages(&self) -> CoreResult<Vec<Parcel>>;

    async fn get_by_tracking_id(&self, tracking_id: &str) -> CoreResult<Option<Parcel>>;

    async fn get_package(&self, id: Uuid) -> CoreResult<Option<Parcel>>;

    /// Parcels whose owner email matches, newest first.
    async fn list_for_email(&self, email: &str) -> CoreResult<Vec<Parcel>>;

    /// Register a parcel, assigning the next tracking number.
    async fn create_package(&self, draft: ParcelDraft) -> CoreResult<Parcel>;

    /// Persist the status and any locations appended since the last save.
    async fn update_package(&self, parcel: &Parcel) -> CoreResult<()>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn create_customer(&self, customer: &Customer) -> CoreResult<()>;
    async fn find_customer_by_email(&self, email: &str) -> CoreResult<Option<Customer>>;

    /// Fails with `Conflict` when the email is already registered.
    async fn create_admin(&self, admin: &Admin) -> CoreResult<()>;
    async fn find_admin_by_email(&self, email: &str) -> CoreResult<Option<Admin>>;
    async fn count_admins(&self) -> CoreResult<i64>;
}

/// Short-lived state: checkout sessions and request counters.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn save_checkout(&self, session: &CheckoutSession, ttl: Duration) -> CoreResult<()>;
    async fn load_checkout(&self, id: Uuid) -> CoreResult<Option<CheckoutSession>>;
    async fn delete_checkout(&self, id: Uuid) -> CoreResult<()>;

    /// Count one hit against `key`. Returns false once `limit` hits were seen
    /// inside the current `window`.
    async fn check_rate_limit(&self, key: &str, limit: u32, window: Duration) -> CoreResult<bool>;
}

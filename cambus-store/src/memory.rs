use async_trait::async_trait;
use cambus_catalog::{Bus, Parcel, ParcelDraft, Route, Schedule, SeatMap};
use cambus_core::identity::{normalize_email, Admin, Customer};
use cambus_core::repository::{
    AccountRepository, BookingRepository, BusRepository, PackageRepository, RouteRepository, ScheduleRepository,
    SessionCache,
};
use cambus_core::{CoreError, CoreResult};
use cambus_order::{Booking, BookingStatus, CheckoutSession};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    buses: HashMap<Uuid, Bus>,
    booked_seats: HashMap<Uuid, HashSet<String>>,
    bookings: HashMap<String, Booking>,
    routes: Vec<Route>,
    schedules: Vec<Schedule>,
    packages: Vec<Parcel>,
    package_seq: u64,
    customers: HashMap<String, Customer>,
    admins: HashMap<String, Admin>,
    checkouts: HashMap<Uuid, (CheckoutSession, Instant)>,
    hits: HashMap<String, (u32, Instant)>,
}

impl Inner {
    fn seat_map(&self, bus: &Bus) -> SeatMap {
        let booked = self.booked_seats.get(&bus.id).cloned().unwrap_or_default();
        SeatMap::generate(bus.id, bus.total_seats.max(0) as usize, &booked)
    }
}

/// Process-local store backing every repository trait.
///
/// Every write takes the single lock, so seat reservation is a plain check-and-set.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BusRepository for MemoryStore {
    async fn list_buses(&self, active_only: bool) -> CoreResult<Vec<Bus>> {
        let inner = self.inner.read().await;
        let mut buses: Vec<Bus> = inner
            .buses
            .values()
            .filter(|b| !active_only || b.is_bookable())
            .cloned()
            .collect();
        buses.sort_by_key(|b| b.departure_time);
        Ok(buses)
    }

    async fn get_bus(&self, id: Uuid) -> CoreResult<Option<Bus>> {
        Ok(self.inner.read().await.buses.get(&id).cloned())
    }

    async fn create_bus(&self, bus: &Bus) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.buses.contains_key(&bus.id) {
            return Err(CoreError::Conflict(format!("Bus {} already exists", bus.id)));
        }
        inner.buses.insert(bus.id, bus.clone());
        inner.booked_seats.entry(bus.id).or_default();
        Ok(())
    }

    async fn update_bus(&self, bus: &Bus) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.buses.get_mut(&bus.id) {
            Some(existing) => {
                *existing = bus.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("Bus {}", bus.id))),
        }
    }

    async fn delete_bus(&self, id: Uuid) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.buses.remove(&id).is_none() {
            return Err(CoreError::NotFound(format!("Bus {}", id)));
        }
        inner.booked_seats.remove(&id);
        Ok(())
    }

    async fn seat_map(&self, bus: &Bus) -> CoreResult<SeatMap> {
        Ok(self.inner.read().await.seat_map(bus))
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.bookings.contains_key(&booking.id) {
            return Err(CoreError::Conflict(format!("Booking {} already exists", booking.id)));
        }

        let current = inner
            .buses
            .get(&booking.bus.id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Bus {}", booking.bus.id)))?;
        let mut map = inner.seat_map(&current);
        map.book(&booking.seat_ids)?;
        inner.booked_seats.insert(booking.bus.id, map.booked_numbers());

        if let Some(bus) = inner.buses.get_mut(&booking.bus.id) {
            bus.available_seats = (bus.available_seats - booking.seat_ids.len() as i32).max(0);
        }
        inner.bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: &str) -> CoreResult<Option<Booking>> {
        Ok(self.inner.read().await.bookings.get(id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
        Ok(bookings)
    }

    async fn list_bookings(&self, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
        Ok(bookings)
    }

    async fn update_booking_status(
        &self,
        booking: &Booking,
        from: BookingStatus,
        release_seats: bool,
    ) -> CoreResult<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let stored = inner
            .bookings
            .get_mut(&booking.id)
            .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking.id)))?;
        if stored.status != from {
            return Err(CoreError::Conflict(format!("Booking {} is no longer {}", booking.id, from)));
        }
        stored.status = booking.status;
        stored.updated_at = booking.updated_at;

        if release_seats {
            let mut released = 0;
            if let Some(booked) = inner.booked_seats.get_mut(&booking.bus.id) {
                for number in &booking.seat_ids {
                    if booked.remove(number) {
                        released += 1;
                    }
                }
            }
            if let Some(bus) = inner.buses.get_mut(&booking.bus.id) {
                bus.available_seats = (bus.available_seats + released).min(bus.total_seats);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RouteRepository for MemoryStore {
    async fn list_routes(&self) -> CoreResult<Vec<Route>> {
        Ok(self.inner.read().await.routes.clone())
    }

    async fn get_route(&self, id: Uuid) -> CoreResult<Option<Route>> {
        Ok(self.inner.read().await.routes.iter().find(|r| r.id == id).cloned())
    }

    async fn save_route(&self, route: &Route) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.routes.iter_mut().find(|r| r.id == route.id) {
            Some(existing) => *existing = route.clone(),
            None => inner.routes.push(route.clone()),
        }
        Ok(())
    }

    async fn delete_route(&self, id: Uuid) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let before = inner.routes.len();
        inner.routes.retain(|r| r.id != id);
        if inner.routes.len() == before {
            return Err(CoreError::NotFound(format!("Route {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleRepository for MemoryStore {
    async fn list_schedules(&self) -> CoreResult<Vec<Schedule>> {
        Ok(self.inner.read().await.schedules.clone())
    }

    async fn get_schedule(&self, id: Uuid) -> CoreResult<Option<Schedule>> {
        Ok(self.inner.read().await.schedules.iter().find(|s| s.id == id).cloned())
    }

    async fn save_schedule(&self, schedule: &Schedule) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.schedules.iter_mut().find(|s| s.id == schedule.id) {
            Some(existing) => *existing = schedule.clone(),
            None => inner.schedules.push(schedule.clone()),
        }
        Ok(())
    }

    async fn delete_schedule(&self, id: Uuid) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let before = inner.schedules.len();
        inner.schedules.retain(|s| s.id != id);
        if inner.schedules.len() == before {
            return Err(CoreError::NotFound(format!("Schedule {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl PackageRepository for MemoryStore {
    async fn list_packages(&self) -> CoreResult<Vec<Parcel>> {
        let mut packages = self.inner.read().await.packages.clone();
        packages.reverse();
        Ok(packages)
    }

    async fn get_by_tracking_id(&self, tracking_id: &str) -> CoreResult<Option<Parcel>> {
        let wanted = tracking_id.trim();
        Ok(self
            .inner
            .read()
            .await
            .packages
            .iter()
            .find(|p| p.tracking_id.eq_ignore_ascii_case(wanted))
            .cloned())
    }

    async fn get_package(&self, id: Uuid) -> CoreResult<Option<Parcel>> {
        Ok(self.inner.read().await.packages.iter().find(|p| p.id == id).cloned())
    }

    async fn list_for_email(&self, email: &str) -> CoreResult<Vec<Parcel>> {
        let inner = self.inner.read().await;
        Ok(inner
            .packages
            .iter()
            .rev()
            .filter(|p| p.belongs_to(email.trim()))
            .cloned()
            .collect())
    }

    async fn create_package(&self, draft: ParcelDraft) -> CoreResult<Parcel> {
        draft.validate()?;
        let mut inner = self.inner.write().await;
        inner.package_seq += 1;
        let parcel = draft.into_parcel(inner.package_seq, Utc::now())?;
        inner.packages.push(parcel.clone());
        Ok(parcel)
    }

    async fn update_package(&self, parcel: &Parcel) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.packages.iter_mut().find(|p| p.id == parcel.id) {
            Some(existing) => {
                *existing = parcel.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("Package {}", parcel.tracking_id))),
        }
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create_customer(&self, customer: &Customer) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let key = normalize_email(&customer.email);
        if inner.customers.contains_key(&key) {
            return Err(CoreError::Conflict("An account with this email already exists".to_string()));
        }
        inner.customers.insert(key, customer.clone());
        Ok(())
    }

    async fn find_customer_by_email(&self, email: &str) -> CoreResult<Option<Customer>> {
        Ok(self.inner.read().await.customers.get(&normalize_email(email)).cloned())
    }

    async fn create_admin(&self, admin: &Admin) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let key = normalize_email(&admin.email);
        if inner.admins.contains_key(&key) {
            return Err(CoreError::Conflict("An account with this email already exists".to_string()));
        }
        inner.admins.insert(key, admin.clone());
        Ok(())
    }

    async fn find_admin_by_email(&self, email: &str) -> CoreResult<Option<Admin>> {
        Ok(self.inner.read().await.admins.get(&normalize_email(email)).cloned())
    }

    async fn count_admins(&self) -> CoreResult<i64> {
        Ok(self.inner.read().await.admins.len() as i64)
    }
}

#[async_trait]
impl SessionCache for MemoryStore {
    async fn save_checkout(&self, session: &CheckoutSession, ttl: Duration) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let now = Instant::now();
        inner.checkouts.retain(|_, (_, expires)| *expires > now);
        inner.checkouts.insert(session.id, (session.clone(), now + ttl));
        Ok(())
    }

    async fn load_checkout(&self, id: Uuid) -> CoreResult<Option<CheckoutSession>> {
        let inner = self.inner.read().await;
        Ok(inner
            .checkouts
            .get(&id)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(session, _)| session.clone()))
    }

    async fn delete_checkout(&self, id: Uuid) -> CoreResult<()> {
        self.inner.write().await.checkouts.remove(&id);
        Ok(())
    }

    async fn check_rate_limit(&self, key: &str, limit: u32, window: Duration) -> CoreResult<bool> {
        let mut inner = self.inner.write().await;
        let now = Instant::now();
        // Closed windows count as no hits at all.
        inner.hits.retain(|_, (_, resets_at)| *resets_at > now);
        let entry = inner.hits.entry(key.to_string()).or_insert((0, now + window));
        entry.0 += 1;
        Ok(entry.0 <= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cambus_catalog::BusStatus;
    use cambus_order::{Decision, NewBooking, PaymentDetails, PaymentMethod};
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    fn bus(total_seats: i32) -> Bus {
        let departure = Utc::now() + ChronoDuration::days(1);
        Bus {
            id: Uuid::new_v4(),
            name: "Garanti Express".to_string(),
            plate_number: Some("LT-456-YB".to_string()),
            from: "Douala".to_string(),
            to: "Yaoundé".to_string(),
            departure_time: departure,
            arrival_time: departure + ChronoDuration::hours(4),
            price: 5000,
            available_seats: total_seats,
            total_seats,
            status: BusStatus::Active,
        }
    }

    fn booking(bus: &Bus, seats: &[&str]) -> Booking {
        Booking::submit(
            NewBooking {
                user_id: Uuid::new_v4(),
                user_name: "Amina".to_string(),
                user_email: "amina@example.cm".to_string(),
                bus: bus.clone(),
                seat_ids: seats.iter().map(|s| s.to_string()).collect(),
                payment: PaymentDetails {
                    method: PaymentMethod::OrangeMoney,
                    reference: None,
                },
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_booking_reserves_seats_and_decrements_availability() {
        let store = MemoryStore::new();
        let bus = bus(8);
        store.create_bus(&bus).await.unwrap();

        store.create_booking(&booking(&bus, &["1A", "1B"])).await.unwrap();

        let stored = store.get_bus(bus.id).await.unwrap().unwrap();
        assert_eq!(stored.available_seats, 6);
        let map = store.seat_map(&stored).await.unwrap();
        assert!(map.get("1A").unwrap().is_booked);
        assert!(map.get("1B").unwrap().is_booked);
        assert!(!map.get("1C").unwrap().is_booked);
    }

    #[tokio::test]
    async fn test_double_booking_is_a_conflict() {
        let store = MemoryStore::new();
        let bus = bus(8);
        store.create_bus(&bus).await.unwrap();

        store.create_booking(&booking(&bus, &["2C"])).await.unwrap();
        let second = booking(&bus, &["2C", "2D"]);
        let err = store.create_booking(&second).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        // Nothing from the failed attempt sticks.
        assert!(store.get_booking(&second.id).await.unwrap().is_none());
        let map = store.seat_map(&bus).await.unwrap();
        assert!(!map.get("2D").unwrap().is_booked);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_for_one_seat() {
        let store = Arc::new(MemoryStore::new());
        let bus = bus(4);
        store.create_bus(&bus).await.unwrap();

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let b = booking(&bus, &["1A"]);
                tokio::spawn(async move { store.create_booking(&b).await.is_ok() })
            })
            .collect();

        let mut wins = 0;
        for attempt in attempts {
            if attempt.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_reject_releases_seats() {
        let store = MemoryStore::new();
        let bus = bus(4);
        store.create_bus(&bus).await.unwrap();

        let mut b = booking(&bus, &["1A", "1B"]);
        store.create_booking(&b).await.unwrap();

        let outcome = b.review(Decision::Reject, Utc::now()).unwrap();
        store
            .update_booking_status(&b, BookingStatus::Pending, outcome.releases_seats())
            .await
            .unwrap();

        let stored = store.get_bus(bus.id).await.unwrap().unwrap();
        assert_eq!(stored.available_seats, 4);
        assert_eq!(
            store.get_booking(&b.id).await.unwrap().unwrap().status,
            BookingStatus::Rejected
        );

        // A stale second decision no longer matches the stored status.
        assert!(store
            .update_booking_status(&b, BookingStatus::Pending, true)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_duplicate_customer_email() {
        let store = MemoryStore::new();
        let customer = Customer {
            id: Uuid::new_v4(),
            name: "Amina".to_string(),
            email: "Amina@Example.cm".to_string(),
            phone: None,
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        };
        store.create_customer(&customer).await.unwrap();
        assert!(store.create_customer(&customer).await.is_err());
        assert!(store
            .find_customer_by_email("amina@example.cm")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_rate_limit_window() {
        let store = MemoryStore::new();
        let window = Duration::from_secs(60);
        for _ in 0..3 {
            assert!(store.check_rate_limit("ratelimit:10.0.0.1", 3, window).await.unwrap());
        }
        assert!(!store.check_rate_limit("ratelimit:10.0.0.1", 3, window).await.unwrap());
        assert!(store.check_rate_limit("ratelimit:10.0.0.2", 3, window).await.unwrap());
    }

    #[tokio::test]
    async fn test_rate_limit_windows_close_and_are_forgotten() {
        let store = MemoryStore::new();
        let window = Duration::from_millis(50);
        for i in 0..100 {
            store.check_rate_limit(&format!("ratelimit:10.0.1.{}", i), 1, window).await.unwrap();
        }
        assert!(!store.check_rate_limit("ratelimit:10.0.1.0", 1, window).await.unwrap());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(store.check_rate_limit("ratelimit:10.0.1.0", 1, window).await.unwrap());
        assert_eq!(store.inner.read().await.hits.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_checkouts_are_dropped_on_save() {
        let store = MemoryStore::new();
        for _ in 0..1000 {
            let stale = CheckoutSession::start(Uuid::new_v4(), Utc::now());
            store.save_checkout(&stale, Duration::ZERO).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;

        let live = CheckoutSession::start(Uuid::new_v4(), Utc::now());
        store.save_checkout(&live, Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.inner.read().await.checkouts.len(), 1);
        assert_eq!(store.load_checkout(live.id).await.unwrap(), Some(live));
    }

    #[tokio::test]
    async fn test_packages_get_sequential_tracking_ids() {
        let store = MemoryStore::new();
        let draft = ParcelDraft {
            sender: "Ebai John".to_string(),
            recipient: "Atanga Mary".to_string(),
            origin: "Douala".to_string(),
            destination: "Bamenda".to_string(),
            weight_kg: 2.5,
            price: 2500,
            owner_email: Some("ebai@example.cm".to_string()),
        };

        let first = store.create_package(draft.clone()).await.unwrap();
        let second = store.create_package(draft).await.unwrap();
        assert!(first.tracking_id.starts_with("PKG-001-"));
        assert!(second.tracking_id.starts_with("PKG-002-"));

        let found = store
            .get_by_tracking_id(&first.tracking_id.to_lowercase())
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, first.id);
        assert_eq!(store.list_for_email("EBAI@example.cm").await.unwrap().len(), 2);
    }
}

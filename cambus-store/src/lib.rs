pub mod account_repo;
pub mod app_config;
pub mod booking_repo;
pub mod bus_repo;
pub mod catalog_repo;
pub mod database;
pub mod memory;
pub mod package_repo;
pub mod redis_repo;

use cambus_core::repository::{
    AccountRepository, BookingRepository, BusRepository, PackageRepository, RouteRepository, ScheduleRepository,
    SessionCache,
};
use std::sync::Arc;

pub use database::DbClient;
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;

/// Every repository the service needs, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub buses: Arc<dyn BusRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub routes: Arc<dyn RouteRepository>,
    pub schedules: Arc<dyn ScheduleRepository>,
    pub packages: Arc<dyn PackageRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub sessions: Arc<dyn SessionCache>,
}

impl Repositories {
    /// All repositories backed by one process-local store.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            buses: store.clone(),
            bookings: store.clone(),
            routes: store.clone(),
            schedules: store.clone(),
            packages: store.clone(),
            accounts: store.clone(),
            sessions: store,
        }
    }

    /// Postgres for records, Redis for checkout sessions and rate limits.
    pub fn postgres(db: &DbClient, redis: RedisClient) -> Self {
        let catalog = Arc::new(catalog_repo::StoreCatalogRepository::new(db.pool.clone()));
        Self {
            buses: Arc::new(bus_repo::StoreBusRepository::new(db.pool.clone())),
            bookings: Arc::new(booking_repo::StoreBookingRepository::new(db.pool.clone())),
            routes: catalog.clone(),
            schedules: catalog,
            packages: Arc::new(package_repo::StorePackageRepository::new(db.pool.clone())),
            accounts: Arc::new(account_repo::StoreAccountRepository::new(db.pool.clone())),
            sessions: Arc::new(redis),
        }
    }
}

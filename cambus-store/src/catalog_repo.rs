use async_trait::async_trait;
use cambus_catalog::{Route, Schedule};
use cambus_core::repository::{RouteRepository, ScheduleRepository};
use cambus_core::{CoreError, CoreResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::db_error;

/// Routes and schedules maintained from the admin console.
pub struct StoreCatalogRepository {
    pool: PgPool,
}

impl StoreCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    from_city: String,
    to_city: String,
    distance_km: i32,
    price: i64,
    status: String,
}

impl TryFrom<RouteRow> for Route {
    type Error = CoreError;

    fn try_from(row: RouteRow) -> Result<Self, Self::Error> {
        Ok(Route {
            id: row.id,
            from: row.from_city,
            to: row.to_city,
            distance_km: row.distance_km,
            price: row.price,
            status: row.status.parse()?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    bus_name: String,
    route: String,
    departure_time: String,
    arrival_time: String,
    driver: String,
    status: String,
    price: i64,
    available_seats: i32,
    total_seats: i32,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = CoreError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        Ok(Schedule {
            id: row.id,
            bus_name: row.bus_name,
            route: row.route,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            driver: row.driver,
            status: row.status.parse()?,
            price: row.price,
            available_seats: row.available_seats,
            total_seats: row.total_seats,
        })
    }
}

#[async_trait]
impl RouteRepository for StoreCatalogRepository {
    async fn list_routes(&self) -> CoreResult<Vec<Route>> {
        let rows: Vec<RouteRow> = sqlx::query_as(
            "SELECT id, from_city, to_city, distance_km, price, status FROM routes ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Route::try_from).collect()
    }

    async fn get_route(&self, id: Uuid) -> CoreResult<Option<Route>> {
        let row: Option<RouteRow> = sqlx::query_as(
            "SELECT id, from_city, to_city, distance_km, price, status FROM routes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Route::try_from).transpose()
    }

    async fn save_route(&self, route: &Route) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO routes (id, from_city, to_city, distance_km, price, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET from_city = EXCLUDED.from_city, to_city = EXCLUDED.to_city,
                distance_km = EXCLUDED.distance_km, price = EXCLUDED.price, status = EXCLUDED.status
            "#,
        )
        .bind(route.id)
        .bind(&route.from)
        .bind(&route.to)
        .bind(route.distance_km)
        .bind(route.price)
        .bind(route.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn delete_route(&self, id: Uuid) -> CoreResult<()> {
        let deleted = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

        if deleted == 0 {
            return Err(CoreError::NotFound(format!("Route {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleRepository for StoreCatalogRepository {
    async fn list_schedules(&self) -> CoreResult<Vec<Schedule>> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(
            r#"
            SELECT id, bus_name, route, departure_time, arrival_time, driver, status, price, available_seats, total_seats
            FROM schedules ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Schedule::try_from).collect()
    }

    async fn get_schedule(&self, id: Uuid) -> CoreResult<Option<Schedule>> {
        let row: Option<ScheduleRow> = sqlx::query_as(
            r#"
            SELECT id, bus_name, route, departure_time, arrival_time, driver, status, price, available_seats, total_seats
            FROM schedules WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Schedule::try_from).transpose()
    }

    async fn save_schedule(&self, schedule: &Schedule) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO schedules (id, bus_name, route, departure_time, arrival_time, driver, status, price, available_seats, total_seats)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE
            SET bus_name = EXCLUDED.bus_name, route = EXCLUDED.route, departure_time = EXCLUDED.departure_time,
                arrival_time = EXCLUDED.arrival_time, driver = EXCLUDED.driver, status = EXCLUDED.status,
                price = EXCLUDED.price, available_seats = EXCLUDED.available_seats, total_seats = EXCLUDED.total_seats
            "#,
        )
        .bind(schedule.id)
        .bind(&schedule.bus_name)
        .bind(&schedule.route)
        .bind(&schedule.departure_time)
        .bind(&schedule.arrival_time)
        .bind(&schedule.driver)
        .bind(schedule.status.as_str())
        .bind(schedule.price)
        .bind(schedule.available_seats)
        .bind(schedule.total_seats)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn delete_schedule(&self, id: Uuid) -> CoreResult<()> {
        let deleted = sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

        if deleted == 0 {
            return Err(CoreError::NotFound(format!("Schedule {}", id)));
        }
        Ok(())
    }
}

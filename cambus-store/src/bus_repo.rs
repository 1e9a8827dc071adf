use async_trait::async_trait;
use cambus_catalog::{inventory, Bus, SeatMap};
use cambus_core::repository::BusRepository;
use cambus_core::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

use crate::database::db_error;

pub struct StoreBusRepository {
    pool: PgPool,
}

impl StoreBusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BusRow {
    id: Uuid,
    name: String,
    plate_number: Option<String>,
    from_city: String,
    to_city: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    price: i64,
    available_seats: i32,
    total_seats: i32,
    status: String,
}

impl TryFrom<BusRow> for Bus {
    type Error = CoreError;

    fn try_from(row: BusRow) -> Result<Self, Self::Error> {
        Ok(Bus {
            id: row.id,
            name: row.name,
            plate_number: row.plate_number,
            from: row.from_city,
            to: row.to_city,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            price: row.price,
            available_seats: row.available_seats,
            total_seats: row.total_seats,
            status: row.status.parse()?,
        })
    }
}

const BUS_COLUMNS: &str = "id, name, plate_number, from_city, to_city, departure_time, arrival_time, \
                           price, available_seats, total_seats, status";

/// Insert any seats of the bus that do not exist yet. Existing rows keep their booked flag.
pub(crate) async fn ensure_seats<'e, E>(executor: E, bus_id: Uuid, total_seats: i32) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let numbers = inventory::seat_numbers(total_seats.max(0) as usize);
    let positions: Vec<i32> = (0..numbers.len() as i32).collect();

    sqlx::query(
        r#"
        INSERT INTO seats (bus_id, number, position)
        SELECT $1, n, p FROM UNNEST($2::text[], $3::int[]) AS t(n, p)
        ON CONFLICT (bus_id, number) DO NOTHING
        "#,
    )
    .bind(bus_id)
    .bind(&numbers)
    .bind(&positions)
    .execute(executor)
    .await?;

    Ok(())
}

#[async_trait]
impl BusRepository for StoreBusRepository {
    async fn list_buses(&self, active_only: bool) -> CoreResult<Vec<Bus>> {
        let sql = if active_only {
            format!("SELECT {} FROM buses WHERE status = 'active' ORDER BY departure_time", BUS_COLUMNS)
        } else {
            format!("SELECT {} FROM buses ORDER BY departure_time", BUS_COLUMNS)
        };

        let rows: Vec<BusRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.into_iter().map(Bus::try_from).collect()
    }

    async fn get_bus(&self, id: Uuid) -> CoreResult<Option<Bus>> {
        let row: Option<BusRow> = sqlx::query_as(&format!("SELECT {} FROM buses WHERE id = $1", BUS_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Bus::try_from).transpose()
    }

    async fn create_bus(&self, bus: &Bus) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO buses (id, name, plate_number, from_city, to_city, departure_time, arrival_time, price, available_seats, total_seats, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(bus.id)
        .bind(&bus.name)
        .bind(&bus.plate_number)
        .bind(&bus.from)
        .bind(&bus.to)
        .bind(bus.departure_time)
        .bind(bus.arrival_time)
        .bind(bus.price)
        .bind(bus.available_seats)
        .bind(bus.total_seats)
        .bind(bus.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        ensure_seats(&mut *tx, bus.id, bus.total_seats).await.map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        tracing::info!("Bus created: {} ({} seats)", bus.name, bus.total_seats);
        Ok(())
    }

    async fn update_bus(&self, bus: &Bus) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let updated = sqlx::query(
            r#"
            UPDATE buses
            SET name = $2, plate_number = $3, from_city = $4, to_city = $5, departure_time = $6,
                arrival_time = $7, price = $8, available_seats = $9, total_seats = $10, status = $11
            WHERE id = $1
            "#,
        )
        .bind(bus.id)
        .bind(&bus.name)
        .bind(&bus.plate_number)
        .bind(&bus.from)
        .bind(&bus.to)
        .bind(bus.departure_time)
        .bind(bus.arrival_time)
        .bind(bus.price)
        .bind(bus.available_seats)
        .bind(bus.total_seats)
        .bind(bus.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .rows_affected();

        if updated == 0 {
            return Err(CoreError::NotFound(format!("Bus {}", bus.id)));
        }

        sqlx::query("DELETE FROM seats WHERE bus_id = $1 AND position >= $2 AND is_booked = FALSE")
            .bind(bus.id)
            .bind(bus.total_seats)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        ensure_seats(&mut *tx, bus.id, bus.total_seats).await.map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn delete_bus(&self, id: Uuid) -> CoreResult<()> {
        let deleted = sqlx::query("DELETE FROM buses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

        if deleted == 0 {
            return Err(CoreError::NotFound(format!("Bus {}", id)));
        }
        Ok(())
    }

    async fn seat_map(&self, bus: &Bus) -> CoreResult<SeatMap> {
        ensure_seats(&self.pool, bus.id, bus.total_seats).await.map_err(db_error)?;

        let booked: Vec<String> = sqlx::query_scalar("SELECT number FROM seats WHERE bus_id = $1 AND is_booked = TRUE")
            .bind(bus.id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let booked: HashSet<String> = booked.into_iter().collect();
        Ok(SeatMap::generate(bus.id, bus.total_seats.max(0) as usize, &booked))
    }
}

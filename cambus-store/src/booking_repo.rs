use async_trait::async_trait;
use cambus_catalog::Bus;
use cambus_core::repository::BookingRepository;
use cambus_core::{CoreError, CoreResult};
use cambus_order::{Booking, BookingStatus, PaymentDetails};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::bus_repo::ensure_seats;
use crate::database::db_error;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: String,
    user_id: Uuid,
    user_name: String,
    user_email: String,
    bus_snapshot: Json<Bus>,
    seat_ids: Vec<String>,
    total_amount: i64,
    status: String,
    payment_method: String,
    payment_reference: Option<String>,
    booking_date: DateTime<Utc>,
    departure_date: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_email: row.user_email,
            bus: row.bus_snapshot.0,
            seat_ids: row.seat_ids,
            total_amount: row.total_amount,
            status: row.status.parse().map_err(CoreError::InternalError)?,
            payment: PaymentDetails {
                method: row.payment_method.parse().map_err(CoreError::InternalError)?,
                reference: row.payment_reference,
            },
            booking_date: row.booking_date,
            departure_date: row.departure_date,
            updated_at: row.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, user_name, user_email, bus_snapshot, seat_ids, total_amount, status, \
                               payment_method, payment_reference, booking_date, departure_date, updated_at";

impl StoreBookingRepository {
    async fn fetch(&self, filter: &str, bind: Option<BindValue<'_>>) -> CoreResult<Vec<Booking>> {
        let sql = format!("SELECT {} FROM bookings {} ORDER BY booking_date DESC", BOOKING_COLUMNS, filter);
        let query = sqlx::query_as::<_, BookingRow>(&sql);
        let query = match bind {
            Some(BindValue::Uuid(id)) => query.bind(id),
            Some(BindValue::Text(text)) => query.bind(text),
            None => query,
        };

        let rows = query.fetch_all(&self.pool).await.map_err(db_error)?;
        rows.into_iter().map(Booking::try_from).collect()
    }
}

enum BindValue<'a> {
    Uuid(Uuid),
    Text(&'a str),
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        ensure_seats(&mut *tx, booking.bus.id, booking.bus.total_seats)
            .await
            .map_err(db_error)?;

        // Conditional check-and-set: only seats that are still free flip.
        let reserved = sqlx::query(
            "UPDATE seats SET is_booked = TRUE WHERE bus_id = $1 AND number = ANY($2) AND is_booked = FALSE",
        )
        .bind(booking.bus.id)
        .bind(&booking.seat_ids)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .rows_affected();

        if reserved != booking.seat_ids.len() as u64 {
            tx.rollback().await.map_err(db_error)?;
            return Err(CoreError::Conflict(
                "One or more of the selected seats are no longer available".to_string(),
            ));
        }

        sqlx::query("UPDATE buses SET available_seats = GREATEST(available_seats - $2, 0) WHERE id = $1")
            .bind(booking.bus.id)
            .bind(reserved as i32)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, user_name, user_email, bus_id, bus_snapshot, seat_ids, total_amount,
                                  status, payment_method, payment_reference, booking_date, departure_date, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&booking.id)
        .bind(booking.user_id)
        .bind(&booking.user_name)
        .bind(&booking.user_email)
        .bind(booking.bus.id)
        .bind(Json(&booking.bus))
        .bind(&booking.seat_ids)
        .bind(booking.total_amount)
        .bind(booking.status.as_str())
        .bind(booking.payment.method.as_str())
        .bind(&booking.payment.reference)
        .bind(booking.booking_date)
        .bind(booking.departure_date)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn get_booking(&self, id: &str) -> CoreResult<Option<Booking>> {
        Ok(self
            .fetch("WHERE id = $1", Some(BindValue::Text(id)))
            .await?
            .into_iter()
            .next())
    }

    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        self.fetch("WHERE user_id = $1", Some(BindValue::Uuid(user_id))).await
    }

    async fn list_bookings(&self, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>> {
        match status {
            Some(status) => self.fetch("WHERE status = $1", Some(BindValue::Text(status.as_str()))).await,
            None => self.fetch("", None).await,
        }
    }

    async fn update_booking_status(
        &self,
        booking: &Booking,
        from: BookingStatus,
        release_seats: bool,
    ) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let updated = sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4")
            .bind(&booking.id)
            .bind(booking.status.as_str())
            .bind(booking.updated_at)
            .bind(from.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();

        if updated == 0 {
            tx.rollback().await.map_err(db_error)?;
            return Err(CoreError::Conflict(format!(
                "Booking {} is no longer {}",
                booking.id, from
            )));
        }

        if release_seats {
            let released = sqlx::query(
                "UPDATE seats SET is_booked = FALSE WHERE bus_id = $1 AND number = ANY($2) AND is_booked = TRUE",
            )
            .bind(booking.bus.id)
            .bind(&booking.seat_ids)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();

            sqlx::query("UPDATE buses SET available_seats = LEAST(available_seats + $2, total_seats) WHERE id = $1")
                .bind(booking.bus.id)
                .bind(released as i32)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }
}

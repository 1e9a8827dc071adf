use async_trait::async_trait;
use cambus_catalog::{Parcel, ParcelDraft, ParcelLocation};
use cambus_core::repository::PackageRepository;
use cambus_core::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::db_error;

pub struct StorePackageRepository {
    pool: PgPool,
}

impl StorePackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PackageRow {
    id: Uuid,
    tracking_id: String,
    sender: String,
    recipient: String,
    origin: String,
    destination: String,
    weight_kg: f64,
    price: i64,
    status: String,
    owner_email: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LocationRow {
    package_id: Uuid,
    location: String,
    status: String,
    recorded_at: DateTime<Utc>,
}

const PACKAGE_COLUMNS: &str = "id, tracking_id, sender, recipient, origin, destination, weight_kg, price, status, \
                               owner_email, created_at";

impl StorePackageRepository {
    /// Attach each package's tracking history.
    async fn hydrate(&self, rows: Vec<PackageRow>) -> CoreResult<Vec<Parcel>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let locations: Vec<LocationRow> = sqlx::query_as(
            "SELECT package_id, location, status, recorded_at FROM package_locations WHERE package_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|row| {
                let history = locations
                    .iter()
                    .filter(|l| l.package_id == row.id)
                    .map(|l| ParcelLocation {
                        location: l.location.clone(),
                        timestamp: l.recorded_at,
                        status: l.status.clone(),
                    })
                    .collect();

                Ok(Parcel {
                    id: row.id,
                    tracking_id: row.tracking_id,
                    sender: row.sender,
                    recipient: row.recipient,
                    origin: row.origin,
                    destination: row.destination,
                    weight_kg: row.weight_kg,
                    price: row.price,
                    status: row.status.parse()?,
                    owner_email: row.owner_email,
                    created_at: row.created_at,
                    locations: history,
                })
            })
            .collect()
    }

    async fn insert_locations(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        package_id: Uuid,
        locations: &[ParcelLocation],
    ) -> CoreResult<()> {
        for entry in locations {
            sqlx::query("INSERT INTO package_locations (package_id, location, status, recorded_at) VALUES ($1, $2, $3, $4)")
                .bind(package_id)
                .bind(&entry.location)
                .bind(&entry.status)
                .bind(entry.timestamp)
                .execute(&mut **tx)
                .await
                .map_err(db_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PackageRepository for StorePackageRepository {
    async fn list_packages(&self) -> CoreResult<Vec<Parcel>> {
        let rows: Vec<PackageRow> =
            sqlx::query_as(&format!("SELECT {} FROM packages ORDER BY created_at DESC", PACKAGE_COLUMNS))
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        self.hydrate(rows).await
    }

    async fn get_by_tracking_id(&self, tracking_id: &str) -> CoreResult<Option<Parcel>> {
        let rows: Vec<PackageRow> =
            sqlx::query_as(&format!("SELECT {} FROM packages WHERE UPPER(tracking_id) = UPPER($1)", PACKAGE_COLUMNS))
                .bind(tracking_id.trim())
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(self.hydrate(rows).await?.into_iter().next())
    }

    async fn get_package(&self, id: Uuid) -> CoreResult<Option<Parcel>> {
        let rows: Vec<PackageRow> = sqlx::query_as(&format!("SELECT {} FROM packages WHERE id = $1", PACKAGE_COLUMNS))
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(self.hydrate(rows).await?.into_iter().next())
    }

    async fn list_for_email(&self, email: &str) -> CoreResult<Vec<Parcel>> {
        let rows: Vec<PackageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM packages WHERE owner_email = LOWER($1) ORDER BY created_at DESC",
            PACKAGE_COLUMNS
        ))
        .bind(email.trim())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        self.hydrate(rows).await
    }

    async fn create_package(&self, draft: ParcelDraft) -> CoreResult<Parcel> {
        draft.validate()?;
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let sequence: i64 = sqlx::query_scalar("SELECT nextval('package_tracking_seq')")
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        let parcel = draft.into_parcel(sequence as u64, Utc::now())?;

        sqlx::query(&format!(
            "INSERT INTO packages ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            PACKAGE_COLUMNS
        ))
        .bind(parcel.id)
        .bind(&parcel.tracking_id)
        .bind(&parcel.sender)
        .bind(&parcel.recipient)
        .bind(&parcel.origin)
        .bind(&parcel.destination)
        .bind(parcel.weight_kg)
        .bind(parcel.price)
        .bind(parcel.status.as_str())
        .bind(&parcel.owner_email)
        .bind(parcel.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        Self::insert_locations(&mut tx, parcel.id, &parcel.locations).await?;

        tx.commit().await.map_err(db_error)?;
        tracing::info!("Package registered: {}", parcel.tracking_id);
        Ok(parcel)
    }

    async fn update_package(&self, parcel: &Parcel) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let updated = sqlx::query("UPDATE packages SET status = $2 WHERE id = $1")
            .bind(parcel.id)
            .bind(parcel.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();

        if updated == 0 {
            return Err(CoreError::NotFound(format!("Package {}", parcel.tracking_id)));
        }

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM package_locations WHERE package_id = $1")
            .bind(parcel.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        let fresh = parcel.locations.get(stored as usize..).unwrap_or_default();
        Self::insert_locations(&mut tx, parcel.id, fresh).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }
}

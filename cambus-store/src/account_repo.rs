use async_trait::async_trait;
use cambus_core::identity::{normalize_email, Admin, Customer};
use cambus_core::repository::AccountRepository;
use cambus_core::{CoreError, CoreResult};
use cambus_shared::pii::Masked;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::db_error;

pub struct StoreAccountRepository {
    pool: PgPool,
}

impl StoreAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: Uuid,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Admin {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

fn already_registered(err: CoreError) -> CoreError {
    match err {
        CoreError::Conflict(_) => CoreError::Conflict("An account with this email already exists".to_string()),
        other => other,
    }
}

#[async_trait]
impl AccountRepository for StoreAccountRepository {
    async fn create_customer(&self, customer: &Customer) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO customers (id, name, email, phone, password_hash, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(normalize_email(&customer.email))
        .bind(&customer.phone)
        .bind(&customer.password_hash)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| already_registered(db_error(e)))?;

        tracing::info!("Customer registered: {}", Masked(&customer.email));
        Ok(())
    }

    async fn find_customer_by_email(&self, email: &str) -> CoreResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, email, phone, password_hash, created_at FROM customers WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Customer::from))
    }

    async fn create_admin(&self, admin: &Admin) -> CoreResult<()> {
        sqlx::query("INSERT INTO admin_users (id, email, password_hash, created_at) VALUES ($1, $2, $3, $4)")
            .bind(admin.id)
            .bind(normalize_email(&admin.email))
            .bind(&admin.password_hash)
            .bind(admin.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| already_registered(db_error(e)))?;

        tracing::info!("Admin registered: {}", Masked(&admin.email));
        Ok(())
    }

    async fn find_admin_by_email(&self, email: &str) -> CoreResult<Option<Admin>> {
        let row: Option<AdminRow> =
            sqlx::query_as("SELECT id, email, password_hash, created_at FROM admin_users WHERE email = $1")
                .bind(normalize_email(email))
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(row.map(Admin::from))
    }

    async fn count_admins(&self) -> CoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }
}

use async_trait::async_trait;
use cambus_core::repository::SessionCache;
use cambus_core::{CoreError, CoreResult};
use cambus_order::CheckoutSession;
use lazy_static::lazy_static;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> CoreResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(cache_error)
    }
}

fn cache_error(err: redis::RedisError) -> CoreError {
    tracing::error!("Redis error: {}", err);
    CoreError::InternalError(err.to_string())
}

lazy_static! {
    /// Fixed window: the expiry is set by the first hit only, so rejected
    /// requests never push the window back. A key left without a TTL gets one.
    static ref RATE_LIMIT_SCRIPT: redis::Script = redis::Script::new(
        r#"
        local count = redis.call("INCR", KEYS[1])
        if count == 1 or redis.call("TTL", KEYS[1]) == -1 then
            redis.call("EXPIRE", KEYS[1], ARGV[1])
        end
        return count
        "#,
    );
}

fn checkout_key(id: Uuid) -> String {
    format!("checkout:{}", id)
}

#[async_trait]
impl SessionCache for RedisClient {
    async fn save_checkout(&self, session: &CheckoutSession, ttl: Duration) -> CoreResult<()> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(session).map_err(|e| CoreError::InternalError(e.to_string()))?;

        conn.set_ex::<_, _, ()>(checkout_key(session.id), payload, ttl.as_secs())
            .await
            .map_err(cache_error)?;
        info!("Checkout saved: {} at step {}", session.id, session.flow.step.as_str());
        Ok(())
    }

    async fn load_checkout(&self, id: Uuid) -> CoreResult<Option<CheckoutSession>> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn.get(checkout_key(id)).await.map_err(cache_error)?;

        payload
            .map(|p| serde_json::from_str(&p).map_err(|e| CoreError::InternalError(e.to_string())))
            .transpose()
    }

    async fn delete_checkout(&self, id: Uuid) -> CoreResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(checkout_key(id)).await.map_err(cache_error)
    }

    async fn check_rate_limit(&self, key: &str, limit: u32, window: Duration) -> CoreResult<bool> {
        let mut conn = self.connection().await?;

        let count: i64 = RATE_LIMIT_SCRIPT
            .key(key)
            .arg(window.as_secs().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(count <= limit as i64)
    }
}

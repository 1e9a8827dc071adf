use anyhow::Context;
use cambus_api::{app, auth::bootstrap_admin, AppState, AuthConfig};
use cambus_store::app_config::{Config, StorageBackend};
use cambus_store::{DbClient, RedisClient, Repositories};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cambus_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting CamBus API on port {}", config.server.port);

    let repos = match config.storage {
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database.url)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;

            let redis = RedisClient::new(&config.redis.url)
                .await
                .context("Failed to connect to Redis")?;
            Repositories::postgres(&db, redis)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Repositories::in_memory()
        }
    };

    let state = AppState::new(
        repos,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            session_lifetime: chrono::Duration::hours(config.auth.session_hours),
        },
        config.business_rules.clone(),
    );

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap_admin(&state, &admin.email, &admin.password)
            .await
            .context("Failed to create bootstrap admin")?;
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

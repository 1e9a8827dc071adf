use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Where bookings and the catalogue live.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Everything in process memory; for local runs and tests.
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub checkout_ttl_seconds: u64,
    pub rate_limit_per_minute: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String { cambus_shared::CURRENCY.to_string() }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            checkout_ttl_seconds: 1800,
            rate_limit_per_minute: 100,
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_session_hours")]
    pub session_hours: i64,
}

fn default_session_hours() -> i64 { 24 }

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `CAMBUS__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("CAMBUS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

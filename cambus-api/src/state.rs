use cambus_shared::models::events::SeatsChangedEvent;
use cambus_store::app_config::BusinessRules;
use cambus_store::Repositories;
use chrono::Duration;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub session_lifetime: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub sse_tx: broadcast::Sender<SeatsChangedEvent>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

impl AppState {
    pub fn new(repos: Repositories, auth: AuthConfig, business_rules: BusinessRules) -> Self {
        let (sse_tx, _) = broadcast::channel(100);
        Self {
            repos,
            sse_tx,
            auth,
            business_rules,
        }
    }

    /// Tell seat-map subscribers that seats flipped. Nobody listening is fine.
    pub fn publish_seats(&self, event: SeatsChangedEvent) {
        let _ = self.sse_tx.send(event);
    }
}
